mod configuration;
mod connection;
mod reading;
mod status;

pub use configuration::{Configuration, ConfigurationError, ConfigurationUpdate, ReadInterval};
pub use connection::ConnectionState;
pub use reading::DeviceReading;
pub use status::{LightRating, SoilStatus};

#[cfg(test)]
pub use reading::fixture;
