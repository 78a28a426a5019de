use crate::core::{time::DateTime, unit::Percent};

use super::{LightRating, SoilStatus};

///Normalized snapshot of the device taken by one poll. All percentages are within [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReading {
    pub sensors: [Percent; 3],
    pub average: Percent,
    pub luminosity: Percent,
    pub pump_on: bool,
    pub auto_mode: bool,
    ///Raw ADC threshold of the device's own automatic control, passed through untouched
    pub dry_threshold: u32,
    pub reported_status: Option<String>,
    pub device_ip: Option<String>,
    ///Capture time on the client
    pub timestamp: DateTime,
}

impl DeviceReading {
    pub fn soil_status(&self) -> SoilStatus {
        self.average.into()
    }

    pub fn sensor_statuses(&self) -> [SoilStatus; 3] {
        self.sensors.map(SoilStatus::from)
    }

    pub fn light_rating(&self) -> LightRating {
        self.luminosity.into()
    }
}
