use config::{Config, ConfigError, Environment, File};
use infrastructure::{HttpServerConfig, MonitoringConfig};
use serde::Deserialize;

use crate::adapter::{esp32::Esp32Settings, webhook::WebhookSettings};
use crate::device::{Configuration, SyncSettings};

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub device: Esp32Settings,
    #[serde(default)]
    pub sync: SyncSettings,
    //used until the user changes the configuration, the device does not report it
    #[serde(default)]
    pub defaults: Configuration,
    pub http_server: HttpServerConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub notification: Option<WebhookSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config.toml"))
            .add_source(
                Environment::with_prefix("IRRIGATION")
                    .separator("__")
                    .list_separator(","),
            );

        let s = builder.build()?;
        s.try_deserialize()
    }
}
