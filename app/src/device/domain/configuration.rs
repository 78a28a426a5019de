use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::core::unit::RawValue;

///How often the device samples its sensors. Not to be confused with the client poll interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ReadInterval {
    FiveSeconds,
    TenSeconds,
    ThirtySeconds,
    SixtySeconds,
}

impl ReadInterval {
    pub fn seconds(&self) -> u32 {
        match self {
            ReadInterval::FiveSeconds => 5,
            ReadInterval::TenSeconds => 10,
            ReadInterval::ThirtySeconds => 30,
            ReadInterval::SixtySeconds => 60,
        }
    }
}

impl TryFrom<u32> for ReadInterval {
    type Error = ConfigurationError;

    fn try_from(seconds: u32) -> Result<Self, Self::Error> {
        match seconds {
            5 => Ok(ReadInterval::FiveSeconds),
            10 => Ok(ReadInterval::TenSeconds),
            30 => Ok(ReadInterval::ThirtySeconds),
            60 => Ok(ReadInterval::SixtySeconds),
            other => Err(ConfigurationError::UnsupportedReadInterval(other)),
        }
    }
}

impl From<ReadInterval> for u32 {
    fn from(interval: ReadInterval) -> Self {
        interval.seconds()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConfigurationError {
    #[display("Read interval of {_0} seconds is not supported, use 5, 10, 30 or 60")]
    UnsupportedReadInterval(#[error(not(source))] u32),

    #[display("Dry threshold {_0} is outside of the ADC range 0..=4095")]
    DryThresholdOutOfRange(#[error(not(source))] u16),

    #[display("Device name must not be empty")]
    EmptyDeviceName,

    #[display("Configuration update contains no changes")]
    NothingToUpdate,
}

///User-tunable parameters mirrored to the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub dry_threshold: u16,
    #[serde(rename = "read_interval_seconds")]
    pub read_interval: ReadInterval,
    pub device_name: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            dry_threshold: 2800,
            read_interval: ReadInterval::ThirtySeconds,
            device_name: "Estufa 1".to_string(),
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_dry_threshold(self.dry_threshold)?;
        validate_device_name(&self.device_name)
    }

    ///Takes over every field the update carries, leaves the rest alone
    pub fn merge(&mut self, update: &ConfigurationUpdate) {
        if let Some(dry_threshold) = update.dry_threshold {
            self.dry_threshold = dry_threshold;
        }
        if let Some(read_interval) = update.read_interval {
            self.read_interval = read_interval;
        }
        if let Some(device_name) = &update.device_name {
            self.device_name = device_name.trim().to_string();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationUpdate {
    pub dry_threshold: Option<u16>,
    pub read_interval: Option<ReadInterval>,
    pub device_name: Option<String>,
    pub auto_mode: Option<bool>,
}

impl ConfigurationUpdate {
    pub fn is_empty(&self) -> bool {
        self.dry_threshold.is_none()
            && self.read_interval.is_none()
            && self.device_name.is_none()
            && self.auto_mode.is_none()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.is_empty() {
            return Err(ConfigurationError::NothingToUpdate);
        }

        if let Some(dry_threshold) = self.dry_threshold {
            validate_dry_threshold(dry_threshold)?;
        }

        if let Some(device_name) = &self.device_name {
            validate_device_name(device_name)?;
        }

        Ok(())
    }
}

fn validate_dry_threshold(dry_threshold: u16) -> Result<(), ConfigurationError> {
    if f64::from(dry_threshold) > RawValue::DRY.0 {
        return Err(ConfigurationError::DryThresholdOutOfRange(dry_threshold));
    }
    Ok(())
}

fn validate_device_name(device_name: &str) -> Result<(), ConfigurationError> {
    if device_name.trim().is_empty() {
        return Err(ConfigurationError::EmptyDeviceName);
    }
    Ok(())
}
