use serde::{Deserialize, Serialize};

use crate::device::{
    ActuatorState, Configuration, ConfigurationError, ConfigurationUpdate, ConnectionState, DeviceReading, ReadInterval,
    SyncState,
};

#[derive(Debug, Serialize)]
pub struct StateDto {
    connection: ConnectionState,
    reading: Option<ReadingDto>,
    actuator: ActuatorState,
    configuration: Configuration,
    last_error: Option<String>,
}

impl From<SyncState> for StateDto {
    fn from(state: SyncState) -> Self {
        Self {
            connection: state.connection,
            reading: state.reading.map(Into::into),
            actuator: state.actuator,
            configuration: state.configuration,
            last_error: state.last_error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SensorDto {
    moisture: f64,
    status: String,
}

#[derive(Debug, Serialize)]
pub struct ReadingDto {
    sensors: Vec<SensorDto>,
    average: f64,
    status: String,
    luminosity: f64,
    light: String,
    pump_on: bool,
    auto_mode: bool,
    dry_threshold: u32,
    reported_status: Option<String>,
    device_ip: Option<String>,
    timestamp: String,
    time: String,
    updated: String,
    age_seconds: u64,
}

impl From<DeviceReading> for ReadingDto {
    fn from(reading: DeviceReading) -> Self {
        let sensors = reading
            .sensors
            .iter()
            .zip(reading.sensor_statuses())
            .map(|(moisture, status)| SensorDto {
                moisture: moisture.0,
                status: status.to_string(),
            })
            .collect();

        Self {
            sensors,
            average: reading.average.0,
            status: reading.soil_status().to_string(),
            luminosity: reading.luminosity.0,
            light: reading.light_rating().to_string(),
            pump_on: reading.pump_on,
            auto_mode: reading.auto_mode,
            dry_threshold: reading.dry_threshold,
            timestamp: reading.timestamp.to_iso_string(),
            time: reading.timestamp.to_short_local(),
            updated: reading.timestamp.to_human_readable(),
            age_seconds: reading.timestamp.elapsed().as_secs(),
            reported_status: reading.reported_status,
            device_ip: reading.device_ip,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PumpRequestDto {
    pub on: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigUpdateDto {
    dry_threshold: Option<u16>,
    read_interval_seconds: Option<u32>,
    device_name: Option<String>,
    auto_mode: Option<bool>,
}

impl TryFrom<ConfigUpdateDto> for ConfigurationUpdate {
    type Error = ConfigurationError;

    fn try_from(dto: ConfigUpdateDto) -> Result<Self, Self::Error> {
        Ok(Self {
            dry_threshold: dto.dry_threshold,
            read_interval: dto.read_interval_seconds.map(ReadInterval::try_from).transpose()?,
            device_name: dto.device_name,
            auto_mode: dto.auto_mode,
        })
    }
}
