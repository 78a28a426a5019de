use serde::{Deserialize, Deserializer, Serialize};

use crate::core::{
    time::DateTime,
    unit::{Percent, RawValue},
};
use crate::device::{ConfigurationUpdate, DeviceReading};

///Body of `GET /dados`. Older firmware sends raw ADC counts where percentages are expected,
///and any field may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePayload {
    sensor1: Option<f64>,
    sensor1_percent: Option<f64>,
    sensor2: Option<f64>,
    sensor2_percent: Option<f64>,
    sensor3: Option<f64>,
    sensor3_percent: Option<f64>,
    media: Option<f64>,
    media_percent: Option<f64>,
    luminosidade: Option<f64>,
    status_solo: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    bomba_ligada: bool,
    #[serde(default, deserialize_with = "flag")]
    modo_automatico: bool,
    limite_seco: Option<f64>,
    ip: Option<String>,
}

impl DevicePayload {
    pub fn into_reading(self, timestamp: DateTime) -> DeviceReading {
        DeviceReading {
            sensors: [
                moisture(self.sensor1_percent, self.sensor1),
                moisture(self.sensor2_percent, self.sensor2),
                moisture(self.sensor3_percent, self.sensor3),
            ],
            average: moisture(self.media_percent, self.media),
            luminosity: Percent(self.luminosidade.unwrap_or_default()).clamp(),
            pump_on: self.bomba_ligada,
            auto_mode: self.modo_automatico,
            dry_threshold: self.limite_seco.map(|v| v.max(0.0).round() as u32).unwrap_or_default(),
            reported_status: self.status_solo,
            device_ip: self.ip,
            timestamp,
        }
    }
}

//Percentage wins unless it is missing or clearly a raw count, then the raw sample is calibrated.
//Without a raw sample an out-of-range percentage is itself the raw count.
fn moisture(percent: Option<f64>, raw: Option<f64>) -> Percent {
    match (percent.map(Percent), raw.map(RawValue)) {
        (Some(percent), _) if percent.is_plausible() => percent.clamp(),
        (_, Some(raw)) => raw.to_moisture(),
        (Some(percent), None) => RawValue(percent.0).to_moisture(),
        (None, None) => Percent(0.0),
    }
}

//firmware versions disagree on true/false vs 1/0
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
        Other(serde_json::Value),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Number(value)) => value == 1.0,
        Some(Flag::Other(_)) | None => false,
    })
}

#[derive(Debug, Serialize)]
pub struct PumpRequest {
    pub ligada: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    limite_seco: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modo_automatico: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intervalo_leitura: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nome_dispositivo: Option<String>,
}

impl From<&ConfigurationUpdate> for ConfigRequest {
    fn from(update: &ConfigurationUpdate) -> Self {
        Self {
            limite_seco: update.dry_threshold,
            modo_automatico: update.auto_mode,
            intervalo_leitura: update.read_interval.map(u32::from),
            nome_dispositivo: update.device_name.as_ref().map(|name| name.trim().to_string()),
        }
    }
}
