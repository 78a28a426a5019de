use derive_more::AsRef;
use serde::{Deserialize, Serialize};

use super::Percent;

///Uncalibrated 12 bit ADC sample of a capacitive soil sensor. Lower values mean wetter soil.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
pub struct RawValue(pub f64);

impl RawValue {
    ///Completely dry sensor, upper end of the ADC range
    pub const DRY: RawValue = RawValue(4095.0);
    ///Sensor submerged in water
    pub const SUBMERGED: RawValue = RawValue(1100.0);

    ///Inverted linear calibration: `DRY` maps to 0 %, `SUBMERGED` to 100 %, rounded to whole percent.
    pub fn to_moisture(self) -> Percent {
        let span = Self::DRY.0 - Self::SUBMERGED.0;
        Percent((100.0 * (Self::DRY.0 - self.0) / span).round()).clamp()
    }
}

impl From<&RawValue> for f64 {
    fn from(val: &RawValue) -> Self {
        val.0
    }
}

impl From<RawValue> for f64 {
    fn from(val: RawValue) -> Self {
        val.0
    }
}

impl From<f64> for RawValue {
    fn from(val: f64) -> Self {
        RawValue(val)
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
