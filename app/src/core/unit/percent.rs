use std::fmt::Display;

use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(pub f64);

impl Percent {
    pub fn clamp(self) -> Self {
        Self(self.0.clamp(0.0, 100.0))
    }

    ///A percent value above 100 is not a percentage at all
    pub fn is_plausible(&self) -> bool {
        self.0 <= 100.0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Self(0.0)
    }
}

impl From<&Percent> for f64 {
    fn from(value: &Percent) -> Self {
        value.0
    }
}

impl From<f64> for Percent {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Percent> for f64 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} %", self.0)
    }
}
