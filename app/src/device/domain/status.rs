use derive_more::Display;

use crate::core::unit::Percent;

///Soil classification shown wherever moisture is displayed. One table for every screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SoilStatus {
    #[display("Encharcado")]
    Soaked,
    #[display("Úmido")]
    Moist,
    #[display("Quase seco")]
    AlmostDry,
    #[display("Seco")]
    Dry,
    #[display("Muito seco")]
    VeryDry,
}

impl SoilStatus {
    pub fn is_dry(&self) -> bool {
        matches!(self, SoilStatus::Dry | SoilStatus::VeryDry)
    }
}

impl From<Percent> for SoilStatus {
    fn from(moisture: Percent) -> Self {
        match moisture.0 {
            m if m >= 80.0 => SoilStatus::Soaked,
            m if m >= 60.0 => SoilStatus::Moist,
            m if m >= 40.0 => SoilStatus::AlmostDry,
            m if m >= 20.0 => SoilStatus::Dry,
            _ => SoilStatus::VeryDry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LightRating {
    #[display("Ótimo")]
    Great,
    #[display("Bom")]
    Good,
    #[display("Baixo")]
    Low,
}

impl From<Percent> for LightRating {
    fn from(luminosity: Percent) -> Self {
        match luminosity.0 {
            l if l > 70.0 => LightRating::Great,
            l if l > 40.0 => LightRating::Good,
            _ => LightRating::Low,
        }
    }
}
