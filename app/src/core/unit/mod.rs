mod percent;
mod raw_value;

pub use percent::Percent;
pub use raw_value::RawValue;

macro_rules! v {
    ($x:literal %) => {
        Percent($x as f64)
    };
    ($x:literal raw) => {
        RawValue($x as f64)
    };
}

pub(crate) use v;
