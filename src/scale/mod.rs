//! Scale-factor computation from two reference points.

mod calculator;

pub use calculator::{compute, ScaleError, ScaleMeasurement, Unit, ALL_UNITS};
