//! Frame rendering for the calibration canvas.

mod frame;

pub use frame::{CalibrationRenderer, RenderStyle};
