//! Coordinate geometry for the calibration canvas.
//!
//! Maps between the displayed (possibly scaled) canvas and the native
//! pixel grid of the source image.

mod mapper;

pub use mapper::{
    fit_within, to_display_space, to_image_space, CanvasBounds, ViewportGeometry,
};
