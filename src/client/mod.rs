//! REST client for the project/image service.
//!
//! The calibration core depends on this boundary but does not own it; the
//! server is authoritative for saved calibration records.

mod api;

pub use api::{
    ApiClient, CalibrationRecord, ClientError, FetchedImage, ImageMeta, Session,
};
