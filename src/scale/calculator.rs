//! Derives the pixel distance and real-distance-per-pixel ratio from two
//! image-space points and a user-supplied magnitude.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::selection::ReferencePoint;

/// Real-world length units accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Unit {
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "cm")]
    #[default]
    Centimeter,
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "inch")]
    Inch,
    #[serde(rename = "ft")]
    Foot,
}

/// All units, in the order offered to the user.
pub const ALL_UNITS: [Unit; 5] = [
    Unit::Millimeter,
    Unit::Centimeter,
    Unit::Meter,
    Unit::Inch,
    Unit::Foot,
];

impl Unit {
    /// Wire name (`mm | cm | m | inch | ft`).
    pub fn as_code(&self) -> &'static str {
        match self {
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Meter => "m",
            Unit::Inch => "inch",
            Unit::Foot => "ft",
        }
    }

    /// Parse a wire name; unknown names fall back to centimeters.
    pub fn from_code(code: &str) -> Self {
        match code {
            "mm" => Unit::Millimeter,
            "m" => Unit::Meter,
            "inch" => Unit::Inch,
            "ft" => Unit::Foot,
            _ => Unit::Centimeter,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// Local validation errors. These block the save action and are surfaced
/// inline; they are never sent to the server.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleError {
    #[error("exactly two reference points are required")]
    InsufficientPoints,
    #[error("reference distance must be a positive number")]
    InvalidDistance,
    #[error("the two reference points coincide, scale is undefined")]
    DegenerateSelection,
}

/// Result of a scale computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleMeasurement {
    /// Euclidean distance between the two points, in native image pixels.
    pub pixel_distance: f64,
    /// Real-world length represented by one native image pixel.
    pub scale_per_pixel: f64,
    pub unit: Unit,
}

/// Compute the measurement scale from two reference points and a known
/// real-world distance.
///
/// The pixel distance is measured in image-native coordinates, so the result
/// is independent of the current display zoom. Pure; no side effects.
pub fn compute(
    points: &[ReferencePoint],
    real_distance: f64,
    unit: Unit,
) -> Result<ScaleMeasurement, ScaleError> {
    let [p1, p2] = points else {
        return Err(ScaleError::InsufficientPoints);
    };
    if !real_distance.is_finite() || real_distance <= 0.0 {
        return Err(ScaleError::InvalidDistance);
    }

    let pixel_distance = p1.distance_to(p2);
    // Zero only when both points coincide; an undefined scale, not infinity.
    if pixel_distance == 0.0 {
        return Err(ScaleError::DegenerateSelection);
    }

    Ok(ScaleMeasurement {
        pixel_distance,
        scale_per_pixel: real_distance / pixel_distance,
        unit,
    })
}
