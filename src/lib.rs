// Copyright 2026 TrapScale Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # TrapScale
//!
//! Distance calibration for camera-trap survey images.
//!
//! A field camera photographs a scene at an unknown scale. To turn pixel
//! measurements into real-world distances, the user marks two reference
//! points a known distance apart on the image; TrapScale derives the
//! real-distance-per-pixel ratio and persists it per project through a REST
//! service.
//!
//! The crate is organized around an embeddable calibration widget:
//!
//! - [`geometry`]: display-space to image-space coordinate mapping
//! - [`selection`]: the two-point selection state machine
//! - [`scale`]: scale computation and its validation errors
//! - [`render`]: the marker/label/line frame renderer
//! - [`client`]: the HTTP persistence client
//! - [`widget`]: widget state and the `reduce(state, event)` transition
//! - [`gui`]: the Iced desktop application built on the widget
//!
//! ## Example
//!
//! ```rust
//! use trapscale::scale::{self, Unit};
//! use trapscale::selection::ReferencePoint;
//!
//! let points = [
//!     ReferencePoint::new(200.0, 200.0),
//!     ReferencePoint::new(600.0, 200.0),
//! ];
//! let measurement = scale::compute(&points, 50.0, Unit::Centimeter)?;
//!
//! assert_eq!(measurement.pixel_distance, 400.0);
//! assert_eq!(measurement.scale_per_pixel, 0.125);
//! # Ok::<(), trapscale::scale::ScaleError>(())
//! ```

pub mod client;
pub mod geometry;
pub mod gui;
pub mod render;
pub mod scale;
pub mod selection;
pub mod settings;
pub mod widget;

pub use client::{ApiClient, CalibrationRecord, ClientError, Session};
pub use geometry::{to_display_space, to_image_space, CanvasBounds, ViewportGeometry};
pub use render::{CalibrationRenderer, RenderStyle};
pub use scale::{compute, ScaleError, ScaleMeasurement, Unit};
pub use selection::{ReferencePoint, SelectionState};
pub use settings::AppSettings;
pub use widget::{reduce, CalibrationWidget, Event, WidgetState};
