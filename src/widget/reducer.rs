//! Widget state and transition function.
//!
//! All transitions run synchronously; the three network operations are
//! asynchronous and their completions arrive as tagged events. Every
//! outbound request is tagged with the identifier it was issued for, and
//! responses whose tag no longer matches the pending request are dropped on
//! arrival rather than overwriting current state. This prevents a slow
//! earlier request from clobbering a faster later one.

use std::sync::Arc;

use image::RgbaImage;
use uuid::Uuid;

use crate::client::{CalibrationRecord, ImageMeta};
use crate::geometry::{fit_within, to_image_space, CanvasBounds, ViewportGeometry};
use crate::scale::{self, ScaleError, Unit};
use crate::selection::SelectionState;

/// Tag identifying one outbound request, captured at call time.
pub type RequestId = Uuid;

/// Default bounding box for the displayed image, mirroring a fluid-width
/// layout capped at 500px tall.
pub const DEFAULT_MAX_DISPLAY: (f64, f64) = (800.0, 500.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A dismissible user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// A decoded reference image. Pixels are shared so events stay cheap to
/// clone.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub meta: ImageMeta,
    pub pixels: Arc<RgbaImage>,
}

/// Everything that can happen to the widget.
#[derive(Debug, Clone)]
pub enum Event {
    /// The target image changed; image + calibration fetches tagged
    /// `request` are in flight.
    FetchStarted {
        request: RequestId,
        image_id: String,
    },
    ImageLoaded {
        request: RequestId,
        result: Result<LoadedImage, String>,
    },
    CalibrationFetched {
        request: RequestId,
        result: Result<Option<CalibrationRecord>, String>,
    },
    /// A click in window/client coordinates on the canvas at `bounds`.
    Click {
        client_x: f64,
        client_y: f64,
        bounds: CanvasBounds,
    },
    DistanceChanged(String),
    UnitSelected(Unit),
    Reset,
    SaveStarted {
        request: RequestId,
    },
    SaveCompleted {
        request: RequestId,
        result: Result<CalibrationRecord, String>,
    },
    NoticeDismissed,
}

/// Widget state for one (project, image) pair.
///
/// Owned exclusively by the UI session; there are no concurrent writers, so
/// correctness rests on the stale-response guard and on save being
/// last-write-wins at the server.
#[derive(Debug, Clone)]
pub struct WidgetState {
    pub project_id: String,
    pub image_id: String,
    /// Bounding box the displayed image is fitted into.
    pub max_display: (f64, f64),
    pub image: Option<LoadedImage>,
    pub viewport: ViewportGeometry,
    pub selection: SelectionState,
    /// The current canonical record, if any.
    pub calibration: Option<CalibrationRecord>,
    pub distance_input: String,
    pub unit: Unit,
    pub pending_image: Option<RequestId>,
    pub pending_calibration: Option<RequestId>,
    pub pending_save: Option<RequestId>,
    pub notice: Option<Notice>,
    /// Set when the reference image could not be retrieved or decoded;
    /// blocks all interaction until a new image is loaded.
    pub image_error: Option<String>,
}

impl WidgetState {
    pub fn new(project_id: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            image_id: image_id.into(),
            max_display: DEFAULT_MAX_DISPLAY,
            image: None,
            viewport: ViewportGeometry::default(),
            selection: SelectionState::default(),
            calibration: None,
            distance_input: String::new(),
            unit: Unit::default(),
            pending_image: None,
            pending_calibration: None,
            pending_save: None,
            notice: None,
            image_error: None,
        }
    }

    pub fn with_max_display(mut self, width: f64, height: f64) -> Self {
        self.max_display = (width, height);
        self
    }

    /// Whether the initial image fetch is still in flight.
    pub fn is_loading(&self) -> bool {
        self.pending_image.is_some()
    }

    /// Preemptive save gate: both points marked and a distance entered.
    ///
    /// [`ScaleError`] validation remains a defensive second layer behind
    /// this gate.
    pub fn can_save(&self) -> bool {
        self.selection.is_complete()
            && !self.distance_input.trim().is_empty()
            && self.pending_save.is_none()
    }

    /// Build the save request body from the current selection and inputs.
    pub fn save_request(&self) -> Result<CalibrationRecord, ScaleError> {
        let points = self.selection.points();
        let distance = self
            .distance_input
            .trim()
            .parse::<f64>()
            .unwrap_or(f64::NAN);
        let measurement = scale::compute(&points, distance, self.unit)?;
        Ok(CalibrationRecord {
            project_id: self.project_id.clone(),
            image_id: self.image_id.clone(),
            points,
            pixel_distance: measurement.pixel_distance,
            distance,
            unit: self.unit,
            real_distance_per_pixel: measurement.scale_per_pixel,
        })
    }
}

/// Pure transition function. Returns the next state; the host re-renders
/// the frame after every call.
pub fn reduce(mut state: WidgetState, event: Event) -> WidgetState {
    match event {
        Event::FetchStarted { request, image_id } => {
            state.image_id = image_id;
            state.pending_image = Some(request);
            state.pending_calibration = Some(request);
            state.image_error = None;
            state.notice = None;
        }

        Event::ImageLoaded { request, result } => {
            if state.pending_image != Some(request) {
                tracing::debug!(%request, "dropping stale image response");
                return state;
            }
            state.pending_image = None;
            match result {
                Ok(loaded) => {
                    let (canvas_w, canvas_h) = fit_within(
                        loaded.meta.natural_width,
                        loaded.meta.natural_height,
                        state.max_display.0,
                        state.max_display.1,
                    );
                    state.viewport = ViewportGeometry::new(
                        canvas_w,
                        canvas_h,
                        loaded.meta.natural_width as f64,
                        loaded.meta.natural_height as f64,
                    );
                    state.image = Some(loaded);
                    // The two fetches run concurrently; the calibration
                    // response for this same image may have resolved first
                    // and seeded the selection. Keep it in that case.
                    let seeded = state.pending_calibration.is_none()
                        && state
                            .calibration
                            .as_ref()
                            .is_some_and(|record| record.image_id == state.image_id);
                    if !seeded {
                        state.selection = SelectionState::Empty;
                    }
                    state.image_error = None;
                }
                Err(message) => {
                    state.image = None;
                    state.viewport = ViewportGeometry::default();
                    state.image_error = Some(message);
                }
            }
        }

        Event::CalibrationFetched { request, result } => {
            if state.pending_calibration != Some(request) {
                tracing::debug!(%request, "dropping stale calibration response");
                return state;
            }
            state.pending_calibration = None;
            match result {
                Ok(Some(record)) => {
                    state.selection = SelectionState::from_points(&record.points);
                    state.distance_input = record.distance.to_string();
                    state.unit = record.unit;
                    state.calibration = Some(record);
                }
                Ok(None) => {
                    // No record for this project; drop any record carried
                    // over from a previously viewed one.
                    state.calibration = None;
                }
                Err(message) => {
                    // Prior in-memory state is preserved, not cleared.
                    state.notice = Some(Notice::error(message));
                }
            }
        }

        Event::Click {
            client_x,
            client_y,
            bounds,
        } => {
            if state.image.is_none() || state.image_error.is_some() {
                return state;
            }
            let local = bounds.to_canvas_local(
                client_x,
                client_y,
                state.viewport.canvas_width,
                state.viewport.canvas_height,
            );
            let Some((display_x, display_y)) = local else {
                return state;
            };
            let Some((image_x, image_y)) =
                to_image_space(display_x, display_y, &state.viewport)
            else {
                return state;
            };
            state.selection = state
                .selection
                .click(crate::selection::ReferencePoint::new(image_x, image_y));
        }

        Event::DistanceChanged(value) => {
            state.distance_input = value;
        }

        Event::UnitSelected(unit) => {
            state.unit = unit;
        }

        Event::Reset => {
            state.selection = state.selection.reset();
            state.distance_input.clear();
            state.notice = None;
        }

        Event::SaveStarted { request } => {
            state.pending_save = Some(request);
            state.notice = None;
        }

        Event::SaveCompleted { request, result } => {
            if state.pending_save != Some(request) {
                tracing::debug!(%request, "dropping stale save response");
                return state;
            }
            state.pending_save = None;
            match result {
                Ok(record) => {
                    // The server is authoritative: its record replaces the
                    // locally computed one wholesale.
                    state.selection = SelectionState::from_points(&record.points);
                    state.distance_input = record.distance.to_string();
                    state.unit = record.unit;
                    state.calibration = Some(record);
                    state.notice = Some(Notice::success("Calibration saved successfully"));
                }
                Err(message) => {
                    // Points and entered distance are preserved so the user
                    // can retry without re-marking.
                    state.notice = Some(Notice::error(message));
                }
            }
        }

        Event::NoticeDismissed => {
            state.notice = None;
        }
    }
    state
}

/// The embeddable widget: state plus a saved-record callback.
///
/// External inputs are the project id, the image id, and an optional
/// `on_calibration_saved` callback fired with the canonical record after a
/// successful save.
pub struct CalibrationWidget {
    state: WidgetState,
    on_saved: Option<Box<dyn Fn(&CalibrationRecord) + Send>>,
}

impl CalibrationWidget {
    pub fn new(project_id: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            state: WidgetState::new(project_id, image_id),
            on_saved: None,
        }
    }

    pub fn on_calibration_saved(
        mut self,
        callback: impl Fn(&CalibrationRecord) + Send + 'static,
    ) -> Self {
        self.on_saved = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    /// Apply an event and fire the saved-record callback when a save was
    /// accepted.
    pub fn apply(&mut self, event: Event) {
        let save_accepted = matches!(
            &event,
            Event::SaveCompleted { request, result: Ok(_) }
                if self.state.pending_save == Some(*request)
        );
        self.state = reduce(self.state.clone(), event);
        if save_accepted {
            if let (Some(callback), Some(record)) = (&self.on_saved, &self.state.calibration) {
                callback(record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ReferencePoint;

    fn loaded_image(width: u32, height: u32) -> LoadedImage {
        LoadedImage {
            meta: ImageMeta {
                id: "img-a".to_string(),
                natural_width: width,
                natural_height: height,
            },
            pixels: Arc::new(RgbaImage::new(width, height)),
        }
    }

    fn full_bounds(state: &WidgetState) -> CanvasBounds {
        CanvasBounds::new(
            0.0,
            0.0,
            state.viewport.canvas_width,
            state.viewport.canvas_height,
        )
    }

    /// State with a 1920x1080 image displayed on a 960x540 canvas.
    fn loaded_state() -> WidgetState {
        let state = WidgetState::new("proj-1", "img-a").with_max_display(960.0, 540.0);
        let request = Uuid::new_v4();
        let state = reduce(
            state,
            Event::FetchStarted {
                request,
                image_id: "img-a".to_string(),
            },
        );
        reduce(
            state,
            Event::ImageLoaded {
                request,
                result: Ok(loaded_image(1920, 1080)),
            },
        )
    }

    fn server_record() -> CalibrationRecord {
        CalibrationRecord {
            project_id: "proj-1".to_string(),
            image_id: "img-a".to_string(),
            points: vec![
                ReferencePoint::new(200.0, 200.0),
                ReferencePoint::new(600.0, 200.0),
            ],
            pixel_distance: 400.0,
            distance: 50.0,
            unit: Unit::Centimeter,
            real_distance_per_pixel: 0.125,
        }
    }

    #[test]
    fn test_image_load_sizes_viewport_to_display() {
        let state = loaded_state();
        assert_eq!(state.viewport.canvas_width, 960.0);
        assert_eq!(state.viewport.canvas_height, 540.0);
        assert_eq!(state.viewport.natural_width, 1920.0);
        assert!(!state.is_loading());
    }

    #[test]
    fn test_end_to_end_half_scale_calibration() {
        let mut state = loaded_state();
        let bounds = full_bounds(&state);

        // Display clicks (100,100) and (300,100) map to image space at
        // scale factor 2.
        for (x, y) in [(100.0, 100.0), (300.0, 100.0)] {
            state = reduce(
                state,
                Event::Click {
                    client_x: x,
                    client_y: y,
                    bounds,
                },
            );
        }
        assert_eq!(
            state.selection.points(),
            vec![
                ReferencePoint::new(200.0, 200.0),
                ReferencePoint::new(600.0, 200.0)
            ]
        );

        state = reduce(state, Event::DistanceChanged("50".to_string()));
        state = reduce(state, Event::UnitSelected(Unit::Centimeter));
        assert!(state.can_save());

        let record = state.save_request().unwrap();
        assert_eq!(record.pixel_distance, 400.0);
        assert_eq!(record.real_distance_per_pixel, 0.125);
        assert_eq!(record.unit, Unit::Centimeter);

        let request = Uuid::new_v4();
        state = reduce(state, Event::SaveStarted { request });
        state = reduce(
            state,
            Event::SaveCompleted {
                request,
                result: Ok(record.clone()),
            },
        );
        assert_eq!(state.calibration, Some(record));
        assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Success));
    }

    #[test]
    fn test_stale_fetch_responses_are_dropped() {
        let state = WidgetState::new("proj-1", "img-a");
        let request_a = Uuid::new_v4();
        let request_b = Uuid::new_v4();

        // Request image A, then switch to image B before A resolves.
        let state = reduce(
            state,
            Event::FetchStarted {
                request: request_a,
                image_id: "img-a".to_string(),
            },
        );
        let state = reduce(
            state,
            Event::FetchStarted {
                request: request_b,
                image_id: "img-b".to_string(),
            },
        );

        // B resolves first.
        let state = reduce(
            state,
            Event::ImageLoaded {
                request: request_b,
                result: Ok(loaded_image(800, 600)),
            },
        );
        let state = reduce(
            state,
            Event::CalibrationFetched {
                request: request_b,
                result: Ok(None),
            },
        );

        // A's responses arrive late and must not overwrite B's state.
        let state = reduce(
            state,
            Event::ImageLoaded {
                request: request_a,
                result: Ok(loaded_image(1920, 1080)),
            },
        );
        let state = reduce(
            state,
            Event::CalibrationFetched {
                request: request_a,
                result: Ok(Some(server_record())),
            },
        );

        assert_eq!(state.image_id, "img-b");
        assert_eq!(state.image.as_ref().unwrap().meta.natural_width, 800);
        assert!(state.calibration.is_none());
        assert!(state.selection.is_empty());
    }

    #[test]
    fn test_prior_calibration_seeds_points_distance_and_unit() {
        let state = loaded_state();
        let request = Uuid::new_v4();
        let state = reduce(
            state,
            Event::FetchStarted {
                request,
                image_id: "img-a".to_string(),
            },
        );
        let state = reduce(
            state,
            Event::CalibrationFetched {
                request,
                result: Ok(Some(server_record())),
            },
        );
        assert!(state.selection.is_complete());
        assert_eq!(state.distance_input, "50");
        assert_eq!(state.unit, Unit::Centimeter);
        assert!(state.calibration.is_some());
    }

    #[test]
    fn test_calibration_arriving_before_image_keeps_seeded_points() {
        let state = WidgetState::new("proj-1", "img-a").with_max_display(960.0, 540.0);
        let request = Uuid::new_v4();
        let state = reduce(
            state,
            Event::FetchStarted {
                request,
                image_id: "img-a".to_string(),
            },
        );

        // The image and calibration fetches run concurrently; here the
        // record resolves first and seeds the selection.
        let state = reduce(
            state,
            Event::CalibrationFetched {
                request,
                result: Ok(Some(server_record())),
            },
        );
        assert!(state.selection.is_complete());

        let state = reduce(
            state,
            Event::ImageLoaded {
                request,
                result: Ok(loaded_image(1920, 1080)),
            },
        );
        assert!(state.selection.is_complete(), "seeded points survive the image load");
        assert_eq!(state.distance_input, "50");
    }

    #[test]
    fn test_project_without_calibration_clears_previous_record() {
        // Seed proj-1's record, then switch to a project that has none.
        let state = loaded_state();
        let request = Uuid::new_v4();
        let state = reduce(
            state,
            Event::FetchStarted {
                request,
                image_id: "img-a".to_string(),
            },
        );
        let state = reduce(
            state,
            Event::CalibrationFetched {
                request,
                result: Ok(Some(server_record())),
            },
        );
        assert!(state.calibration.is_some());

        let request = Uuid::new_v4();
        let state = reduce(
            state,
            Event::FetchStarted {
                request,
                image_id: "img-b".to_string(),
            },
        );
        let state = reduce(
            state,
            Event::CalibrationFetched {
                request,
                result: Ok(None),
            },
        );
        assert!(state.calibration.is_none());
    }

    #[test]
    fn test_calibration_fetch_failure_preserves_state() {
        let mut state = loaded_state();
        let bounds = full_bounds(&state);
        state = reduce(
            state,
            Event::Click {
                client_x: 100.0,
                client_y: 100.0,
                bounds,
            },
        );
        let points_before = state.selection.points();

        let request = Uuid::new_v4();
        let pending = WidgetState {
            pending_calibration: Some(request),
            ..state
        };
        let state = reduce(
            pending,
            Event::CalibrationFetched {
                request,
                result: Err("service unavailable".to_string()),
            },
        );
        assert_eq!(state.selection.points(), points_before);
        assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[test]
    fn test_save_failure_preserves_points_and_distance() {
        let mut state = loaded_state();
        let bounds = full_bounds(&state);
        for (x, y) in [(100.0, 100.0), (300.0, 100.0)] {
            state = reduce(
                state,
                Event::Click {
                    client_x: x,
                    client_y: y,
                    bounds,
                },
            );
        }
        state = reduce(state, Event::DistanceChanged("50".to_string()));

        let request = Uuid::new_v4();
        state = reduce(state, Event::SaveStarted { request });
        state = reduce(
            state,
            Event::SaveCompleted {
                request,
                result: Err("server rejected".to_string()),
            },
        );

        assert!(state.selection.is_complete());
        assert_eq!(state.distance_input, "50");
        assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Error));
        assert!(state.can_save(), "user can retry without re-marking");
    }

    #[test]
    fn test_server_record_wins_over_local_computation() {
        let mut state = loaded_state();
        let bounds = full_bounds(&state);
        for (x, y) in [(100.0, 100.0), (300.0, 100.0)] {
            state = reduce(
                state,
                Event::Click {
                    client_x: x,
                    client_y: y,
                    bounds,
                },
            );
        }
        state = reduce(state, Event::DistanceChanged("50".to_string()));

        // Server re-rounds the scale; its record replaces local fields.
        let mut rounded = server_record();
        rounded.real_distance_per_pixel = 0.13;
        rounded.distance = 50.5;

        let request = Uuid::new_v4();
        state = reduce(state, Event::SaveStarted { request });
        state = reduce(
            state,
            Event::SaveCompleted {
                request,
                result: Ok(rounded.clone()),
            },
        );
        assert_eq!(state.calibration, Some(rounded));
        assert_eq!(state.distance_input, "50.5");
    }

    #[test]
    fn test_clicks_ignored_until_image_loads() {
        let state = WidgetState::new("proj-1", "img-a");
        let state = reduce(
            state,
            Event::Click {
                client_x: 10.0,
                client_y: 10.0,
                bounds: CanvasBounds::new(0.0, 0.0, 960.0, 540.0),
            },
        );
        assert!(state.selection.is_empty());
    }

    #[test]
    fn test_clicks_allowed_while_fetch_pending() {
        // The selection machine is independent of fetch state.
        let mut state = loaded_state();
        state.pending_calibration = Some(Uuid::new_v4());
        let state = reduce(
            state,
            Event::Click {
                client_x: 100.0,
                client_y: 100.0,
                bounds: CanvasBounds::new(0.0, 0.0, 960.0, 540.0),
            },
        );
        assert_eq!(state.selection.len(), 1);
    }

    #[test]
    fn test_save_gate_requires_two_points_and_distance() {
        let mut state = loaded_state();
        assert!(!state.can_save());

        let bounds = full_bounds(&state);
        state = reduce(
            state,
            Event::Click {
                client_x: 100.0,
                client_y: 100.0,
                bounds,
            },
        );
        state = reduce(state, Event::DistanceChanged("50".to_string()));
        assert!(!state.can_save(), "one point is not enough");
        assert_eq!(state.save_request(), Err(ScaleError::InsufficientPoints));

        state = reduce(
            state,
            Event::Click {
                client_x: 300.0,
                client_y: 100.0,
                bounds,
            },
        );
        assert!(state.can_save());

        state = reduce(state, Event::DistanceChanged("  ".to_string()));
        assert!(!state.can_save());
        assert_eq!(state.save_request(), Err(ScaleError::InvalidDistance));
    }

    #[test]
    fn test_reset_clears_points_distance_and_notice() {
        let mut state = loaded_state();
        let bounds = full_bounds(&state);
        state = reduce(
            state,
            Event::Click {
                client_x: 100.0,
                client_y: 100.0,
                bounds,
            },
        );
        state = reduce(state, Event::DistanceChanged("50".to_string()));
        state.notice = Some(Notice::error("old message"));

        let state = reduce(state, Event::Reset);
        assert!(state.selection.is_empty());
        assert!(state.distance_input.is_empty());
        assert!(state.notice.is_none());
    }

    #[test]
    fn test_image_load_failure_blocks_interaction() {
        let state = WidgetState::new("proj-1", "img-a");
        let request = Uuid::new_v4();
        let state = reduce(
            state,
            Event::FetchStarted {
                request,
                image_id: "img-a".to_string(),
            },
        );
        let state = reduce(
            state,
            Event::ImageLoaded {
                request,
                result: Err("404 not found".to_string()),
            },
        );
        assert!(state.image_error.is_some());

        let state = reduce(
            state,
            Event::Click {
                client_x: 10.0,
                client_y: 10.0,
                bounds: CanvasBounds::new(0.0, 0.0, 960.0, 540.0),
            },
        );
        assert!(state.selection.is_empty());
    }

    #[test]
    fn test_widget_callback_fires_on_accepted_save_only() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc as StdArc;

        let fired = StdArc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let mut widget = CalibrationWidget::new("proj-1", "img-a")
            .on_calibration_saved(move |record| {
                assert_eq!(record.real_distance_per_pixel, 0.125);
                fired_clone.fetch_add(1, Ordering::SeqCst);
            });

        let request = Uuid::new_v4();
        widget.apply(Event::SaveStarted { request });
        widget.apply(Event::SaveCompleted {
            request,
            result: Ok(server_record()),
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A stale save completion must not fire the callback again.
        widget.apply(Event::SaveCompleted {
            request: Uuid::new_v4(),
            result: Ok(server_record()),
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
