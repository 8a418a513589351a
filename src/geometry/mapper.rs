//! Bidirectional mapping between display-space and image-space coordinates.
//!
//! Display space is the coordinate system of the rendered canvas, which may
//! be scaled relative to the image's native resolution. Image space is the
//! native pixel grid; reference points are always stored in image space so
//! measurements stay independent of the current display zoom.

/// Per-render geometry linking the displayed canvas to the native pixel grid.
///
/// Transient: rebuilt whenever the image loads or its layout size changes,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportGeometry {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub natural_width: f64,
    pub natural_height: f64,
}

impl ViewportGeometry {
    /// Create a new geometry.
    pub fn new(
        canvas_width: f64,
        canvas_height: f64,
        natural_width: f64,
        natural_height: f64,
    ) -> Self {
        Self {
            canvas_width,
            canvas_height,
            natural_width,
            natural_height,
        }
    }

    /// Whether the canvas has laid out and coordinates can be mapped.
    ///
    /// Before the image has laid out all dimensions are zero; mapping is a
    /// no-op until then.
    pub fn is_ready(&self) -> bool {
        self.canvas_width > 0.0
            && self.canvas_height > 0.0
            && self.natural_width > 0.0
            && self.natural_height > 0.0
    }
}

/// Convert canvas display coordinates to image-native coordinates.
///
/// Returns `None` when the canvas has not laid out yet.
pub fn to_image_space(
    display_x: f64,
    display_y: f64,
    geometry: &ViewportGeometry,
) -> Option<(f64, f64)> {
    if !geometry.is_ready() {
        return None;
    }
    Some((
        display_x / geometry.canvas_width * geometry.natural_width,
        display_y / geometry.canvas_height * geometry.natural_height,
    ))
}

/// Convert image-native coordinates to canvas display coordinates.
///
/// Exact inverse of [`to_image_space`]; returns `None` when the canvas has
/// not laid out yet.
pub fn to_display_space(
    image_x: f64,
    image_y: f64,
    geometry: &ViewportGeometry,
) -> Option<(f64, f64)> {
    if !geometry.is_ready() {
        return None;
    }
    Some((
        image_x / geometry.natural_width * geometry.canvas_width,
        image_y / geometry.natural_height * geometry.canvas_height,
    ))
}

/// Placement of the canvas within the window's client coordinate space.
///
/// Clicks arrive in client coordinates; they must be translated to
/// canvas-local display coordinates (origin subtracted, CSS-to-buffer scale
/// applied) before they can be mapped into image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasBounds {
    pub left: f64,
    pub top: f64,
    pub css_width: f64,
    pub css_height: f64,
}

impl CanvasBounds {
    pub fn new(left: f64, top: f64, css_width: f64, css_height: f64) -> Self {
        Self {
            left,
            top,
            css_width,
            css_height,
        }
    }

    /// Convert a client-space click to canvas-local display coordinates.
    ///
    /// `buffer_width`/`buffer_height` are the canvas pixel-buffer dimensions,
    /// which may differ from the CSS dimensions when the canvas is styled to
    /// a different size than its backing store.
    pub fn to_canvas_local(
        &self,
        client_x: f64,
        client_y: f64,
        buffer_width: f64,
        buffer_height: f64,
    ) -> Option<(f64, f64)> {
        if self.css_width <= 0.0 || self.css_height <= 0.0 {
            return None;
        }
        let scale_x = buffer_width / self.css_width;
        let scale_y = buffer_height / self.css_height;
        Some((
            (client_x - self.left) * scale_x,
            (client_y - self.top) * scale_y,
        ))
    }
}

/// Display dimensions for an image scaled to fit inside a bounding box while
/// preserving aspect ratio.
///
/// This is how the canvas is sized to the displayed image at load time, so
/// the viewport geometry always matches what the user actually sees.
pub fn fit_within(natural_width: u32, natural_height: u32, max_width: f64, max_height: f64) -> (f64, f64) {
    if natural_width == 0 || natural_height == 0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / natural_width as f64).min(max_height / natural_height as f64);
    (
        natural_width as f64 * scale,
        natural_height as f64 * scale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < TOLERANCE
                && (actual.1 - expected.1).abs() < TOLERANCE,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_half_scale_display_maps_to_native() {
        // 1920x1080 native shown on a 960x540 canvas: scale factor 2.
        let geometry = ViewportGeometry::new(960.0, 540.0, 1920.0, 1080.0);
        let mapped = to_image_space(100.0, 100.0, &geometry).unwrap();
        assert_close(mapped, (200.0, 200.0));
        let mapped = to_image_space(300.0, 100.0, &geometry).unwrap();
        assert_close(mapped, (600.0, 200.0));
    }

    #[test]
    fn test_round_trip_at_varied_ratios() {
        let geometries = [
            ViewportGeometry::new(960.0, 540.0, 1920.0, 1080.0), // half scale
            ViewportGeometry::new(1920.0, 1080.0, 960.0, 540.0), // double scale
            ViewportGeometry::new(800.0, 500.0, 800.0, 500.0),   // 1:1
            ViewportGeometry::new(733.0, 411.0, 4032.0, 3024.0), // awkward ratio
        ];
        let samples = [(0.0, 0.0), (1.0, 1.0), (123.456, 78.9), (731.5, 410.25)];

        for geometry in &geometries {
            for &(x, y) in &samples {
                let (ix, iy) = to_image_space(x, y, geometry).unwrap();
                let back = to_display_space(ix, iy, geometry).unwrap();
                assert_close(back, (x, y));
            }
        }
    }

    #[test]
    fn test_mapping_is_noop_before_layout() {
        let geometry = ViewportGeometry::new(0.0, 0.0, 1920.0, 1080.0);
        assert!(to_image_space(10.0, 10.0, &geometry).is_none());
        assert!(to_display_space(10.0, 10.0, &geometry).is_none());
        assert!(!geometry.is_ready());
    }

    #[test]
    fn test_client_to_canvas_local_subtracts_origin_and_rescales() {
        // Canvas buffer is 960x540 but styled at 480x270, offset at (40, 60).
        let bounds = CanvasBounds::new(40.0, 60.0, 480.0, 270.0);
        let local = bounds.to_canvas_local(90.0, 110.0, 960.0, 540.0).unwrap();
        assert_close(local, (100.0, 100.0));
    }

    #[test]
    fn test_client_to_canvas_local_guards_zero_css_size() {
        let bounds = CanvasBounds::new(0.0, 0.0, 0.0, 0.0);
        assert!(bounds.to_canvas_local(10.0, 10.0, 960.0, 540.0).is_none());
    }

    #[test]
    fn test_fit_within_preserves_aspect_ratio() {
        let (w, h) = fit_within(1920, 1080, 960.0, 960.0);
        assert_close((w, h), (960.0, 540.0));

        let (w, h) = fit_within(1080, 1920, 960.0, 500.0);
        assert!((h - 500.0).abs() < TOLERANCE);
        assert!((w - 1080.0 / 1920.0 * 500.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_fit_within_zero_image() {
        assert_eq!(fit_within(0, 0, 960.0, 500.0), (0.0, 0.0));
    }
}
