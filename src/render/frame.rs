//! Redraws the calibration frame: base image, point markers, labels, and the
//! connecting segment.
//!
//! The renderer is a pure projection of `{image, viewport, points}` into an
//! RGBA frame; the host re-runs it after every state transition so the
//! visible canvas never shows a stale frame.

use ab_glyph::{FontVec, PxScale};
use image::{imageops, imageops::FilterType, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use std::path::Path;

use crate::geometry::{to_display_space, ViewportGeometry};
use crate::selection::ReferencePoint;

/// Marker, label, and line styling for the rendered frame.
pub struct RenderStyle {
    /// Marker radius in display pixels.
    pub marker_radius: i32,
    pub marker_color: Rgba<u8>,
    pub label_color: Rgba<u8>,
    pub line_color: Rgba<u8>,
    /// Pixel scale for the 1-based numeric labels.
    pub label_scale: f32,
    /// Label font. Markers and the connecting line are always drawn; labels
    /// are skipped when no font is available.
    pub font: Option<FontVec>,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            marker_radius: 5,
            marker_color: Rgba([255, 0, 0, 255]),
            label_color: Rgba([255, 255, 255, 255]),
            line_color: Rgba([255, 255, 0, 255]),
            label_scale: 12.0,
            font: None,
        }
    }
}

impl RenderStyle {
    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a label font from disk. Returns `None` (and logs) when the file
    /// is missing or not a valid font.
    pub fn load_font(path: &Path) -> Option<FontVec> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("label font {} unavailable: {}", path.display(), e);
                return None;
            }
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => Some(font),
            Err(_) => {
                tracing::warn!("label font {} is not a valid font file", path.display());
                None
            }
        }
    }
}

/// Renders the visible calibration frame.
pub struct CalibrationRenderer {
    style: RenderStyle,
}

impl CalibrationRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn with_defaults() -> Self {
        Self::new(RenderStyle::default())
    }

    /// Redraw the frame from the current image, viewport, and point set.
    ///
    /// The frame buffer dimensions equal the viewport's canvas dimensions,
    /// i.e. the displayed size of the image. Draw order: base image scaled
    /// to the canvas, then one fixed-radius marker plus numeric label per
    /// point in selection order, then the connecting segment when exactly
    /// two points are present.
    pub fn render(
        &self,
        base: &RgbaImage,
        viewport: &ViewportGeometry,
        points: &[ReferencePoint],
    ) -> RgbaImage {
        if !viewport.is_ready() {
            // Canvas has not laid out; nothing sensible to draw yet.
            return RgbaImage::new(0, 0);
        }
        let width = viewport.canvas_width.round() as u32;
        let height = viewport.canvas_height.round() as u32;

        // A fresh buffer both clears the previous frame and draws the base.
        let mut frame = imageops::resize(base, width, height, FilterType::Triangle);

        for (index, point) in points.iter().enumerate() {
            let Some((dx, dy)) = to_display_space(point.x, point.y, viewport) else {
                continue;
            };
            let (cx, cy) = (dx.round() as i32, dy.round() as i32);
            draw_filled_circle_mut(
                &mut frame,
                (cx, cy),
                self.style.marker_radius,
                self.style.marker_color,
            );

            if let Some(ref font) = self.style.font {
                let label = (index + 1).to_string();
                let scale = PxScale::from(self.style.label_scale);
                let (label_w, label_h) = text_size(scale, font, &label);
                draw_text_mut(
                    &mut frame,
                    self.style.label_color,
                    cx - label_w as i32 / 2,
                    cy - label_h as i32 / 2,
                    scale,
                    font,
                    &label,
                );
            }
        }

        if let [p1, p2] = points {
            let start = to_display_space(p1.x, p1.y, viewport);
            let end = to_display_space(p2.x, p2.y, viewport);
            if let (Some(start), Some(end)) = (start, end) {
                draw_line_segment_mut(
                    &mut frame,
                    (start.0 as f32, start.1 as f32),
                    (end.0 as f32, end.1 as f32),
                    self.style.line_color,
                );
            }
        }

        frame
    }
}
