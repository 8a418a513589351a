//! Transparent canvas overlay that reports click positions.
//!
//! Sits on top of the rendered calibration frame; it draws nothing and only
//! captures left-button presses, forwarding the window-space position plus
//! the overlay bounds so the click can be translated to canvas-local
//! coordinates.

use iced::mouse;
use iced::widget::canvas::{self, Event, Geometry};
use iced::{Point, Rectangle, Renderer, Theme};

pub struct ClickOverlay<F> {
    on_click: F,
}

impl<F> ClickOverlay<F> {
    pub fn new(on_click: F) -> Self {
        Self { on_click }
    }
}

impl<Message, F> canvas::Program<Message> for ClickOverlay<F>
where
    F: Fn(Point, Rectangle) -> Message,
{
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        if let Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) = event {
            if let Some(position) = cursor.position_over(bounds) {
                return (
                    canvas::event::Status::Captured,
                    Some((self.on_click)(position, bounds)),
                );
            }
        }
        (canvas::event::Status::Ignored, None)
    }

    fn draw(
        &self,
        _state: &Self::State,
        _renderer: &Renderer,
        _theme: &Theme,
        _bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        Vec::new()
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}
