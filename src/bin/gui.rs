//! GUI entry point for TrapScale.
//!
//! Run with: cargo run --bin trapscale-gui

use iced::Size;

use trapscale::gui::TrapScaleApp;

fn main() -> iced::Result {
    iced::application(TrapScaleApp::title, TrapScaleApp::update, TrapScaleApp::view)
        .theme(TrapScaleApp::theme)
        .window_size(Size::new(900.0, 700.0))
        .run_with(|| (TrapScaleApp::new(), iced::Task::none()))
}
