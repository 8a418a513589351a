//! The embeddable calibration widget: explicit state plus a pure
//! `reduce(state, event) -> state` transition function.
//!
//! The renderer is a side-effecting projection of this state; hosts invoke
//! it after every transition so the canvas never shows a stale frame.

mod reducer;

pub use reducer::{
    reduce, CalibrationWidget, Event, LoadedImage, Notice, NoticeKind, RequestId, WidgetState,
};
