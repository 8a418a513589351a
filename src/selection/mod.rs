//! Two-point reference selection.

mod state;

pub use state::{ReferencePoint, SelectionState};
