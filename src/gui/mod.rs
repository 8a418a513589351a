//! GUI module for TrapScale.
//!
//! Provides the calibration workbench using Iced.

pub mod app;
mod overlay;
pub mod logger;

pub use app::TrapScaleApp;
pub use logger::{LogEntry, LogLevel, Logger};
