//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built scenarios for testing the
//! counter source and the sampling engine without a Linux `/proc`.

mod filesystem;
mod scenarios;

pub use filesystem::{MockFs, SharedMockFs};
pub use scenarios::{io_text, stat_line, status_text};
