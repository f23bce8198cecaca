//! Collectors for the Linux `/proc` filesystem.
//!
//! This module provides parsers and collectors for reading system and process
//! counters from the `/proc` virtual filesystem.

pub mod parser;
pub mod process;
pub mod system;

pub use process::{CollectError, ProcessCollector};
pub use system::{DEFAULT_DISK_PREFIXES, SystemCollector, is_disk_device};
