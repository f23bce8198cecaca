//! taskmon - periodic process and system resource monitor for Linux.
//!
//! Samples `/proc` at a fixed interval, turns cumulative counters into
//! per-interval utilisation, and keeps a sorted, filtered process table with
//! a selection that follows its process across cycles.
//!
//! The library is split the same way the data flows:
//! - [`collector`] reads raw counters (`CounterSource`, procfs + mocks)
//! - [`rates`], [`sample_store`] and [`history`] turn them into metrics
//! - [`engine`] runs one cycle, [`scheduler`] runs cycles on a period
//! - [`table`] and [`monitor`] shape the result for a consumer

pub mod collector;
pub mod config;
pub mod engine;
pub mod history;
pub mod model;
pub mod monitor;
pub mod rates;
pub mod sample_store;
pub mod scheduler;
pub mod table;
pub mod terminate;

pub use config::{ConfigError, MonitorConfig};
pub use monitor::{Monitor, Snapshot};
pub use table::{ProcessSortKey, ProcessView, ViewSettings};
pub use terminate::TerminateError;
