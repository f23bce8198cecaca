//! Counter collection from the Linux `/proc` filesystem.
//!
//! Everything above this module sees counters only through the
//! [`CounterSource`] trait. The procfs implementation reads through the
//! [`FileSystem`] trait so tests can run it against in-memory fixtures.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ProcfsSource (CounterSource)                │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  ProcessCollector   │   │     SystemCollector         │  │
//! │  │  - /proc/[pid]/stat │   │  - /proc/stat               │  │
//! │  │  - /proc/[pid]/io   │   │  - /proc/meminfo            │  │
//! │  │  - /proc/[pid]/...  │   │  - /proc/diskstats          │  │
//! │  └──────────┬──────────┘   └──────────────┬──────────────┘  │
//! │             └──────────────┬──────────────┘                 │
//! │                     ┌──────▼──────┐                         │
//! │                     │  FileSystem │ (trait)                 │
//! │                     └──────┬──────┘                         │
//! └────────────────────────────┼────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!       ┌──────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use taskmon::collector::{CounterSource, MockFs, ProcfsSource};
//!
//! let source = ProcfsSource::new(MockFs::typical_system(), "/proc");
//! let processes = source.list_processes().unwrap();
//! assert_eq!(processes.len(), 4);
//! ```

pub mod mock;
pub mod procfs;
mod source;
pub mod traits;

pub use mock::MockFs;
pub use procfs::CollectError;
pub use source::{CounterSource, ProcfsSource};
pub use traits::{FileSystem, RealFs};
