//! Per-process counter snapshots and the rows derived from them.

use serde::{Deserialize, Serialize};

/// CPU tick counters of one process.
///
/// Source: `/proc/[pid]/stat`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct ProcessCpu {
    /// Ticks spent in user mode (field 14, utime).
    pub user_ticks: u64,
    /// Ticks spent in kernel mode (field 15, stime).
    pub system_ticks: u64,
    /// Ticks after boot when the process started (field 22, starttime).
    ///
    /// Two observations of the same pid with different start ticks belong to
    /// different processes.
    pub start_ticks: u64,
}

impl ProcessCpu {
    pub fn busy_ticks(&self) -> u64 {
        self.user_ticks + self.system_ticks
    }
}

/// Cumulative storage I/O of one process.
///
/// Source: `/proc/[pid]/io` (`read_bytes`, `write_bytes`).
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct ProcessIo {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// A process as enumerated by the counter source.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: u32,
    /// Short command name from `/proc/[pid]/comm`.
    pub display_name: String,
}

impl ProcessIdentity {
    pub fn new(pid: u32, display_name: impl Into<String>) -> Self {
        Self {
            pid,
            display_name: display_name.into(),
        }
    }
}

/// One row of the process table, recomputed every cycle.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MetricRow {
    pub pid: u32,
    pub display_name: String,
    /// Share of all CPU ticks on the machine used by this process.
    pub cpu_percent: f64,
    /// Resident set size as a percentage of `MemTotal`.
    pub mem_percent: f64,
    /// Kilobytes read plus written during the last interval.
    pub io_rate_kb: f64,
}
