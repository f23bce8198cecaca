//! System-wide counter snapshots and the metrics derived from them.
//!
//! Counter snapshots are raw, monotonically increasing values as read from
//! `/proc`. They only become meaningful when two consecutive snapshots are
//! differenced by [`crate::rates`].

use serde::{Deserialize, Serialize};

/// Aggregate CPU tick counters.
///
/// Source: first `cpu` line of `/proc/stat`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct CpuTotals {
    /// Sum of user, nice, system, idle, iowait, irq, softirq and steal ticks.
    pub total_ticks: u64,
    /// Idle plus iowait ticks. Always `<= total_ticks`.
    pub idle_ticks: u64,
}

impl CpuTotals {
    pub fn new(total_ticks: u64, idle_ticks: u64) -> Self {
        Self {
            total_ticks,
            idle_ticks,
        }
    }
}

/// Memory counters needed for the system and per-process memory percentages.
///
/// Source: `/proc/meminfo` (values in Kb).
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct MemoryTotals {
    /// `MemTotal`.
    pub total_kb: u64,
    /// `MemAvailable`.
    pub available_kb: u64,
}

/// Cumulative sectors transferred across all disk-class devices.
///
/// Source: `/proc/diskstats`, read sectors (field 6) plus written sectors
/// (field 10) of every whole physical disk.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct DiskTotals {
    pub sector_count: u64,
}

/// System-level derived values for one sampling cycle.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct SystemMetrics {
    /// Busy CPU percentage over the last interval.
    pub cpu_percent: f64,
    /// Used memory percentage, `(MemTotal - MemAvailable) / MemTotal`.
    pub mem_percent: f64,
    /// Kilobytes transferred to or from disk during the last interval.
    pub disk_kb: f64,
    /// `MemTotal` in Kb, denominator for per-process memory percentages.
    pub mem_total_kb: u64,
}

/// Static CPU description shown next to the live metrics.
///
/// Source: `/proc/cpuinfo`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CpuInfo {
    /// First `model name` entry.
    pub model: String,
    /// Physical cores per package (`cpu cores`).
    pub cores: u32,
    /// Number of `processor` entries, i.e. logical CPUs.
    pub threads: u32,
}

impl Default for CpuInfo {
    fn default() -> Self {
        Self {
            model: "unknown".to_string(),
            cores: 0,
            threads: 0,
        }
    }
}

/// System metric series kept in history.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Mem,
    Disk,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Mem, MetricKind::Disk];

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU %",
            MetricKind::Mem => "MEM %",
            MetricKind::Disk => "Disk KB/s",
        }
    }

    /// Picks this series' value out of a cycle's system metrics.
    pub fn value_of(self, metrics: &SystemMetrics) -> f64 {
        match self {
            MetricKind::Cpu => metrics.cpu_percent,
            MetricKind::Mem => metrics.mem_percent,
            MetricKind::Disk => metrics.disk_kb,
        }
    }
}
