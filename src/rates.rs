//! Rate and percentage computation from pairs of counter snapshots.
//!
//! Every function here is pure: the previous snapshot is passed in by the
//! caller (the engine keeps it in [`crate::sample_store::SampleStore`] or in
//! its own fields) and nothing is remembered between calls.
//!
//! Rates are per sampling interval. With the default one second interval
//! they read as per-second values.

use crate::model::{CpuTotals, DiskTotals, MemoryTotals, ProcessCpu, ProcessIo};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bytes per sector in `/proc/diskstats`, fixed by the kernel regardless of
/// the device's physical sector size.
pub const SECTOR_SIZE: u64 = 512;

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Signed difference of two counters.
///
/// Unlike a saturating subtraction, a counter that went backwards yields a
/// negative delta so callers can decide what a regression means.
pub fn signed_delta(curr: u64, prev: u64) -> i128 {
    curr as i128 - prev as i128
}

/// Tick delta of the whole machine between two `/proc/stat` reads.
///
/// Zero when there is no usable baseline.
pub fn system_total_delta(prev: Option<&CpuTotals>, cur: &CpuTotals) -> i128 {
    match prev {
        Some(prev) if prev.total_ticks != 0 => signed_delta(cur.total_ticks, prev.total_ticks),
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// System metrics
// ---------------------------------------------------------------------------

/// Busy CPU percentage between two aggregate snapshots.
///
/// Returns 0 on the first observation (no baseline) and when the total
/// did not advance. Jitter may push the result slightly outside [0, 100];
/// it is returned as computed.
pub fn system_cpu_percent(prev: Option<&CpuTotals>, cur: &CpuTotals) -> f64 {
    let total = system_total_delta(prev, cur);
    let Some(prev) = prev else {
        return 0.0;
    };
    if total <= 0 {
        return 0.0;
    }
    let idle = signed_delta(cur.idle_ticks, prev.idle_ticks);
    100.0 * (1.0 - idle as f64 / total as f64)
}

/// Used memory percentage, `(MemTotal - MemAvailable) / MemTotal`.
pub fn system_mem_percent(mem: &MemoryTotals) -> f64 {
    if mem.total_kb == 0 {
        return 0.0;
    }
    100.0 * signed_delta(mem.total_kb, mem.available_kb) as f64 / mem.total_kb as f64
}

/// Kilobytes moved to or from disk during the interval.
///
/// Returns 0 without a prior baseline (absent or zero sector count).
pub fn system_disk_kb(prev: Option<&DiskTotals>, cur: &DiskTotals) -> f64 {
    match prev {
        Some(prev) if prev.sector_count != 0 => {
            signed_delta(cur.sector_count, prev.sector_count) as f64 * SECTOR_SIZE as f64 / 1024.0
        }
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Process metrics
// ---------------------------------------------------------------------------

/// Share of all machine ticks consumed by one process during the interval.
///
/// The denominator is the system-wide tick delta, not a per-core value, so
/// a process saturating one core of an 8-core machine reads about 12.5%.
/// A process seen for the first time reads 0.
pub fn process_cpu_percent(
    prev: Option<&ProcessCpu>,
    cur: &ProcessCpu,
    system_total_delta: i128,
) -> f64 {
    let Some(prev) = prev else {
        return 0.0;
    };
    if system_total_delta <= 0 {
        return 0.0;
    }
    let busy = signed_delta(cur.busy_ticks(), prev.busy_ticks());
    100.0 * busy as f64 / system_total_delta as f64
}

/// Resident set size as a percentage of total memory.
pub fn process_mem_percent(rss_kb: u64, mem_total_kb: u64) -> f64 {
    if mem_total_kb == 0 {
        return 0.0;
    }
    100.0 * rss_kb as f64 / mem_total_kb as f64
}

/// Kilobytes read plus written by one process during the interval.
///
/// A counter that went backwards yields a negative value; it is not floored.
pub fn process_io_kb(prev: Option<&ProcessIo>, cur: &ProcessIo) -> f64 {
    let Some(prev) = prev else {
        return 0.0;
    };
    let bytes = signed_delta(cur.bytes_read, prev.bytes_read)
        + signed_delta(cur.bytes_written, prev.bytes_written);
    bytes as f64 / 1024.0
}
