//! System-wide counter reads from `/proc/`.

use crate::collector::procfs::parser::{
    parse_cpuinfo, parse_diskstats, parse_meminfo, parse_stat_cpu_line,
};
use crate::collector::procfs::process::CollectError;
use crate::collector::traits::FileSystem;
use crate::model::{CpuInfo, CpuTotals, DiskTotals, MemoryTotals};
use std::path::PathBuf;

/// Device name prefixes counted as physical disks by default.
pub const DEFAULT_DISK_PREFIXES: &[&str] = &["sd", "nvme", "vd", "xvd", "hd", "mmcblk"];

/// Reads system-wide counters from `/proc/`.
#[derive(Debug, Clone)]
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    disk_prefixes: Vec<String>,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            disk_prefixes: DEFAULT_DISK_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Replaces the set of device name prefixes treated as disks.
    pub fn with_disk_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.disk_prefixes = prefixes;
        self
    }

    fn read(&self, name: &str) -> Result<String, CollectError> {
        Ok(self.fs.read_to_string(&self.proc_path.join(name))?)
    }

    /// Aggregate CPU ticks from `/proc/stat`. Idle includes iowait.
    pub fn read_cpu_totals(&self) -> Result<CpuTotals, CollectError> {
        let cpu = parse_stat_cpu_line(&self.read("stat")?)?;
        Ok(CpuTotals::new(cpu.total_ticks(), cpu.idle_ticks()))
    }

    /// `MemTotal` and `MemAvailable` from `/proc/meminfo`.
    pub fn read_memory(&self) -> Result<MemoryTotals, CollectError> {
        let info = parse_meminfo(&self.read("meminfo")?)?;
        Ok(MemoryTotals {
            total_kb: info.mem_total,
            available_kb: info.mem_available,
        })
    }

    /// Read plus written sectors summed over whole physical disks.
    pub fn read_disk_totals(&self) -> Result<DiskTotals, CollectError> {
        let disks = parse_diskstats(&self.read("diskstats")?)?;
        let sector_count = disks
            .iter()
            .filter(|disk| is_disk_device(&disk.device, &self.disk_prefixes))
            .map(|disk| disk.read_sectors + disk.write_sectors)
            .sum();
        Ok(DiskTotals { sector_count })
    }

    /// CPU model and core counts from `/proc/cpuinfo`.
    ///
    /// Some kernels and sandboxes do not provide the file at all; that
    /// yields the "unknown" description instead of an error.
    pub fn read_cpu_info(&self) -> Result<CpuInfo, CollectError> {
        if !self.fs.exists(&self.proc_path.join("cpuinfo")) {
            return Ok(CpuInfo::default());
        }
        Ok(parse_cpuinfo(&self.read("cpuinfo")?))
    }
}

/// Returns true for whole physical disks whose name starts with one of
/// `prefixes`.
///
/// Partitions are rejected so their sectors are not counted twice:
/// `sda1` (letters then digits), `nvme0n1p1` and `mmcblk0p1` (a `p<N>`
/// suffix after a numeric device id).
pub fn is_disk_device(name: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        let Some(rest) = name.strip_prefix(prefix.as_str()) else {
            return false;
        };
        match rest.chars().next() {
            None => false,
            Some(c) if c.is_ascii_digit() => rest.chars().all(|c| c.is_ascii_digit() || c == 'n'),
            Some(_) => rest.chars().all(|c| c.is_ascii_lowercase()),
        }
    })
}
