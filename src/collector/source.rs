//! The counter source consumed by the sampling engine.

use crate::collector::procfs::{CollectError, ProcessCollector, SystemCollector};
use crate::collector::traits::FileSystem;
use crate::model::{CpuInfo, CpuTotals, DiskTotals, MemoryTotals, ProcessCpu, ProcessIdentity, ProcessIo};
use std::path::PathBuf;
use tracing::{debug, trace};

/// Point-in-time reads of raw OS counters.
///
/// System reads fail with an error the engine turns into a stale value.
/// Per-process reads return `None` when the process is gone or its file
/// cannot be read; the engine never treats that as an error.
pub trait CounterSource: Send {
    /// Live processes in ascending pid order.
    fn list_processes(&self) -> Result<Vec<ProcessIdentity>, CollectError>;

    fn read_system_cpu(&self) -> Result<CpuTotals, CollectError>;

    fn read_system_memory(&self) -> Result<MemoryTotals, CollectError>;

    fn read_system_disk(&self) -> Result<DiskTotals, CollectError>;

    fn read_process_cpu(&self, pid: u32) -> Option<ProcessCpu>;

    /// Resident set size in Kb.
    fn read_process_rss_kb(&self, pid: u32) -> Option<u64>;

    fn read_process_io(&self, pid: u32) -> Option<ProcessIo>;

    /// Static CPU description. Sources without one report "unknown".
    fn read_cpu_info(&self) -> CpuInfo {
        CpuInfo::default()
    }
}

/// Counter source backed by a `/proc` tree.
#[derive(Debug, Clone)]
pub struct ProcfsSource<F: FileSystem + Clone> {
    processes: ProcessCollector<F>,
    system: SystemCollector<F>,
}

impl<F: FileSystem + Clone> ProcfsSource<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        let proc_path = proc_path.into();
        Self {
            processes: ProcessCollector::new(fs.clone(), &proc_path),
            system: SystemCollector::new(fs, proc_path),
        }
    }

    pub fn with_disk_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.system = self.system.with_disk_prefixes(prefixes);
        self
    }
}

/// Turns a per-process read result into an optional value.
fn optional<T>(pid: u32, what: &str, result: Result<T, CollectError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(CollectError::ProcessGone(_)) => {
            trace!(pid, what, "process gone");
            None
        }
        Err(e) => {
            debug!(pid, what, error = %e, "process counters unreadable");
            None
        }
    }
}

impl<F: FileSystem + Clone> CounterSource for ProcfsSource<F> {
    fn list_processes(&self) -> Result<Vec<ProcessIdentity>, CollectError> {
        self.processes.list_processes()
    }

    fn read_system_cpu(&self) -> Result<CpuTotals, CollectError> {
        self.system.read_cpu_totals()
    }

    fn read_system_memory(&self) -> Result<MemoryTotals, CollectError> {
        self.system.read_memory()
    }

    fn read_system_disk(&self) -> Result<DiskTotals, CollectError> {
        self.system.read_disk_totals()
    }

    fn read_process_cpu(&self, pid: u32) -> Option<ProcessCpu> {
        optional(pid, "stat", self.processes.read_cpu(pid))
    }

    fn read_process_rss_kb(&self, pid: u32) -> Option<u64> {
        optional(pid, "status", self.processes.read_rss_kb(pid))
    }

    fn read_process_io(&self, pid: u32) -> Option<ProcessIo> {
        optional(pid, "io", self.processes.read_io(pid))
    }

    fn read_cpu_info(&self) -> CpuInfo {
        match self.system.read_cpu_info() {
            Ok(info) => info,
            Err(e) => {
                debug!(error = %e, "cpuinfo unreadable");
                CpuInfo::default()
            }
        }
    }
}
