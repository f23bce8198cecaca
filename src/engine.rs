//! One sampling cycle: read counters, derive rates, remember the baseline.
//!
//! The engine owns everything that must survive between cycles (previous
//! system snapshots, the per-process [`SampleStore`], the history series)
//! and is driven by the scheduler, one [`Engine::run_cycle`] at a time.

use crate::collector::CounterSource;
use crate::collector::procfs::CollectError;
use crate::history::SystemHistory;
use crate::model::{CpuInfo, CpuTotals, DiskTotals, MetricRow, ProcessIdentity, SystemMetrics};
use crate::rates;
use crate::sample_store::{SampleEntry, SampleStore};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, trace, warn};

/// System-wide counter groups whose failures are tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    Cpu,
    Memory,
    Disk,
    Processes,
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Counter::Cpu => "cpu",
            Counter::Memory => "memory",
            Counter::Disk => "disk",
            Counter::Processes => "process list",
        })
    }
}

/// Health of the counter source as seen by one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    /// Counters that could not be read; their values are carried over
    /// from the last good cycle (or zero before the first one).
    pub stale: Vec<Counter>,
    /// Messages for counters that started failing in this cycle. A counter
    /// that keeps failing is reported once, until it recovers.
    pub diagnostics: Vec<String>,
}

impl SourceStatus {
    pub fn is_stale(&self, counter: Counter) -> bool {
        self.stale.contains(&counter)
    }

    pub fn is_healthy(&self) -> bool {
        self.stale.is_empty()
    }
}

/// Result of one cycle, before it is reconciled with a consumer's view.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutput {
    /// 1-based cycle number.
    pub cycle: u64,
    pub system: SystemMetrics,
    /// One row per live process, in ascending pid order.
    pub rows: Vec<MetricRow>,
    pub status: SourceStatus,
}

/// Sampling engine over a counter source.
pub struct Engine<S: CounterSource> {
    source: S,
    store: SampleStore,
    history: SystemHistory,
    prev_cpu: Option<CpuTotals>,
    prev_disk: Option<DiskTotals>,
    last_system: SystemMetrics,
    last_rows: Vec<MetricRow>,
    failing: HashSet<Counter>,
    cycles: u64,
}

impl<S: CounterSource> Engine<S> {
    pub fn new(source: S, history_len: usize) -> Self {
        Self {
            source,
            store: SampleStore::new(),
            history: SystemHistory::new(history_len),
            prev_cpu: None,
            prev_disk: None,
            last_system: SystemMetrics::default(),
            last_rows: Vec::new(),
            failing: HashSet::new(),
            cycles: 0,
        }
    }

    pub fn history(&self) -> &SystemHistory {
        &self.history
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn cpu_info(&self) -> CpuInfo {
        self.source.read_cpu_info()
    }

    /// Runs one sampling cycle.
    ///
    /// Never fails: unreadable system counters keep their previous value
    /// and are reported in [`CycleOutput::status`], and processes whose
    /// counters vanish mid-cycle are left out of the rows.
    pub fn run_cycle(&mut self) -> CycleOutput {
        let mut status = SourceStatus::default();

        let (cpu_percent, total_delta, cpu_stale) = match self.source.read_system_cpu() {
            Ok(cur) => {
                self.mark_ok(Counter::Cpu);
                let percent = rates::system_cpu_percent(self.prev_cpu.as_ref(), &cur);
                let delta = rates::system_total_delta(self.prev_cpu.as_ref(), &cur);
                self.prev_cpu = Some(cur);
                (percent, delta, false)
            }
            Err(e) => {
                self.mark_failed(Counter::Cpu, &e, &mut status);
                (self.last_system.cpu_percent, 0, true)
            }
        };

        let (mem_percent, mem_total_kb) = match self.source.read_system_memory() {
            Ok(mem) => {
                self.mark_ok(Counter::Memory);
                (rates::system_mem_percent(&mem), mem.total_kb)
            }
            Err(e) => {
                self.mark_failed(Counter::Memory, &e, &mut status);
                (self.last_system.mem_percent, self.last_system.mem_total_kb)
            }
        };

        let disk_kb = match self.source.read_system_disk() {
            Ok(cur) => {
                self.mark_ok(Counter::Disk);
                let kb = rates::system_disk_kb(self.prev_disk.as_ref(), &cur);
                self.prev_disk = Some(cur);
                kb
            }
            Err(e) => {
                self.mark_failed(Counter::Disk, &e, &mut status);
                self.last_system.disk_kb
            }
        };

        let rows = match self.source.list_processes() {
            Ok(processes) => {
                self.mark_ok(Counter::Processes);
                self.sample_processes(processes, total_delta, cpu_stale, mem_total_kb)
            }
            Err(e) => {
                // Keep the store as is: an unreadable list says nothing
                // about which processes exited.
                self.mark_failed(Counter::Processes, &e, &mut status);
                self.last_rows.clone()
            }
        };

        let system = SystemMetrics {
            cpu_percent,
            mem_percent,
            disk_kb,
            mem_total_kb,
        };
        self.history.append(&system);
        self.last_system = system;
        self.last_rows = rows.clone();
        self.cycles += 1;

        debug!(
            cycle = self.cycles,
            cpu = cpu_percent,
            mem = mem_percent,
            disk_kb,
            processes = rows.len(),
            "cycle complete"
        );

        CycleOutput {
            cycle: self.cycles,
            system,
            rows,
            status,
        }
    }

    /// Rates for every listed process.
    ///
    /// While the system CPU read is stale, `prev_cpu` stays at the last good
    /// read, so process CPU baselines are kept as well: both deltas must span
    /// the same window once the system counters come back.
    fn sample_processes(
        &mut self,
        processes: Vec<ProcessIdentity>,
        total_delta: i128,
        cpu_stale: bool,
        mem_total_kb: u64,
    ) -> Vec<MetricRow> {
        let mut observed = HashSet::with_capacity(processes.len());
        let mut rows = Vec::with_capacity(processes.len());

        for identity in processes {
            let pid = identity.pid;
            let Some(cpu) = self.source.read_process_cpu(pid) else {
                trace!(pid, "no cpu counters, skipping");
                continue;
            };
            let Some(rss_kb) = self.source.read_process_rss_kb(pid) else {
                trace!(pid, "no memory counters, skipping");
                continue;
            };
            let io = self.source.read_process_io(pid);

            let baseline = self.store.baseline(pid, &cpu);
            let cpu_percent =
                rates::process_cpu_percent(baseline.as_ref().map(|b| &b.cpu), &cpu, total_delta);
            let io_rate_kb = match &io {
                Some(cur) => rates::process_io_kb(baseline.as_ref().and_then(|b| b.io.as_ref()), cur),
                None => 0.0,
            };

            let cpu = match &baseline {
                Some(prev) if cpu_stale => prev.cpu,
                _ => cpu,
            };
            self.store.put(pid, SampleEntry { cpu, io });
            observed.insert(pid);
            rows.push(MetricRow {
                pid,
                display_name: identity.display_name,
                cpu_percent,
                mem_percent: rates::process_mem_percent(rss_kb, mem_total_kb),
                io_rate_kb,
            });
        }

        let evicted = self.store.retain_only(&observed);
        if evicted > 0 {
            trace!(evicted, "dropped exited processes");
        }

        rows.sort_by_key(|row| row.pid);
        rows
    }

    fn mark_ok(&mut self, counter: Counter) {
        if self.failing.remove(&counter) {
            info!(%counter, "counters readable again");
        }
    }

    fn mark_failed(&mut self, counter: Counter, error: &CollectError, status: &mut SourceStatus) {
        status.stale.push(counter);
        if self.failing.insert(counter) {
            warn!(%counter, %error, "counters unavailable, holding last value");
            status
                .diagnostics
                .push(format!("{} counters unavailable: {}", counter, error));
        } else {
            debug!(%counter, %error, "counters still unavailable");
        }
    }
}
