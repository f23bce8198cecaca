//! Per-process memory of the last observed raw counters.

use crate::model::{ProcessCpu, ProcessIo};
use std::collections::{HashMap, HashSet};

/// Raw counters of one process from the previous cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleEntry {
    pub cpu: ProcessCpu,
    /// `None` when `/proc/[pid]/io` was unreadable.
    pub io: Option<ProcessIo>,
}

/// Previous-cycle counters keyed by pid.
///
/// Owned by the engine, which is its only writer. An entry is created the
/// first time a pid is observed and dropped by [`SampleStore::retain_only`]
/// once a cycle completes without seeing it.
#[derive(Debug, Default)]
pub struct SampleStore {
    entries: HashMap<u32, SampleEntry>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pid: u32) -> Option<&SampleEntry> {
        self.entries.get(&pid)
    }

    /// Returns the previous entry only if it belongs to the same process
    /// incarnation as `cpu`.
    ///
    /// A pid whose start time changed was reused by a new process; its old
    /// entry is discarded and the pid reads as newly observed.
    pub fn baseline(&mut self, pid: u32, cpu: &ProcessCpu) -> Option<SampleEntry> {
        let entry = *self.entries.get(&pid)?;
        if entry.cpu.start_ticks != cpu.start_ticks {
            self.entries.remove(&pid);
            return None;
        }
        Some(entry)
    }

    pub fn put(&mut self, pid: u32, entry: SampleEntry) {
        self.entries.insert(pid, entry);
    }

    /// Drops every pid not in `observed`. Returns how many were removed.
    pub fn retain_only(&mut self, observed: &HashSet<u32>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|pid, _| observed.contains(pid));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ticks: u64, start: u64) -> SampleEntry {
        SampleEntry {
            cpu: ProcessCpu {
                user_ticks: ticks,
                system_ticks: 0,
                start_ticks: start,
            },
            io: None,
        }
    }

    #[test]
    fn test_put_and_get() {
        let mut store = SampleStore::new();
        assert!(store.get(1).is_none());
        store.put(1, entry(10, 1));
        store.put(1, entry(20, 1));
        assert_eq!(store.get(1).unwrap().cpu.user_ticks, 20);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_retain_only_empty_set_clears_store() {
        let mut store = SampleStore::new();
        for pid in 1..=50 {
            store.put(pid, entry(pid as u64, 1));
        }
        assert_eq!(store.retain_only(&HashSet::new()), 50);
        assert!(store.is_empty());
        for pid in 1..=50 {
            assert!(store.get(pid).is_none());
        }
    }

    #[test]
    fn test_retain_only_keeps_observed() {
        let mut store = SampleStore::new();
        store.put(1, entry(1, 1));
        store.put(2, entry(2, 1));
        store.put(3, entry(3, 1));
        let observed: HashSet<u32> = [1, 3, 99].into_iter().collect();
        assert_eq!(store.retain_only(&observed), 1);
        assert!(store.get(1).is_some());
        assert!(store.get(2).is_none());
        assert!(store.get(3).is_some());
        assert!(store.get(99).is_none());
    }

    #[test]
    fn test_baseline_detects_pid_reuse() {
        let mut store = SampleStore::new();
        store.put(42, entry(100, 5000));

        let same = entry(150, 5000).cpu;
        assert_eq!(store.baseline(42, &same), Some(entry(100, 5000)));

        let reused = entry(3, 9000).cpu;
        assert_eq!(store.baseline(42, &reused), None);
        assert!(store.get(42).is_none());
    }
}
