//! Fixed-size history of system metrics for time-series display.

use crate::model::{MetricKind, SystemMetrics};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Number of samples kept per series unless configured otherwise.
pub const DEFAULT_HISTORY_LEN: usize = 60;

/// A fixed-size circular buffer of samples.
///
/// Slots that were never written read as `0.0`, so a freshly created buffer
/// already has `capacity()` values.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRingBuffer {
    data: Vec<f64>,
    /// Next slot to write; also the oldest sample once the buffer is full.
    position: usize,
    written: u64,
}

impl HistoryRingBuffer {
    /// Creates a buffer holding `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)],
            position: 0,
            written: 0,
        }
    }

    /// Stores `value` at the cursor, overwriting the oldest sample.
    pub fn append(&mut self, value: f64) {
        self.data[self.position] = value;
        self.position = (self.position + 1) % self.data.len();
        self.written += 1;
    }

    /// All `capacity()` samples, oldest first.
    ///
    /// The iterator borrows the buffer and can be cloned to restart it.
    pub fn ordered_view(&self) -> impl Iterator<Item = f64> + Clone + '_ {
        let (newer, older) = self.data.split_at(self.position);
        older.iter().chain(newer.iter()).copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.ordered_view().collect()
    }

    /// Most recently appended sample, or `None` before the first append.
    pub fn latest(&self) -> Option<f64> {
        if self.written == 0 {
            return None;
        }
        let idx = (self.position + self.data.len() - 1) % self.data.len();
        Some(self.data[idx])
    }

    /// Largest value currently held (unwritten slots count as 0.0).
    pub fn peak(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Total number of appends since creation, including overwritten ones.
    pub fn samples_written(&self) -> u64 {
        self.written
    }
}

impl Serialize for HistoryRingBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.ordered_view())
    }
}

/// One history series per [`MetricKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct SystemHistory {
    cpu: HistoryRingBuffer,
    mem: HistoryRingBuffer,
    disk: HistoryRingBuffer,
}

impl SystemHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            cpu: HistoryRingBuffer::new(capacity),
            mem: HistoryRingBuffer::new(capacity),
            disk: HistoryRingBuffer::new(capacity),
        }
    }

    /// Appends one cycle's values to every series.
    pub fn append(&mut self, metrics: &SystemMetrics) {
        for kind in MetricKind::ALL {
            let value = kind.value_of(metrics);
            self.series_mut(kind).append(value);
        }
    }

    pub fn series(&self, kind: MetricKind) -> &HistoryRingBuffer {
        match kind {
            MetricKind::Cpu => &self.cpu,
            MetricKind::Mem => &self.mem,
            MetricKind::Disk => &self.disk,
        }
    }

    fn series_mut(&mut self, kind: MetricKind) -> &mut HistoryRingBuffer {
        match kind {
            MetricKind::Cpu => &mut self.cpu,
            MetricKind::Mem => &mut self.mem,
            MetricKind::Disk => &mut self.disk,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cpu.capacity()
    }
}

impl Default for SystemHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

impl Serialize for SystemHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(MetricKind::ALL.len()))?;
        for kind in MetricKind::ALL {
            map.serialize_entry(&kind, self.series(kind))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_reads_all_zero() {
        let buf = HistoryRingBuffer::new(60);
        let values = buf.to_vec();
        assert_eq!(values.len(), 60);
        assert!(values.iter().all(|v| *v == 0.0));
        assert_eq!(buf.latest(), None);
    }

    #[test]
    fn test_partial_fill_pads_with_zero() {
        let mut buf = HistoryRingBuffer::new(5);
        buf.append(1.0);
        buf.append(2.0);
        assert_eq!(buf.to_vec(), vec![0.0, 0.0, 0.0, 1.0, 2.0]);
        assert_eq!(buf.latest(), Some(2.0));
    }

    #[test]
    fn test_exact_fill_is_chronological() {
        let mut buf = HistoryRingBuffer::new(60);
        for i in 0..60 {
            buf.append(i as f64);
        }
        let expected: Vec<f64> = (0..60).map(|i| i as f64).collect();
        assert_eq!(buf.to_vec(), expected);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut buf = HistoryRingBuffer::new(4);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            buf.append(v);
        }
        assert_eq!(buf.to_vec(), vec![2.0, 3.0, 4.0, 5.0]);

        // Wrap several times; the view never shows the cursor seam.
        for v in 6..=23 {
            buf.append(v as f64);
        }
        assert_eq!(buf.to_vec(), vec![20.0, 21.0, 22.0, 23.0]);
        assert_eq!(buf.samples_written(), 23);
    }

    #[test]
    fn test_ordered_view_is_restartable() {
        let mut buf = HistoryRingBuffer::new(3);
        buf.append(7.0);
        let view = buf.ordered_view();
        let first: Vec<f64> = view.clone().collect();
        let second: Vec<f64> = view.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut buf = HistoryRingBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.append(3.0);
        buf.append(4.0);
        assert_eq!(buf.to_vec(), vec![4.0]);
    }

    #[test]
    fn test_peak() {
        let mut buf = HistoryRingBuffer::new(3);
        assert_eq!(buf.peak(), 0.0);
        buf.append(12.5);
        buf.append(3.0);
        assert_eq!(buf.peak(), 12.5);
    }

    #[test]
    fn test_system_history_append() {
        let mut history = SystemHistory::new(3);
        history.append(&SystemMetrics {
            cpu_percent: 60.0,
            mem_percent: 25.0,
            disk_kb: 1000.0,
            mem_total_kb: 1,
        });
        assert_eq!(history.series(MetricKind::Cpu).to_vec(), vec![0.0, 0.0, 60.0]);
        assert_eq!(history.series(MetricKind::Mem).to_vec(), vec![0.0, 0.0, 25.0]);
        assert_eq!(history.series(MetricKind::Disk).to_vec(), vec![0.0, 0.0, 1000.0]);
        assert_eq!(history.capacity(), 3);
    }

    #[test]
    fn test_system_history_serializes_ordered() {
        let mut history = SystemHistory::new(2);
        history.append(&SystemMetrics {
            cpu_percent: 1.0,
            ..Default::default()
        });
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["Cpu"], serde_json::json!([0.0, 1.0]));
        assert_eq!(json["Disk"], serde_json::json!([0.0, 0.0]));
    }
}
