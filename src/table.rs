//! Process table reconciliation: sorting, filtering and selection tracking.
//!
//! Rows are rebuilt from scratch every cycle. [`reconcile`] turns them into
//! the ordered, filtered sequence a consumer shows, and carries the selected
//! pid over from the previous view when that process is still listed.

use crate::model::MetricRow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparable value of one row under a sort column.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Integer(i64),
    Float(f64),
    String(String),
}

impl SortKey {
    /// Orders two keys of the same column. Floats use IEEE total ordering
    /// so a NaN cannot break the sort.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Integer(a), SortKey::Integer(b)) => a.cmp(b),
            (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
            (SortKey::String(a), SortKey::String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Column the process table is sorted (and filtered) by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessSortKey {
    Pid,
    Name,
    #[default]
    Cpu,
    Mem,
    Io,
}

impl ProcessSortKey {
    pub const ALL: [ProcessSortKey; 5] = [
        ProcessSortKey::Pid,
        ProcessSortKey::Name,
        ProcessSortKey::Cpu,
        ProcessSortKey::Mem,
        ProcessSortKey::Io,
    ];

    /// Numeric columns list the biggest value first; names sort A to Z.
    pub fn ascending(self) -> bool {
        matches!(self, ProcessSortKey::Name)
    }

    pub fn sort_key(self, row: &MetricRow) -> SortKey {
        match self {
            ProcessSortKey::Pid => SortKey::Integer(row.pid as i64),
            ProcessSortKey::Name => SortKey::String(row.display_name.clone()),
            ProcessSortKey::Cpu => SortKey::Float(row.cpu_percent),
            ProcessSortKey::Mem => SortKey::Float(row.mem_percent),
            ProcessSortKey::Io => SortKey::Float(row.io_rate_kb),
        }
    }

    /// Text the filter is matched against: the value as the table shows it.
    pub fn filter_text(self, row: &MetricRow) -> String {
        match self {
            ProcessSortKey::Pid => row.pid.to_string(),
            ProcessSortKey::Name => row.display_name.clone(),
            ProcessSortKey::Cpu => format!("{:.2}", row.cpu_percent),
            ProcessSortKey::Mem => format!("{:.2}", row.mem_percent),
            ProcessSortKey::Io => format!("{:.2}", row.io_rate_kb),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProcessSortKey::Pid => "pid",
            ProcessSortKey::Name => "name",
            ProcessSortKey::Cpu => "cpu",
            ProcessSortKey::Mem => "mem",
            ProcessSortKey::Io => "io",
        }
    }
}

impl fmt::Display for ProcessSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProcessSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessSortKey::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sort key '{}' (expected pid, name, cpu, mem or io)", s))
    }
}

/// The consumer's choices that shape the process view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub sort_key: ProcessSortKey,
    /// Substring filter; empty shows every row.
    pub filter: String,
    /// Pid the consumer selected, if any.
    pub selection: Option<u32>,
}

/// Ordered, filtered rows plus the selection that survived reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessView {
    pub rows: Vec<MetricRow>,
    pub selection: Option<u32>,
}

impl ProcessView {
    /// Position of the selected row in `rows`.
    pub fn selected_index(&self) -> Option<usize> {
        let pid = self.selection?;
        self.rows.iter().position(|row| row.pid == pid)
    }

    pub fn selected_row(&self) -> Option<&MetricRow> {
        self.selected_index().map(|idx| &self.rows[idx])
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.rows.iter().any(|row| row.pid == pid)
    }
}

/// Returns true when `row` passes `filter` under `sort_key`.
pub fn matches_filter(row: &MetricRow, sort_key: ProcessSortKey, filter: &str) -> bool {
    filter.is_empty() || sort_key.filter_text(row).contains(filter)
}

/// Builds the consumer-facing view of this cycle's rows.
///
/// Rows are filtered, then stably sorted, so rows with equal keys keep their
/// input order. The previous selection is kept only if that pid is still in
/// the output; otherwise the view has no selection. It is never moved to a
/// neighbouring row.
pub fn reconcile(
    rows: &[MetricRow],
    sort_key: ProcessSortKey,
    filter: &str,
    previous_selection: Option<u32>,
) -> ProcessView {
    let mut rows: Vec<MetricRow> = rows
        .iter()
        .filter(|row| matches_filter(row, sort_key, filter))
        .cloned()
        .collect();

    let ascending = sort_key.ascending();
    rows.sort_by(|a, b| {
        let cmp = sort_key.sort_key(a).compare(&sort_key.sort_key(b));
        if ascending { cmp } else { cmp.reverse() }
    });

    let selection = previous_selection.filter(|pid| rows.iter().any(|row| row.pid == *pid));
    ProcessView { rows, selection }
}

/// [`reconcile`] driven by a [`ViewSettings`].
pub fn reconcile_with(rows: &[MetricRow], settings: &ViewSettings) -> ProcessView {
    reconcile(rows, settings.sort_key, &settings.filter, settings.selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pid: u32, name: &str, cpu: f64, mem: f64, io: f64) -> MetricRow {
        MetricRow {
            pid,
            display_name: name.to_string(),
            cpu_percent: cpu,
            mem_percent: mem,
            io_rate_kb: io,
        }
    }

    fn sample_rows() -> Vec<MetricRow> {
        vec![
            row(1, "systemd", 0.0, 0.08, 0.0),
            row(512, "sshd", 1.25, 0.05, 4.0),
            row(1024, "bash", 0.0, 0.03, 0.0),
            row(2048, "postgres", 12.5, 0.40, 120.5),
            row(4096, "Xorg", 3.75, 1.10, 0.0),
        ]
    }

    fn pids(view: &ProcessView) -> Vec<u32> {
        view.rows.iter().map(|r| r.pid).collect()
    }

    #[test]
    fn test_sort_by_cpu_descending_stable() {
        let view = reconcile(&sample_rows(), ProcessSortKey::Cpu, "", None);
        // systemd and bash tie at 0.0 and keep pid-ascending input order.
        assert_eq!(pids(&view), vec![2048, 4096, 512, 1, 1024]);
    }

    #[test]
    fn test_sort_by_pid_descending() {
        let view = reconcile(&sample_rows(), ProcessSortKey::Pid, "", None);
        assert_eq!(pids(&view), vec![4096, 2048, 1024, 512, 1]);
    }

    #[test]
    fn test_sort_by_name_ascending() {
        let view = reconcile(&sample_rows(), ProcessSortKey::Name, "", None);
        let names: Vec<&str> = view.rows.iter().map(|r| r.display_name.as_str()).collect();
        // Byte order: uppercase sorts before lowercase.
        assert_eq!(names, vec!["Xorg", "bash", "postgres", "sshd", "systemd"]);
    }

    #[test]
    fn test_sort_by_mem_and_io() {
        let view = reconcile(&sample_rows(), ProcessSortKey::Mem, "", None);
        assert_eq!(pids(&view), vec![4096, 2048, 1, 512, 1024]);
        let view = reconcile(&sample_rows(), ProcessSortKey::Io, "", None);
        assert_eq!(pids(&view), vec![2048, 512, 1, 1024, 4096]);
    }

    #[test]
    fn test_filter_matches_sort_column_text() {
        // Sorted by cpu, the filter looks at "12.50", "3.75", "1.25", "0.00".
        let view = reconcile(&sample_rows(), ProcessSortKey::Cpu, "25", None);
        assert_eq!(pids(&view), vec![512]);

        let view = reconcile(&sample_rows(), ProcessSortKey::Cpu, ".5", None);
        assert_eq!(pids(&view), vec![2048]);

        // The same text against names matches nothing.
        let view = reconcile(&sample_rows(), ProcessSortKey::Name, "25", None);
        assert!(view.rows.is_empty());
    }

    #[test]
    fn test_filter_is_substring_not_prefix() {
        let view = reconcile(&sample_rows(), ProcessSortKey::Name, "sh", None);
        assert_eq!(pids(&view), vec![1024, 512]);

        let view = reconcile(&sample_rows(), ProcessSortKey::Pid, "0", None);
        assert_eq!(pids(&view), vec![4096, 2048, 1024]);
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let view = reconcile(&sample_rows(), ProcessSortKey::Name, "xorg", None);
        assert!(view.rows.is_empty());
    }

    #[test]
    fn test_selection_preserved_across_reorder() {
        let mut rows = sample_rows();
        let view = reconcile(&rows, ProcessSortKey::Cpu, "", Some(512));
        assert_eq!(view.selection, Some(512));
        assert_eq!(view.selected_index(), Some(2));

        // Next cycle sshd becomes the top consumer.
        rows[1].cpu_percent = 50.0;
        let view = reconcile(&rows, ProcessSortKey::Cpu, "", view.selection);
        assert_eq!(view.selection, Some(512));
        assert_eq!(view.selected_index(), Some(0));
        assert_eq!(view.selected_row().unwrap().display_name, "sshd");
    }

    #[test]
    fn test_selection_dropped_when_process_exits() {
        let mut rows = sample_rows();
        rows.retain(|r| r.pid != 512);
        let view = reconcile(&rows, ProcessSortKey::Cpu, "", Some(512));
        assert_eq!(view.selection, None);
        assert_eq!(view.selected_index(), None);
    }

    #[test]
    fn test_selection_dropped_when_filtered_out() {
        let view = reconcile(&sample_rows(), ProcessSortKey::Name, "post", Some(512));
        assert_eq!(pids(&view), vec![2048]);
        assert_eq!(view.selection, None);
    }

    #[test]
    fn test_empty_rows() {
        let view = reconcile(&[], ProcessSortKey::Cpu, "", Some(1));
        assert!(view.rows.is_empty());
        assert_eq!(view.selection, None);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let rows = sample_rows();
        let first = reconcile(&rows, ProcessSortKey::Cpu, "0", Some(1));
        let second = reconcile(&rows, ProcessSortKey::Cpu, "0", Some(1));
        assert_eq!(first, second);
        // Feeding the output back in changes nothing either.
        let third = reconcile(&first.rows, ProcessSortKey::Cpu, "0", first.selection);
        assert_eq!(first, third);
    }

    #[test]
    fn test_nan_does_not_panic() {
        let mut rows = sample_rows();
        rows[0].cpu_percent = f64::NAN;
        let view = reconcile(&rows, ProcessSortKey::Cpu, "", None);
        assert_eq!(view.rows.len(), 5);
    }

    #[test]
    fn test_reconcile_with_settings() {
        let settings = ViewSettings {
            sort_key: ProcessSortKey::Pid,
            filter: "4".to_string(),
            selection: Some(4096),
        };
        let view = reconcile_with(&sample_rows(), &settings);
        assert_eq!(pids(&view), vec![4096, 2048, 1024]);
        assert_eq!(view.selection, Some(4096));
    }

    #[test]
    fn test_sort_key_from_str() {
        assert_eq!("cpu".parse::<ProcessSortKey>(), Ok(ProcessSortKey::Cpu));
        assert_eq!(" MEM ".parse::<ProcessSortKey>(), Ok(ProcessSortKey::Mem));
        assert!("rss".parse::<ProcessSortKey>().is_err());
        for key in ProcessSortKey::ALL {
            assert_eq!(key.to_string().parse::<ProcessSortKey>(), Ok(key));
        }
    }
}
