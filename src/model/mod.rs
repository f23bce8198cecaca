//! Data model shared by the counter source, the sampling engine and consumers.

mod process;
mod system;

pub use process::{MetricRow, ProcessCpu, ProcessIdentity, ProcessIo};
pub use system::{CpuInfo, CpuTotals, DiskTotals, MemoryTotals, MetricKind, SystemMetrics};
