//! Per-process counter reads from `/proc/[pid]/`.

use crate::collector::procfs::parser::{parse_proc_io, parse_proc_stat, parse_proc_status};
use crate::collector::traits::FileSystem;
use crate::model::{ProcessCpu, ProcessIdentity, ProcessIo};
use std::io;
use std::path::PathBuf;

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// Process disappeared during collection.
    ProcessGone(u32),
    /// I/O error reading a `/proc` file.
    Io(io::Error),
    /// Malformed `/proc` content.
    Parse(String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CollectError {
    fn from(e: io::Error) -> Self {
        CollectError::Io(e)
    }
}

impl From<super::parser::ParseError> for CollectError {
    fn from(e: super::parser::ParseError) -> Self {
        CollectError::Parse(e.message)
    }
}

/// Reads counters of individual processes.
#[derive(Debug, Clone)]
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Enumerates live processes in ascending pid order.
    ///
    /// Processes that exit while being enumerated still appear; their
    /// detail reads fail later and the caller drops them.
    pub fn list_processes(&self) -> Result<Vec<ProcessIdentity>, CollectError> {
        let mut pids: Vec<u32> = self
            .fs
            .read_dir(&self.proc_path)?
            .iter()
            .filter_map(|path| path.file_name()?.to_str()?.parse::<u32>().ok())
            .filter(|pid| *pid > 0)
            .collect();
        pids.sort_unstable();

        Ok(pids
            .into_iter()
            .map(|pid| ProcessIdentity::new(pid, self.display_name(pid)))
            .collect())
    }

    /// Name from `comm`, then from the stat comm field, then "unknown".
    fn display_name(&self, pid: u32) -> String {
        if let Ok(comm) = self.fs.read_to_string(&self.pid_file(pid, "comm")) {
            let comm = comm.trim();
            if !comm.is_empty() {
                return comm.to_string();
            }
        }
        self.fs
            .read_to_string(&self.pid_file(pid, "stat"))
            .ok()
            .and_then(|content| parse_proc_stat(&content).ok())
            .map(|stat| stat.comm)
            .filter(|comm| !comm.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Reads utime/stime/starttime from `/proc/[pid]/stat`.
    pub fn read_cpu(&self, pid: u32) -> Result<ProcessCpu, CollectError> {
        let content = self.read_pid_file(pid, "stat")?;
        let stat = parse_proc_stat(&content)?;
        Ok(ProcessCpu {
            user_ticks: stat.utime,
            system_ticks: stat.stime,
            start_ticks: stat.starttime,
        })
    }

    /// Reads `VmRSS` (Kb) from `/proc/[pid]/status`.
    ///
    /// Kernel threads have no resident set and report 0.
    pub fn read_rss_kb(&self, pid: u32) -> Result<u64, CollectError> {
        let content = self.read_pid_file(pid, "status")?;
        Ok(parse_proc_status(&content)?.vm_rss.unwrap_or(0))
    }

    /// Reads `read_bytes`/`write_bytes` from `/proc/[pid]/io`.
    ///
    /// Usually requires the same uid as the target (or CAP_SYS_PTRACE).
    pub fn read_io(&self, pid: u32) -> Result<ProcessIo, CollectError> {
        let content = self.read_pid_file(pid, "io")?;
        let io = parse_proc_io(&content)?;
        Ok(ProcessIo {
            bytes_read: io.read_bytes,
            bytes_written: io.write_bytes,
        })
    }

    fn pid_file(&self, pid: u32, name: &str) -> PathBuf {
        self.proc_path.join(pid.to_string()).join(name)
    }

    fn read_pid_file(&self, pid: u32, name: &str) -> Result<String, CollectError> {
        let path = self.pid_file(pid, name);
        self.fs
            .read_to_string(&path)
            .map_err(|e| classify_read_error(pid, e))
    }
}

/// Maps a failed read of a per-pid file to `ProcessGone` when the process
/// has exited. ESRCH is what reading a reaped process's open file returns.
fn classify_read_error(pid: u32, e: io::Error) -> CollectError {
    if e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ESRCH) {
        CollectError::ProcessGone(pid)
    } else {
        CollectError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, io_text, stat_line};

    fn collector() -> ProcessCollector<MockFs> {
        ProcessCollector::new(MockFs::typical_system(), "/proc")
    }

    #[test]
    fn test_list_processes_sorted() {
        let list = collector().list_processes().unwrap();
        let pids: Vec<u32> = list.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 512, 1024, 2048]);
        assert_eq!(list[0].display_name, "systemd");
        assert_eq!(list[3].display_name, "postgres");
    }

    #[test]
    fn test_list_processes_ignores_non_pid_entries() {
        let mut fs = MockFs::bare_system();
        fs.add_dir("/proc/self");
        fs.add_dir("/proc/sys");
        fs.add_dir("/proc/0");
        fs.add_process(7, &stat_line(7, "worker", 1, 1, 1), "Name:\tworker\n", "", "worker\n");
        let list = ProcessCollector::new(fs, "/proc").list_processes().unwrap();
        assert_eq!(list, vec![ProcessIdentity::new(7, "worker")]);
    }

    #[test]
    fn test_list_processes_without_proc() {
        let collector = ProcessCollector::new(MockFs::new(), "/proc");
        assert!(matches!(
            collector.list_processes(),
            Err(CollectError::Io(_))
        ));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut fs = MockFs::bare_system();
        fs.add_file("/proc/10/stat", stat_line(10, "from stat", 1, 1, 1));
        fs.add_dir("/proc/11");
        let collector = ProcessCollector::new(fs, "/proc");
        let list = collector.list_processes().unwrap();
        assert_eq!(list[0].display_name, "from stat");
        assert_eq!(list[1].display_name, "unknown");
    }

    #[test]
    fn test_read_cpu() {
        let cpu = collector().read_cpu(2048).unwrap();
        assert_eq!(cpu.user_ticks, 400);
        assert_eq!(cpu.system_ticks, 150);
        assert_eq!(cpu.start_ticks, 20000);
    }

    #[test]
    fn test_read_cpu_gone() {
        assert!(matches!(
            collector().read_cpu(9999),
            Err(CollectError::ProcessGone(9999))
        ));
    }

    #[test]
    fn test_read_cpu_malformed() {
        let mut fs = MockFs::bare_system();
        fs.add_file("/proc/5/stat", "garbage");
        let collector = ProcessCollector::new(fs, "/proc");
        assert!(matches!(collector.read_cpu(5), Err(CollectError::Parse(_))));
    }

    #[test]
    fn test_read_rss_kb() {
        assert_eq!(collector().read_rss_kb(1).unwrap(), 12288);

        let mut fs = MockFs::bare_system();
        fs.add_file("/proc/2/status", "Name:\tkthreadd\nPid:\t2\n");
        assert_eq!(ProcessCollector::new(fs, "/proc").read_rss_kb(2).unwrap(), 0);
    }

    #[test]
    fn test_read_io() {
        let mut fs = MockFs::typical_system();
        fs.add_file("/proc/1024/io", io_text(8192, 1024));
        let collector = ProcessCollector::new(fs, "/proc");
        let io = collector.read_io(1024).unwrap();
        assert_eq!(io.bytes_read, 8192);
        assert_eq!(io.bytes_written, 1024);
        assert!(collector.read_io(2048).is_err());
    }

    #[test]
    fn test_collect_error_display() {
        assert_eq!(
            CollectError::ProcessGone(42).to_string(),
            "process 42 disappeared"
        );
        assert_eq!(
            CollectError::Parse("bad".into()).to_string(),
            "parse error: bad"
        );
    }
}
