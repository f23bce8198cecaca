//! Termination requests for the selected process.
//!
//! The monitor only decides whether a pid is a valid target; delivering
//! the signal is the job of a [`Terminator`].

use crate::table::ProcessView;
use std::io;

/// Delivers a termination request to a process.
pub trait Terminator: Send + Sync {
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// Sends SIGTERM, letting the target shut down cleanly.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTerminator;

impl Terminator for SignalTerminator {
    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> io::Result<()> {
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        // SAFETY: kill(2) takes plain integers and touches no memory of ours.
        // pid is positive, so the signal goes to exactly one process and
        // never to a process group.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self, _pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process termination is not supported on this platform",
        ))
    }
}

/// Why a termination request was not carried out.
#[derive(Debug)]
pub enum TerminateError {
    /// No process is selected.
    NoSelection,
    /// The pid can never name a single process (0, or beyond `pid_t`).
    InvalidPid(u32),
    /// The pid is not in the last published process view.
    NotPresent(u32),
    /// The OS refused, typically for lack of permission or because the
    /// process is protected or already gone.
    Rejected { pid: u32, source: io::Error },
}

impl std::fmt::Display for TerminateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminateError::NoSelection => write!(f, "select a process first"),
            TerminateError::InvalidPid(pid) => write!(f, "invalid pid {}", pid),
            TerminateError::NotPresent(pid) => {
                write!(f, "process {} is not in the current process list", pid)
            }
            TerminateError::Rejected { pid, source } => {
                write!(f, "failed to terminate process {}: {}", pid, source)
            }
        }
    }
}

impl std::error::Error for TerminateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TerminateError::Rejected { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Checks that `target` names a process listed in `view`.
pub fn validate_target(view: &ProcessView, target: Option<u32>) -> Result<u32, TerminateError> {
    let pid = target.ok_or(TerminateError::NoSelection)?;
    if pid == 0 || pid > i32::MAX as u32 {
        return Err(TerminateError::InvalidPid(pid));
    }
    if !view.contains(pid) {
        return Err(TerminateError::NotPresent(pid));
    }
    Ok(pid)
}

/// Validates `target` against `view` and hands it to `terminator`.
pub fn request_termination(
    view: &ProcessView,
    target: Option<u32>,
    terminator: &dyn Terminator,
) -> Result<u32, TerminateError> {
    let pid = validate_target(view, target)?;
    terminator
        .terminate(pid)
        .map_err(|source| TerminateError::Rejected { pid, source })?;
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetricRow;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTerminator {
        sent: Mutex<Vec<u32>>,
    }

    impl Terminator for RecordingTerminator {
        fn terminate(&self, pid: u32) -> io::Result<()> {
            self.sent.lock().unwrap().push(pid);
            Ok(())
        }
    }

    struct DenyingTerminator;

    impl Terminator for DenyingTerminator {
        fn terminate(&self, _pid: u32) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }
    }

    fn view(pids: &[u32]) -> ProcessView {
        ProcessView {
            rows: pids
                .iter()
                .map(|&pid| MetricRow {
                    pid,
                    display_name: format!("proc{pid}"),
                    cpu_percent: 0.0,
                    mem_percent: 0.0,
                    io_rate_kb: 0.0,
                })
                .collect(),
            selection: None,
        }
    }

    #[test]
    fn test_request_termination_sends_to_listed_pid() {
        let terminator = RecordingTerminator::default();
        let pid = request_termination(&view(&[1, 42]), Some(42), &terminator).unwrap();
        assert_eq!(pid, 42);
        assert_eq!(*terminator.sent.lock().unwrap(), vec![42]);
    }

    #[test]
    fn test_request_termination_without_selection() {
        let terminator = RecordingTerminator::default();
        let err = request_termination(&view(&[1]), None, &terminator).unwrap_err();
        assert!(matches!(err, TerminateError::NoSelection));
        assert_eq!(err.to_string(), "select a process first");
        assert!(terminator.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_request_termination_invalid_pid() {
        let terminator = RecordingTerminator::default();
        for pid in [0, u32::MAX, i32::MAX as u32 + 1] {
            let err = request_termination(&view(&[1]), Some(pid), &terminator).unwrap_err();
            assert!(matches!(err, TerminateError::InvalidPid(p) if p == pid));
        }
        assert!(terminator.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_request_termination_not_present() {
        let terminator = RecordingTerminator::default();
        let err = request_termination(&view(&[1, 2]), Some(3), &terminator).unwrap_err();
        assert!(matches!(err, TerminateError::NotPresent(3)));
        assert!(terminator.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_request_termination_rejected_by_os() {
        let err = request_termination(&view(&[1]), Some(1), &DenyingTerminator).unwrap_err();
        match err {
            TerminateError::Rejected { pid, ref source } => {
                assert_eq!(pid, 1);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_terminator_stops_child() {
        use std::os::unix::process::ExitStatusExt;

        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        SignalTerminator.terminate(child.id()).unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(libc::SIGTERM));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_terminator_missing_process() {
        // Above any configurable pid_max.
        let err = SignalTerminator.terminate(i32::MAX as u32).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
    }
}
