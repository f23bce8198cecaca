//! Consumer facade over the sampling engine.
//!
//! A [`Monitor`] owns an [`Engine`], a [`Scheduler`] and the consumer's
//! [`ViewSettings`]. Each cycle is assembled into a new [`Snapshot`] and
//! published as an `Arc`; readers keep whatever snapshot they cloned and
//! never observe a half-built one.
//!
//! Lock order is always engine, then view, then subscribers.

use crate::collector::{CounterSource, ProcfsSource, RealFs};
use crate::config::{ConfigError, MonitorConfig};
use crate::engine::{Engine, SourceStatus};
use crate::history::SystemHistory;
use crate::model::{CpuInfo, MetricKind, MetricRow, SystemMetrics};
use crate::scheduler::{Scheduler, SchedulerState};
use crate::table::{self, ProcessSortKey, ProcessView, ViewSettings};
use crate::terminate::{self, SignalTerminator, TerminateError, Terminator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Everything a consumer needs to render one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Cycle that produced the counters; 0 before the first cycle.
    pub cycle: u64,
    pub taken_at: DateTime<Utc>,
    pub system: SystemMetrics,
    pub history: SystemHistory,
    pub view: ProcessView,
    pub settings: ViewSettings,
    pub status: SourceStatus,
}

impl Snapshot {
    fn empty(history_len: usize, settings: ViewSettings) -> Self {
        Self {
            cycle: 0,
            taken_at: Utc::now(),
            system: SystemMetrics::default(),
            history: SystemHistory::new(history_len),
            view: ProcessView::default(),
            settings,
            status: SourceStatus::default(),
        }
    }
}

struct ViewState {
    settings: ViewSettings,
    /// Unfiltered rows of the last cycle, in pid order.
    rows: Vec<MetricRow>,
    snapshot: Arc<Snapshot>,
}

struct Shared<S: CounterSource> {
    engine: Mutex<Engine<S>>,
    view: Mutex<ViewState>,
    subscribers: Mutex<Vec<Sender<Arc<Snapshot>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl<S: CounterSource> Shared<S> {
    fn cycle(&self) -> Arc<Snapshot> {
        let mut engine = lock(&self.engine);
        let output = engine.run_cycle();
        let history = engine.history().clone();

        let mut state = lock(&self.view);
        let view = table::reconcile_with(&output.rows, &state.settings);
        state.settings.selection = view.selection;

        for message in &output.status.diagnostics {
            warn!(cycle = output.cycle, "{}", message);
        }

        let snapshot = Arc::new(Snapshot {
            cycle: output.cycle,
            taken_at: Utc::now(),
            system: output.system,
            history,
            view,
            settings: state.settings.clone(),
            status: output.status,
        });
        state.rows = output.rows;
        state.snapshot = snapshot.clone();
        // Still under the view lock: subscribers see snapshots in the
        // order they were stored.
        self.publish(&snapshot);
        snapshot
    }

    /// Applies `change` to the settings and republishes the last cycle's
    /// rows under them. Diagnostics were already delivered with the cycle.
    fn update_settings(&self, change: impl FnOnce(&mut ViewSettings)) -> Arc<Snapshot> {
        let mut state = lock(&self.view);
        change(&mut state.settings);
        let view = table::reconcile_with(&state.rows, &state.settings);
        state.settings.selection = view.selection;

        let previous = &state.snapshot;
        let snapshot = Arc::new(Snapshot {
            cycle: previous.cycle,
            taken_at: previous.taken_at,
            system: previous.system,
            history: previous.history.clone(),
            view,
            settings: state.settings.clone(),
            status: SourceStatus {
                stale: previous.status.stale.clone(),
                diagnostics: Vec::new(),
            },
        });
        state.snapshot = snapshot.clone();
        self.publish(&snapshot);
        snapshot
    }

    fn publish(&self, snapshot: &Arc<Snapshot>) {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        let dropped = before - subscribers.len();
        if dropped > 0 {
            debug!(dropped, "removed disconnected subscribers");
        }
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        lock(&self.view).snapshot.clone()
    }
}

/// Periodic resource monitor.
pub struct Monitor<S: CounterSource + 'static> {
    shared: Arc<Shared<S>>,
    scheduler: Scheduler,
    terminator: Box<dyn Terminator>,
    cpu_info: CpuInfo,
}

impl Monitor<ProcfsSource<RealFs>> {
    /// Monitor over the real `/proc` (or `config.proc_path`).
    pub fn procfs(config: &MonitorConfig) -> Result<Self, ConfigError> {
        let source = ProcfsSource::new(RealFs::new(), config.proc_path.clone())
            .with_disk_prefixes(config.disk_prefixes.clone());
        Self::new(source, config)
    }
}

impl<S: CounterSource + 'static> Monitor<S> {
    pub fn new(source: S, config: &MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = Engine::new(source, config.history_len);
        let cpu_info = engine.cpu_info();
        let settings = ViewSettings::default();
        let snapshot = Arc::new(Snapshot::empty(config.history_len, settings.clone()));

        Ok(Self {
            shared: Arc::new(Shared {
                engine: Mutex::new(engine),
                view: Mutex::new(ViewState {
                    settings,
                    rows: Vec::new(),
                    snapshot,
                }),
                subscribers: Mutex::new(Vec::new()),
            }),
            scheduler: Scheduler::new(config.interval),
            terminator: Box::new(SignalTerminator),
            cpu_info,
        })
    }

    /// Replaces the collaborator that delivers termination requests.
    pub fn with_terminator(mut self, terminator: Box<dyn Terminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Starts sampling in the background. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        let shared = self.shared.clone();
        let started = self.scheduler.start(move || {
            shared.cycle();
        });
        if started {
            info!(interval_ms = self.scheduler.interval().as_millis() as u64, "monitor started");
        }
        started
    }

    /// Stops background sampling; a cycle in progress completes first.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Runs one cycle on the calling thread and returns its snapshot.
    pub fn tick(&self) -> Arc<Snapshot> {
        self.scheduler.run_once(|| self.shared.cycle())
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Last published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.snapshot()
    }

    pub fn current_view(&self) -> ProcessView {
        self.snapshot().view.clone()
    }

    /// The last N values of one system metric, oldest first.
    pub fn history_for(&self, kind: MetricKind) -> Vec<f64> {
        self.snapshot().history.series(kind).to_vec()
    }

    pub fn settings(&self) -> ViewSettings {
        self.snapshot().settings.clone()
    }

    pub fn cpu_info(&self) -> &CpuInfo {
        &self.cpu_info
    }

    /// Receives every snapshot published from now on.
    pub fn subscribe(&self) -> Receiver<Arc<Snapshot>> {
        let (tx, rx) = mpsc::channel();
        lock(&self.shared.subscribers).push(tx);
        rx
    }

    pub fn set_sort_key(&self, key: ProcessSortKey) -> Arc<Snapshot> {
        self.shared.update_settings(|settings| settings.sort_key = key)
    }

    pub fn set_filter_text(&self, filter: impl Into<String>) -> Arc<Snapshot> {
        let filter = filter.into();
        self.shared.update_settings(|settings| settings.filter = filter)
    }

    /// Selects `pid`, or clears the selection with `None`.
    ///
    /// A pid that is not in the current view leaves nothing selected.
    pub fn set_selection(&self, pid: Option<u32>) -> Arc<Snapshot> {
        self.shared.update_settings(|settings| settings.selection = pid)
    }

    /// Sends a termination request to the selected process.
    pub fn terminate_selected(&self) -> Result<u32, TerminateError> {
        let snapshot = self.snapshot();
        self.terminate(&snapshot.view, snapshot.view.selection)
    }

    /// Sends a termination request to `pid`, which must be listed in the
    /// current view.
    pub fn request_termination(&self, pid: u32) -> Result<u32, TerminateError> {
        let snapshot = self.snapshot();
        self.terminate(&snapshot.view, Some(pid))
    }

    fn terminate(&self, view: &ProcessView, target: Option<u32>) -> Result<u32, TerminateError> {
        match terminate::request_termination(view, target, self.terminator.as_ref()) {
            Ok(pid) => {
                info!(pid, "termination requested");
                Ok(pid)
            }
            Err(e) => {
                warn!(error = %e, "termination request failed");
                Err(e)
            }
        }
    }
}

impl<S: CounterSource + 'static> Drop for Monitor<S> {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}
