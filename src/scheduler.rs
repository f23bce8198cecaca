//! Fixed-period driver for sampling cycles.
//!
//! Cycles run one at a time, either on a background thread started with
//! [`Scheduler::start`] or cooperatively through [`Scheduler::run_once`].
//! A cycle is never interrupted; stopping only prevents the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Granularity of the wait between cycles; bounds how long `stop` blocks.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next cycle (or never started).
    Idle,
    /// A cycle is running.
    Sampling,
    /// `stop` was called; no further cycles until `start`.
    Stopped,
}

/// Runs a cycle function at a fixed period.
pub struct Scheduler {
    interval: Duration,
    state: Arc<Mutex<SchedulerState>>,
    /// Held for the duration of a cycle so cycles never overlap.
    cycle_lock: Arc<Mutex<()>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Runs `cycle` with the state set to `Sampling`, restoring `Idle` after.
fn run_guarded<R>(
    state: &Mutex<SchedulerState>,
    cycle_lock: &Mutex<()>,
    cycle: impl FnOnce() -> R,
) -> R {
    let _cycle = lock(cycle_lock);
    *lock(state) = SchedulerState::Sampling;
    let result = cycle();
    let mut state = lock(state);
    if *state == SchedulerState::Sampling {
        *state = SchedulerState::Idle;
    }
    result
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(SchedulerState::Idle)),
            cycle_lock: Arc::new(Mutex::new(())),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs a single cycle on the calling thread.
    ///
    /// Waits for an in-flight background cycle to finish first.
    pub fn run_once<R>(&self, cycle: impl FnOnce() -> R) -> R {
        run_guarded(&self.state, &self.cycle_lock, cycle)
    }

    /// Starts calling `cycle` every interval on a background thread, the
    /// first call happening immediately.
    ///
    /// Returns `false` if the scheduler is already running.
    pub fn start<F>(&mut self, mut cycle: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        // A thread left over from an earlier run has already seen the flag
        // drop; wait for it so only one loop exists.
        self.join();

        *lock(&self.state) = SchedulerState::Idle;
        let running = self.running.clone();
        let state = self.state.clone();
        let cycle_lock = self.cycle_lock.clone();
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name("taskmon-sampler".to_string())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "sampler started");
                while running.load(Ordering::SeqCst) {
                    let started = Instant::now();
                    run_guarded(&state, &cycle_lock, &mut cycle);

                    let elapsed = started.elapsed();
                    if elapsed > interval {
                        debug!(elapsed_ms = elapsed.as_millis() as u64, "cycle overran interval");
                    }

                    let mut remaining = interval.saturating_sub(elapsed);
                    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
                        let sleep_time = remaining.min(SLEEP_SLICE);
                        thread::sleep(sleep_time);
                        remaining = remaining.saturating_sub(sleep_time);
                    }
                }
                info!("sampler stopped");
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                true
            }
            Err(e) => {
                error!(error = %e, "failed to spawn sampler thread");
                self.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Stops the background loop and waits for it to exit.
    ///
    /// A cycle in progress runs to completion.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.join();
        *lock(&self.state) = SchedulerState::Stopped;
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("sampler thread panicked");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.join();
    }
}
