//! core/playback/session.rs
//! One worker thread per playing track.
//!
//! Control thread -> worker: three flags (`stop_requested`, `paused`) and the
//! shared clock. Worker -> control thread: exactly one `WorkerReport` when it exits,
//! plus `running == false`. Nothing else crosses.
//!
//! The worker owns the output device from open to drop. There is no hard kill:
//! it polls `stop_requested` every `poll_interval` and leaves on its own.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use super::clock::PlaybackClock;
use super::output::AudioOutput;
use crate::core::error::{PlaybackError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionOutcome {
    /// Reached the end of the track.
    Finished,
    /// Asked to stop, or ran out before the end.
    Stopped,
    Error(String),
}

#[derive(Debug)]
pub(crate) struct WorkerReport {
    pub session_id: u64,
    pub outcome: SessionOutcome,
}

pub(crate) struct SessionParams {
    pub id: u64,
    pub path: PathBuf,
    /// Where the clock starts (what the caller asked for).
    pub start: f64,
    /// Where decoding starts (may sit slightly before `start` near the end).
    pub decode_start: f64,
    pub duration: f64,
    pub start_paused: bool,
    pub poll_interval: Duration,
    pub startup_timeout: Duration,
    pub end_tolerance: f64,
}

struct SessionShared {
    stop_requested: AtomicBool,
    paused: AtomicBool,
    running: AtomicBool,
    clock: Mutex<PlaybackClock>,
}

impl SessionShared {
    fn clock(&self) -> MutexGuard<'_, PlaybackClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct Session {
    id: u64,
    shared: Arc<SessionShared>,
    handle: Option<JoinHandle<()>>,
    // Disconnects when the worker is completely done.
    done_rx: Receiver<()>,
}

impl Session {
    /// Spawn the worker and wait (bounded) for it to open the output.
    ///
    /// Open failures (missing file, undecodable, no device) come back here as
    /// errors, so `play()` can report them synchronously.
    pub fn spawn(
        params: SessionParams,
        output: Arc<dyn AudioOutput>,
        reports: Sender<WorkerReport>,
    ) -> Result<Self> {
        let now = Instant::now();
        let mut clock = PlaybackClock::new(params.start, params.duration, now);
        if params.start_paused {
            clock.pause(now);
        }

        let shared = Arc::new(SessionShared {
            stop_requested: AtomicBool::new(false),
            paused: AtomicBool::new(params.start_paused),
            running: AtomicBool::new(true),
            clock: Mutex::new(clock),
        });

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let id = params.id;
        let startup_timeout = params.startup_timeout;
        let worker_shared = shared.clone();

        let handle = thread::Builder::new()
            .name(format!("peachy-session-{id}"))
            .spawn(move || {
                // Declared first => dropped last, after the device and the report.
                let _done = done_tx;
                run_worker(params, output, worker_shared, reports, ready_tx);
            })?;

        let mut session = Self {
            id,
            shared,
            handle: Some(handle),
            done_rx,
        };

        match ready_rx.recv_timeout(startup_timeout) {
            Ok(Ok(())) => Ok(session),
            Ok(Err(e)) => {
                // Worker is already on its way out.
                session.stop(startup_timeout);
                Err(e)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Session {id}: output did not open within {startup_timeout:?}");
                session.request_stop();
                Err(PlaybackError::Device(
                    "Timed out opening audio output".to_string(),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                session.stop(startup_timeout);
                Err(PlaybackError::WorkerUnavailable)
            }
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn position(&self) -> f64 {
        self.shared.clock().position(Instant::now())
    }

    /// False if already paused.
    pub fn pause(&self) -> bool {
        let changed = self.shared.clock().pause(Instant::now());
        if changed {
            self.shared.paused.store(true, Ordering::Release);
        }
        changed
    }

    /// False if not paused.
    pub fn resume(&self) -> bool {
        let changed = self.shared.clock().resume(Instant::now());
        if changed {
            self.shared.paused.store(false, Ordering::Release);
        }
        changed
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn request_stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
    }

    /// Ask the worker to leave and wait up to `timeout` for it.
    ///
    /// Returns false if it didn't make it in time; the thread is then detached.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.request_stop();

        let Some(handle) = self.handle.take() else {
            return true;
        };

        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    error!("Session {}: worker panicked", self.id);
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Session {}: worker still running after {timeout:?}; detaching",
                    self.id
                );
                false
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Never block here; whoever cared already called stop().
        self.request_stop();
    }
}

/// Sends the exit report no matter how the worker leaves (including a panic).
struct ExitGuard {
    session_id: u64,
    shared: Arc<SessionShared>,
    reports: Sender<WorkerReport>,
    outcome: Option<SessionOutcome>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);

        let outcome = if thread::panicking() {
            SessionOutcome::Error("Playback worker panicked".to_string())
        } else {
            self.outcome.take().unwrap_or_else(|| {
                SessionOutcome::Error("Playback worker exited unexpectedly".to_string())
            })
        };

        debug!("Session {} exiting: {outcome:?}", self.session_id);
        let _ = self.reports.send(WorkerReport {
            session_id: self.session_id,
            outcome,
        });
    }
}

fn run_worker(
    params: SessionParams,
    output: Arc<dyn AudioOutput>,
    shared: Arc<SessionShared>,
    reports: Sender<WorkerReport>,
    ready_tx: mpsc::SyncSender<Result<()>>,
) {
    let mut guard = ExitGuard {
        session_id: params.id,
        shared: shared.clone(),
        reports,
        outcome: None,
    };

    // Dropped before `guard`: the device is released before anyone hears we're done.
    let out = match output.open(&params.path, params.decode_start) {
        Ok(out) => out,
        Err(e) => {
            guard.outcome = Some(SessionOutcome::Error(e.to_string()));
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Count from when sound actually starts, not from spawn.
    shared.clock().restart(Instant::now());
    let _ = ready_tx.send(Ok(()));

    let mut applied_pause = false;

    let outcome = loop {
        if shared.stop_requested.load(Ordering::Acquire) {
            break SessionOutcome::Stopped;
        }

        let paused = shared.paused.load(Ordering::Acquire);
        if paused != applied_pause {
            if paused {
                out.pause();
            } else {
                out.resume();
            }
            applied_pause = paused;
        }

        if let Some(e) = out.take_error() {
            break SessionOutcome::Error(e);
        }

        let now = Instant::now();
        let (at_end, position) = {
            let clock = shared.clock();
            (clock.at_end(now), clock.position(now))
        };

        if at_end {
            break SessionOutcome::Finished;
        }

        if !paused && out.is_drained() {
            // Source ran dry before the clock did.
            let near_end =
                params.duration > 0.0 && position >= params.duration - params.end_tolerance;
            break if near_end {
                SessionOutcome::Finished
            } else {
                SessionOutcome::Stopped
            };
        }

        thread::sleep(params.poll_interval);
    };

    drop(out);
    guard.outcome = Some(outcome);
}
