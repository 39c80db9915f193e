//! core/playback/engine.rs
//! Playback engine (session owner).
//!
//! Owns:
//! - at most one `Session` (worker thread + output device) at a time
//! - the Idle/Playing/Paused state machine
//! - playback history
//!
//! Lives on the control thread. Two waits exist, both bounded:
//! - joining the old worker, up to `join_timeout` (`stop`, and `play`/`seek` which stop first)
//! - the startup handshake while a new worker opens its output, up to `startup_timeout`
//!   (`play`, `seek`)
//!
//! Everything else returns promptly.
//!
//! Workers report back through a channel that `tick()` drains, so events are always
//! emitted from the control thread.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use tracing::{debug, error, info};

use super::decoder::probe_duration;
use super::output::AudioOutput;
use super::session::{Session, SessionOutcome, SessionParams, WorkerReport};
use super::{EngineConfig, PlaybackEvent, PlaybackState};
use crate::core::error::{PlaybackError, Result};
use crate::core::history::PlaybackHistory;
use crate::core::types::TrackRecord;

/// Seeking exactly onto the last sample tends to produce EOF weirdness; decode
/// from this far before the end instead.
const SEEK_END_GUARD: f64 = 0.05;

pub struct AudioEngine {
    config: EngineConfig,
    output: Arc<dyn AudioOutput>,

    // Event channel
    event_tx: Sender<PlaybackEvent>,

    // Worker -> control thread
    report_tx: Sender<WorkerReport>,
    report_rx: Receiver<WorkerReport>,

    session: Option<Session>,
    next_session_id: u64,
    state: PlaybackState,

    current: Option<TrackRecord>,
    duration: f64,
    history: PlaybackHistory,
    last_tick: Instant,
}

impl AudioEngine {
    pub fn new(output: Arc<dyn AudioOutput>, event_tx: Sender<PlaybackEvent>) -> Self {
        Self::with_config(output, event_tx, EngineConfig::default())
    }

    pub fn with_config(
        output: Arc<dyn AudioOutput>,
        event_tx: Sender<PlaybackEvent>,
        config: EngineConfig,
    ) -> Self {
        let (report_tx, report_rx) = mpsc::channel();
        let history = PlaybackHistory::new(config.history_capacity);

        Self {
            config,
            output,
            event_tx,
            report_tx,
            report_rx,
            session: None,
            next_session_id: 0,
            state: PlaybackState::Idle,
            current: None,
            duration: 0.0,
            history,
            last_tick: Instant::now(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    /// Seconds into the current track; 0.0 with nothing playing.
    pub fn position(&self) -> f64 {
        self.session.as_ref().map_or(0.0, Session::position)
    }

    /// Seconds; 0.0 when unknown.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// The last track that started successfully (kept after stop, for display).
    pub fn current_track(&self) -> Option<&TrackRecord> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &PlaybackHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Pops the playing track off history and returns the one before it.
    pub fn get_previous_track(&mut self) -> Option<TrackRecord> {
        self.history.previous()
    }

    /// Stop whatever is playing, then play `track` from `start_position` seconds.
    ///
    /// False (plus an `Error` event) if the file can't be opened/decoded or the
    /// device can't be acquired; the engine is then Idle.
    pub fn play(&mut self, track: &TrackRecord, start_position: f64) -> bool {
        self.start(track, start_position, true)
    }

    /// Step back through history and play that track.
    ///
    /// The track is already history's newest entry, so it isn't appended again;
    /// repeated calls keep walking back.
    pub fn play_previous(&mut self) -> bool {
        match self.history.previous() {
            Some(track) => self.start(&track, 0.0, false),
            None => false,
        }
    }

    /// False if not currently playing (already paused, or idle).
    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let Some(session) = &self.session else {
            return false;
        };
        if !session.pause() {
            return false;
        }

        self.state = PlaybackState::Paused;
        self.emit(PlaybackEvent::Paused);
        true
    }

    /// False if not paused.
    pub fn resume(&mut self) -> bool {
        if self.state != PlaybackState::Paused {
            return false;
        }
        let Some(session) = &self.session else {
            return false;
        };
        if !session.resume() {
            return false;
        }

        self.state = PlaybackState::Playing;
        self.last_tick = Instant::now();
        self.emit(PlaybackEvent::Resumed);
        true
    }

    pub fn toggle_play_pause(&mut self) -> bool {
        match self.state {
            PlaybackState::Paused => self.resume(),
            PlaybackState::Playing => self.pause(),
            _ => false,
        }
    }

    /// Always safe. Emits `Stopped` and returns true only if a session was running.
    pub fn stop(&mut self) -> bool {
        if !self.stop_session() {
            return false;
        }
        self.emit(PlaybackEvent::Stopped);
        true
    }

    /// Jump to `position` seconds by restarting the session there.
    ///
    /// Needs a live session and `0 <= position <= duration`. A paused engine stays
    /// paused. The restart is silent (no Stopped/Started), only `PositionChanged`.
    /// Known limitation: the restart can cause a short audible blip.
    pub fn seek(&mut self, position: f64) -> bool {
        match self.try_seek(position) {
            Ok(()) => true,
            Err(PlaybackError::NoTrackLoaded | PlaybackError::InvalidSeekPosition(_)) => false,
            Err(e) => {
                error!("Seek restart failed: {e}");
                self.state = PlaybackState::Idle;
                self.emit(PlaybackEvent::Error(e.to_string()));
                self.emit(PlaybackEvent::Stopped);
                false
            }
        }
    }

    /// Drain worker reports and emit a position update if one is due.
    ///
    /// Call this from the control thread's loop, at least as often as the tick interval.
    pub fn tick(&mut self) {
        while let Ok(report) = self.report_rx.try_recv() {
            self.handle_report(report);
        }

        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(session) = &self.session else {
            return;
        };
        // Worker is gone and its report is on the way; don't report a stale clock.
        if !session.is_running() {
            return;
        }

        let now = Instant::now();
        if now.duration_since(self.last_tick) >= self.config.tick_interval {
            self.last_tick = now;
            let position = session.position();
            self.emit(PlaybackEvent::PositionChanged(position));
        }
    }

    fn start(&mut self, track: &TrackRecord, start_position: f64, record: bool) -> bool {
        self.stop();

        match self.open(track, start_position) {
            Ok(()) => {
                info!("Playing {}", track.path.display());
                self.current = Some(track.clone());
                if record {
                    self.history.push(track.clone());
                }
                self.state = PlaybackState::Playing;
                self.last_tick = Instant::now();
                self.emit(PlaybackEvent::DurationChanged(self.duration));
                self.emit(PlaybackEvent::Started(track.clone()));
                true
            }
            Err(e) => {
                error!("Failed to play {}: {e}", track.path.display());
                self.current = None;
                self.duration = 0.0;
                self.state = PlaybackState::Idle;
                self.emit(PlaybackEvent::Error(format!("Failed to play track: {e}")));
                false
            }
        }
    }

    fn open(&mut self, track: &TrackRecord, start_position: f64) -> Result<()> {
        if !track.path.exists() {
            return Err(PlaybackError::FileNotFound(track.path.clone()));
        }

        // Discovered once per play(); unknown duration disables natural-end detection.
        self.duration = match probe_duration(&track.path) {
            Ok(Some(d)) => d,
            Ok(None) => {
                debug!("Duration unknown for {}", track.path.display());
                0.0
            }
            Err(e) => {
                debug!("Could not probe duration of {}: {e}", track.path.display());
                0.0
            }
        };

        let start = if self.duration > 0.0 {
            start_position.clamp(0.0, self.duration)
        } else {
            start_position.max(0.0)
        };

        let session = self.spawn_session(&track.path, start, false)?;
        self.session = Some(session);
        Ok(())
    }

    fn try_seek(&mut self, position: f64) -> Result<()> {
        let paused = match self.state {
            PlaybackState::Playing => false,
            PlaybackState::Paused => true,
            _ => return Err(PlaybackError::NoTrackLoaded),
        };
        let Some(path) = self.current.as_ref().map(|t| t.path.clone()) else {
            return Err(PlaybackError::NoTrackLoaded);
        };
        if !(0.0..=self.duration).contains(&position) {
            debug!("Seek to {position:.2}s outside 0..={:.2}s", self.duration);
            return Err(PlaybackError::InvalidSeekPosition(position));
        }

        debug!("Seek restart at {position:.2}s (paused={paused})");
        self.stop_session();

        let session = self.spawn_session(&path, position, paused)?;
        self.session = Some(session);
        self.state = if paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        };
        self.last_tick = Instant::now();
        self.emit(PlaybackEvent::PositionChanged(position));
        Ok(())
    }

    fn spawn_session(&mut self, path: &Path, start: f64, start_paused: bool) -> Result<Session> {
        let id = self.next_session_id;
        self.next_session_id += 1;

        let decode_start = if self.duration > 0.0 && start >= self.duration - SEEK_END_GUARD {
            (self.duration - SEEK_END_GUARD).max(0.0)
        } else {
            start
        };

        let params = SessionParams {
            id,
            path: path.to_path_buf(),
            start,
            decode_start,
            duration: self.duration,
            start_paused,
            poll_interval: self.config.poll_interval,
            startup_timeout: self.config.startup_timeout,
            end_tolerance: self.config.end_tolerance,
        };

        Session::spawn(params, self.output.clone(), self.report_tx.clone())
    }

    /// Tear down the session without emitting anything. True if there was one.
    fn stop_session(&mut self) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };

        self.state = PlaybackState::Stopping;
        session.stop(self.config.join_timeout);
        self.state = PlaybackState::Idle;
        true
    }

    fn handle_report(&mut self, report: WorkerReport) {
        let is_current = self
            .session
            .as_ref()
            .is_some_and(|s| s.id() == report.session_id);

        if !is_current {
            // A session we already stopped; its exit is old news.
            debug!("Ignoring report from session {}", report.session_id);
            return;
        }

        // The worker has exited; this join is immediate.
        self.stop_session();

        match report.outcome {
            SessionOutcome::Finished => {
                info!("Track finished");
                self.emit(PlaybackEvent::PositionChanged(self.duration));
                self.emit(PlaybackEvent::Finished);
            }
            SessionOutcome::Stopped => {
                info!("Playback ended before the end of the track");
                self.emit(PlaybackEvent::Stopped);
            }
            SessionOutcome::Error(message) => {
                error!("Playback error: {message}");
                self.emit(PlaybackEvent::Error(message));
                self.emit(PlaybackEvent::Stopped);
            }
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop_session();
    }
}
