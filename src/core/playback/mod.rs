//! core/playback/mod.rs
//! Peachy playback core module.
//!
//! - `engine`: the control-thread state machine (`AudioEngine`)
//! - `session`: one worker thread per playing track
//! - `output`: where samples go (rodio device, or nowhere)
//! - `decoder`: Symphonia probing + a rodio Source that can start mid-file
//! - `clock`: wall-clock position bookkeeping with pauses subtracted

mod clock;
pub(crate) mod decoder;
mod engine;
mod output;
mod session;

use std::time::Duration;

pub use clock::PlaybackClock;
pub use decoder::probe_duration;
pub use engine::AudioEngine;
pub use output::{AudioOutput, NullOutput, OutputSession, RodioOutput};

use crate::core::history::DEFAULT_HISTORY_CAPACITY;
use crate::core::types::TrackRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    /// Transient: only observable while `stop()` is waiting on the worker.
    Stopping,
}

/// What the engine tells the outside world. Positions/durations are seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started(TrackRecord),
    Paused,
    Resumed,
    /// Caller-initiated stop, or the session ended without reaching its end.
    Stopped,
    /// Natural end of track.
    Finished,
    PositionChanged(f64),
    DurationChanged(f64),
    Error(String),
}

/// Timing knobs for the engine. Defaults are what the player ships with.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often `tick()` reports position while playing.
    pub tick_interval: Duration,
    /// How often the worker checks its flags.
    pub poll_interval: Duration,
    /// Longest `stop()` will wait for a worker to exit.
    pub join_timeout: Duration,
    /// Longest `play()` will wait for the worker to open the device.
    pub startup_timeout: Duration,
    /// A session that ends within this many seconds of the duration counts as finished.
    pub end_tolerance: f64,
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            poll_interval: Duration::from_millis(50),
            join_timeout: Duration::from_secs(1),
            startup_timeout: Duration::from_secs(2),
            end_tolerance: 0.5,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}
