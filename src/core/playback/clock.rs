//! core/playback/clock.rs
//! Position = start offset + wall time since start - time spent paused.
//!
//! Every method takes `now` so callers (and tests) decide what time it is.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    start_position: f64,
    duration: f64,
    started_at: Instant,
    paused_total: Duration,
    paused_at: Option<Instant>,
}

impl PlaybackClock {
    /// `duration == 0.0` means unknown: position is then never clamped.
    pub fn new(start_position: f64, duration: f64, now: Instant) -> Self {
        Self {
            start_position: start_position.max(0.0),
            duration: duration.max(0.0),
            started_at: now,
            paused_total: Duration::ZERO,
            paused_at: None,
        }
    }

    /// Start counting from `now` again, keeping the start offset and pause state.
    pub fn restart(&mut self, now: Instant) {
        self.started_at = now;
        self.paused_total = Duration::ZERO;
        if self.paused_at.is_some() {
            self.paused_at = Some(now);
        }
    }

    /// False if already paused.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// False if not paused.
    pub fn resume(&mut self, now: Instant) -> bool {
        let Some(paused_at) = self.paused_at.take() else {
            return false;
        };
        self.paused_total += now.saturating_duration_since(paused_at);
        true
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn position(&self, now: Instant) -> f64 {
        // While paused, time stops at the pause instant.
        let until = self.paused_at.unwrap_or(now);
        let elapsed = until
            .saturating_duration_since(self.started_at)
            .saturating_sub(self.paused_total);

        let position = self.start_position + elapsed.as_secs_f64();
        if self.duration > 0.0 {
            position.min(self.duration)
        } else {
            position
        }
    }

    /// Reached the end (only meaningful with a known duration).
    pub fn at_end(&self, now: Instant) -> bool {
        self.duration > 0.0 && self.position(now) >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn counts_from_start_offset() {
        let t0 = Instant::now();
        let clock = PlaybackClock::new(30.0, 120.0, t0);
        assert!((clock.position(t0) - 30.0).abs() < 1e-9);
        assert!((clock.position(t0 + secs(2.5)) - 32.5).abs() < 1e-9);
    }

    #[test]
    fn paused_time_is_excluded() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(0.0, 120.0, t0);

        assert!(clock.pause(t0 + secs(10.0)));
        assert!(!clock.pause(t0 + secs(11.0)));

        // Frozen while paused
        assert!((clock.position(t0 + secs(50.0)) - 10.0).abs() < 1e-9);

        assert!(clock.resume(t0 + secs(60.0)));
        assert!(!clock.resume(t0 + secs(61.0)));
        assert!((clock.position(t0 + secs(65.0)) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn clamped_to_known_duration() {
        let t0 = Instant::now();
        let clock = PlaybackClock::new(0.0, 2.0, t0);
        assert_eq!(clock.position(t0 + secs(9.0)), 2.0);
        assert!(clock.at_end(t0 + secs(9.0)));
        assert!(!clock.at_end(t0 + secs(1.0)));
    }

    #[test]
    fn unknown_duration_never_ends() {
        let t0 = Instant::now();
        let clock = PlaybackClock::new(0.0, 0.0, t0);
        assert!((clock.position(t0 + secs(500.0)) - 500.0).abs() < 1e-9);
        assert!(!clock.at_end(t0 + secs(500.0)));
    }

    #[test]
    fn restart_keeps_offset_and_pause() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(60.0, 120.0, t0);
        clock.pause(t0);
        clock.restart(t0 + secs(3.0));

        assert!(clock.is_paused());
        assert!((clock.position(t0 + secs(10.0)) - 60.0).abs() < 1e-9);

        clock.resume(t0 + secs(10.0));
        assert!((clock.position(t0 + secs(11.0)) - 61.0).abs() < 1e-9);
    }
}
