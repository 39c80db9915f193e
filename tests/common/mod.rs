//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use hound::{WavSpec, WavWriter};
use peachy::core::playback::{EngineConfig, PlaybackEvent};
use peachy::core::types::TrackRecord;

pub const SAMPLE_RATE: u32 = 8_000;

/// Write a mono 16-bit 440 Hz tone of `duration_secs` to `dir/name`.
pub fn write_tone(dir: &Path, name: &str, duration_secs: f32) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(&path, spec).expect("create wav");
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    for i in 0..num_samples {
        let t = i as f32 / SAMPLE_RATE as f32;
        let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin();
        writer
            .write_sample((i16::MAX as f32 * 0.3 * sample) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path
}

pub fn tone_track(dir: &Path, name: &str, duration_secs: f32) -> TrackRecord {
    let path = write_tone(dir, name, duration_secs);
    let mut track = TrackRecord::new(path);
    track.title = name.trim_end_matches(".wav").to_string();
    track.duration = duration_secs as f64;
    track
}

/// Fast timings so tests don't sit around.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        tick_interval: Duration::from_millis(20),
        poll_interval: Duration::from_millis(5),
        join_timeout: Duration::from_secs(1),
        startup_timeout: Duration::from_secs(2),
        ..EngineConfig::default()
    }
}

pub fn drain(rx: &Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    rx.try_iter().collect()
}

/// Call `tick` until `done` says so or `timeout` passes. Returns everything emitted.
pub fn tick_until(
    mut tick: impl FnMut(),
    rx: &Receiver<PlaybackEvent>,
    timeout: Duration,
    done: impl Fn(&PlaybackEvent) -> bool,
) -> Vec<PlaybackEvent> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();

    while Instant::now() < deadline {
        tick();
        let batch = drain(rx);
        let hit = batch.iter().any(&done);
        seen.extend(batch);
        if hit {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    seen
}

pub fn count(events: &[PlaybackEvent], wanted: &PlaybackEvent) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}
