//! core/playback/output.rs
//! Where decoded samples go.
//!
//! `AudioOutput::open` runs ON the session worker thread: device handles (rodio's
//! `OutputStream` in particular) are created, used and dropped there, never shared.
//! Dropping the returned session releases the device.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::debug;

use super::decoder::{self, DecodeErrorSlot};
use crate::core::error::{PlaybackError, Result};

pub trait AudioOutput: Send + Sync {
    /// Start producing `path` from `start` seconds. Playing when this returns.
    fn open(&self, path: &Path, start: f64) -> Result<Box<dyn OutputSession>>;
}

/// A live output for one track. Only touched by the worker that opened it.
pub trait OutputSession {
    fn pause(&self);
    fn resume(&self);

    /// The source ran dry (end of stream or decode failure).
    fn is_drained(&self) -> bool;

    /// A decode failure that happened mid-stream, if any. Taken once.
    fn take_error(&self) -> Option<String>;
}

fn take_slot(slot: &DecodeErrorSlot) -> Option<String> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// The default system output device, via rodio.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioOutput;

struct RodioSession {
    // Keep this alive for as long as the sink plays!
    _stream: OutputStream,
    sink: Sink,
    errors: DecodeErrorSlot,
}

impl AudioOutput for RodioOutput {
    fn open(&self, path: &Path, start: f64) -> Result<Box<dyn OutputSession>> {
        let errors: DecodeErrorSlot = Arc::new(Mutex::new(None));
        let source = decoder::open_source_at(path, start, errors.clone())?;
        if let Some(e) = take_slot(&errors) {
            return Err(PlaybackError::Decode(e));
        }

        // rodio 0.21.x: build/open the default output stream via OutputStreamBuilder
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::Device(e.to_string()))?;

        // rodio 0.21.x: Sink is created from the stream's mixer
        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        sink.play();

        debug!("Output opened for {} at {start:.2}s", path.display());

        Ok(Box::new(RodioSession {
            _stream: stream,
            sink,
            errors,
        }))
    }
}

impl OutputSession for RodioSession {
    fn pause(&self) {
        self.sink.pause();
    }

    fn resume(&self) {
        self.sink.play();
    }

    fn is_drained(&self) -> bool {
        self.sink.empty()
    }

    fn take_error(&self) -> Option<String> {
        take_slot(&self.errors)
    }
}

impl Drop for RodioSession {
    fn drop(&mut self) {
        self.sink.stop();
    }
}

/// Decodes enough to prove the file is playable, then stays silent.
///
/// Used for headless runs and for exercising the engine without a sound card;
/// end of track is found from the clock alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

struct NullSession;

impl AudioOutput for NullOutput {
    fn open(&self, path: &Path, start: f64) -> Result<Box<dyn OutputSession>> {
        let errors: DecodeErrorSlot = Arc::new(Mutex::new(None));
        let _source = decoder::open_source_at(path, start, errors.clone())?;

        if let Some(e) = take_slot(&errors) {
            return Err(PlaybackError::Decode(e));
        }

        Ok(Box::new(NullSession))
    }
}

impl OutputSession for NullSession {
    fn pause(&self) {}

    fn resume(&self) {}

    fn is_drained(&self) -> bool {
        false
    }

    fn take_error(&self) -> Option<String> {
        None
    }
}
