//! core/playback/decoder.rs
//! Audio decoding utilities (Symphonia) -> rodio::Source.
//!
//! Also the one place that knows how to probe a file, so tag reading and duration
//! discovery share it.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rodio::Source;
use tracing::warn;

use symphonia::core::audio::{AudioBufferRef, SampleBuffer, Signal, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, ProbeResult};
use symphonia::core::units::{Time, TimeBase};

use crate::core::error::{PlaybackError, Result};

/// Where the streaming source parks a mid-playback decode failure for the worker to pick up.
pub(crate) type DecodeErrorSlot = Arc<Mutex<Option<String>>>;

/// Open + probe `path`, using its extension as a hint.
pub(crate) fn probe(path: &Path) -> Result<ProbeResult> {
    if !path.exists() {
        return Err(PlaybackError::FileNotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::Decode(format!("Format probe failed: {e}")))
}

/// Seconds, from the default track's codec parameters. `None` if the container
/// doesn't say.
pub fn probe_duration(path: &Path) -> Result<Option<f64>> {
    let probed = probe(path)?;
    let track = probed
        .format
        .default_track()
        .ok_or_else(|| PlaybackError::Decode("No supported audio track found.".into()))?;

    Ok(duration_from_params(
        track.codec_params.time_base,
        track.codec_params.n_frames,
    ))
}

/// Construct a new seekable rodio Source from `path`, starting at `start` seconds.
pub(crate) fn open_source_at(
    path: &Path,
    start: f64,
    errors: DecodeErrorSlot,
) -> Result<SymphoniaSource> {
    let probed = probe(path)?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| PlaybackError::Decode("No supported audio track found.".into()))?;

    let track_id = track.id;

    // Clone codec params so we can seek (mutable borrow of format) without borrow conflicts.
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::Decode(format!("Decoder init failed: {e}")))?;

    if start > 0.0 {
        let time = Time::from(Duration::from_secs_f64(start));
        let seek_to = SeekTo::Time {
            time,
            track_id: Some(track_id),
        };

        format
            .seek(SeekMode::Accurate, seek_to)
            .map_err(|e| PlaybackError::Decode(format!("Seek failed: {e}")))?;

        // After seek, safest is to reset decoder state by recreating it.
        decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| PlaybackError::Decode(format!("Decoder re-init failed after seek: {e}")))?;
    }

    Ok(SymphoniaSource::new(
        path.to_path_buf(),
        format,
        decoder,
        track_id,
        errors,
    ))
}

pub(crate) fn duration_from_params(time_base: Option<TimeBase>, n_frames: Option<u64>) -> Option<f64> {
    let tb = time_base?;
    let frames = n_frames?;

    // Time is { seconds: u64, frac: f64 } in symphonia 0.5.x.
    let t = tb.calc_time(frames);
    Some(t.seconds as f64 + t.frac)
}

/// A streaming rodio Source backed by Symphonia.
pub(crate) struct SymphoniaSource {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,

    // Output format for rodio
    sample_rate: u32,
    channels: u16,

    // Interleaved f32 samples ready to be yielded
    out: Vec<f32>,
    out_pos: usize,

    ended: bool,
    errors: DecodeErrorSlot,
}

impl SymphoniaSource {
    fn new(
        path: PathBuf,
        format: Box<dyn FormatReader>,
        decoder: Box<dyn Decoder>,
        track_id: u32,
        errors: DecodeErrorSlot,
    ) -> Self {
        let mut this = Self {
            path,
            format,
            decoder,
            track_id,
            sample_rate: 44100,
            channels: 2,
            out: Vec::new(),
            out_pos: 0,
            ended: false,
            errors,
        };

        // Prime once so sample_rate/channels become correct ASAP.
        if let Err(e) = this.fill_out_buffer() {
            this.fail(e);
        }

        this
    }

    fn fail(&mut self, message: String) {
        warn!("Decode error in {}: {message}", self.path.display());
        self.ended = true;
        let mut slot = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert(message);
    }

    fn fill_out_buffer(&mut self) -> std::result::Result<(), String> {
        if self.ended {
            return Ok(());
        }

        self.out.clear();
        self.out_pos = 0;

        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                // End of stream shows up as an IO error.
                Err(SymphoniaError::IoError(_)) => {
                    self.ended = true;
                    return Ok(());
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(format!("Decode read error: {e}")),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::IoError(_)) => {
                    self.ended = true;
                    return Ok(());
                }
                Err(SymphoniaError::DecodeError(_)) => {
                    // Corrupt packet; skip.
                    continue;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(format!("Decode error: {e}")),
            };

            match decoded {
                AudioBufferRef::F32(buf) => {
                    self.sample_rate = buf.spec().rate;
                    self.channels = buf.spec().channels.count() as u16;

                    let frames = buf.frames();
                    let chans = buf.spec().channels.count();

                    self.out.reserve(frames * chans);
                    for f in 0..frames {
                        for c in 0..chans {
                            self.out.push(buf.chan(c)[f]);
                        }
                    }
                    return Ok(());
                }
                other => {
                    let spec = SignalSpec::new(other.spec().rate, other.spec().channels.clone());
                    self.sample_rate = spec.rate;
                    self.channels = spec.channels.count() as u16;

                    let frames = other.frames();
                    let chans = spec.channels.count();

                    let mut sbuf = SampleBuffer::<f32>::new(frames as u64, spec);
                    sbuf.copy_interleaved_ref(other);

                    self.out.reserve(frames * chans);
                    self.out.extend_from_slice(sbuf.samples());
                    return Ok(());
                }
            }
        }
    }
}

impl Iterator for SymphoniaSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.out_pos >= self.out.len() {
            if self.ended {
                return None;
            }
            if let Err(e) = self.fill_out_buffer() {
                self.fail(e);
                return None;
            }
            if self.out.is_empty() && self.ended {
                return None;
            }
        }

        let s = self.out.get(self.out_pos).copied();
        self.out_pos += 1;
        s
    }
}

impl Source for SymphoniaSource {
    // rodio 0.21 uses current_span_len (not current_frame_len).
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
