//! Error types for playback and settings.

use std::path::PathBuf;

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The track's file is gone
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Couldn't open/probe/decode the file
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Output device unavailable or busy
    #[error("Audio device error: {0}")]
    Device(String),

    /// Seek/control issued with nothing loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    #[error("Invalid seek position: {0:.3}s")]
    InvalidSeekPosition(f64),

    /// The session worker died before reporting that it started
    #[error("Playback worker exited before starting")]
    WorkerUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings store errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// In-memory store asked to hit the disk
    #[error("Settings store has no backing file")]
    NoPath,
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
