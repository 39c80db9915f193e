//! Core data types shared between the scanner, the queue and the engine.
//!
//! Rule of thumb:
//! - These structs are boring bags of data
//! - No audio code, no filesystem walking, no tag parsing
//!
//! `TrackRecord` is ONE audio file on disk plus the metadata we show for it.
//! `SavedTrack` is the flat shape the queue writes into the settings file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_YEAR: &str = "Unknown";
pub const UNKNOWN_FORMAT: &str = "unknown";

/// One playable file.
///
/// Every text field has a fallback, so a record is always renderable even when
/// tag extraction failed. `duration == 0.0` means "unknown".
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    /// Full file path on disk. The only thing we always have.
    pub path: PathBuf,

    pub title: String,
    pub artist: String,
    pub album: String,

    /// Release year as tagged ("1998", "1998-04-02", ...), or "Unknown".
    pub year: String,

    /// Track number (1, 2, 3...). Never 0.
    pub track_number: Option<u32>,

    /// Seconds. 0.0 when the container didn't tell us.
    pub duration: f64,

    pub file_size: u64,

    /// Lowercase extension without the dot ("mp3", "flac").
    pub format: String,

    /// First embedded picture, shared between queue/history clones.
    pub cover_art: Option<Arc<[u8]>>,
}

impl TrackRecord {
    /// A record with every metadata field at its fallback.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = format_of(&path);

        Self {
            path,
            title: UNKNOWN_TITLE.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            year: UNKNOWN_YEAR.to_string(),
            track_number: None,
            duration: 0.0,
            file_size: 0,
            format,
            cover_art: None,
        }
    }

    /// "Artist - Title" for status lines and logs.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    pub fn has_known_duration(&self) -> bool {
        self.duration > 0.0
    }
}

/// Lowercase extension, or "unknown".
pub fn format_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| UNKNOWN_FORMAT.to_string())
}

/// Persisted queue entry. Everything in `TrackRecord` except cover art.
///
/// Missing fields deserialize to the same fallbacks `TrackRecord::new` uses, so a
/// hand-edited or older settings file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTrack {
    pub file_path: PathBuf,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_artist")]
    pub artist: String,
    #[serde(default = "default_album")]
    pub album: String,
    #[serde(default = "default_year")]
    pub year: String,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_title() -> String {
    UNKNOWN_TITLE.to_string()
}

fn default_artist() -> String {
    UNKNOWN_ARTIST.to_string()
}

fn default_album() -> String {
    UNKNOWN_ALBUM.to_string()
}

fn default_year() -> String {
    UNKNOWN_YEAR.to_string()
}

fn default_format() -> String {
    UNKNOWN_FORMAT.to_string()
}

impl From<&TrackRecord> for SavedTrack {
    fn from(track: &TrackRecord) -> Self {
        Self {
            file_path: track.path.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            year: track.year.clone(),
            track_number: track.track_number,
            duration: track.duration,
            file_size: track.file_size,
            format: track.format.clone(),
        }
    }
}

impl SavedTrack {
    /// Rebuild a record. Cover art is NOT restored here; callers re-read it from the file.
    pub fn into_record(self) -> TrackRecord {
        TrackRecord {
            path: self.file_path,
            title: self.title,
            artist: self.artist,
            album: self.album,
            year: self.year,
            track_number: self.track_number.filter(|n| *n > 0),
            duration: self.duration.max(0.0),
            file_size: self.file_size,
            format: self.format,
            cover_art: None,
        }
    }
}
