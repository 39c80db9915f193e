//! core/mod.rs
//!
//! The brain of the player:
//! - Discover candidate audio file paths (filesystem walk)
//! - Read tags into `TrackRecord`s
//! - Own the play queue and the audio engine
//!
//! The scan pipeline stays explicit:
//!   (A) discover paths -> Vec<PathBuf>
//!   (B) read tags -> Vec<TrackRecord>
//!
//! Playback is split the same way: `queue` decides WHAT plays, `playback` makes
//! noise, `player` wires the two together behind one command surface.

pub mod error;
pub mod history;
pub mod library;
pub mod media_keys;
pub mod playback;
pub mod player;
pub mod queue;
pub mod settings;
pub mod tags;
pub mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use types::TrackRecord;

/// Discover candidate audio files under multiple roots.
///
/// - De-dupes across overlapping roots by full path
/// - Sorts paths once (core owns ordering, UI shouldn't)
/// - A root that can't be read is logged and skipped
pub fn scan_paths(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::with_capacity(1024);
    let mut out: Vec<PathBuf> = Vec::new();

    for root in roots {
        let paths = match library::scan_audio_files(root) {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping unreadable folder {}: {e}", root.display());
                continue;
            }
        };

        for path in paths {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }

    out.sort();
    out
}

/// Read tags for a set of already-discovered audio paths.
///
/// - Never fails hard per-file: unreadable tags give a fallback record
/// - Returns (records, tag_failures)
pub fn read_tracks(paths: Vec<PathBuf>) -> (Vec<TrackRecord>, usize) {
    let mut rows: Vec<TrackRecord> = Vec::with_capacity(paths.len());
    let mut tag_failures: usize = 0;

    for path in paths {
        let (row, failed) = tags::read_track(path);
        if failed {
            tag_failures += 1;
        }
        rows.push(row);
    }

    (rows, tag_failures)
}

/// scan_paths(roots) + read_tracks(paths)
pub fn scan_and_read_roots(roots: &[PathBuf]) -> (Vec<TrackRecord>, usize) {
    let paths = scan_paths(roots);
    let (rows, failures) = read_tracks(paths);
    info!(
        "Scanned {} tracks from {} folder(s), {} without readable tags",
        rows.len(),
        roots.len(),
        failures
    );
    (rows, failures)
}

/// Convenience for callers that have a single music folder.
pub fn scan_folder(root: &Path) -> Vec<TrackRecord> {
    scan_and_read_roots(&[root.to_path_buf()]).0
}
