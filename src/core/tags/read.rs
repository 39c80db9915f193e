//! core/tags/read.rs
//! Read tags from an audio file and convert them into a `TrackRecord`.
//!
//! Never fails hard: whatever we can't read stays at the record's fallback.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use id3::frame::Content;
use id3::{Tag, TagLike};
use symphonia::core::meta::{MetadataRevision, StandardTagKey};
use tracing::debug;

use super::super::playback::decoder;
use super::super::types::{TrackRecord, UNKNOWN_TITLE, UNKNOWN_YEAR};
use super::art::read_embedded_art;
use super::util::{clean_text, parse_track_number};

/// Returns (record, tags_failed).
pub fn read_track(path: PathBuf) -> (TrackRecord, bool) {
    let mut track = TrackRecord::new(path);

    // Filename is a better title than "Unknown Title".
    if let Some(stem) = track.path.file_stem().and_then(|s| s.to_str()) {
        track.title = clean_text(stem).unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    }

    track.file_size = fs::metadata(&track.path).map(|m| m.len()).unwrap_or(0);

    let failed = if track.format == "mp3" {
        let failed = !apply_id3(&mut track);
        track.duration = probed_duration(&track);
        failed
    } else {
        !apply_container_tags(&mut track)
    };

    track.cover_art = read_embedded_art(&track.path).map(Arc::from);

    (track, failed)
}

fn probed_duration(track: &TrackRecord) -> f64 {
    match decoder::probe_duration(&track.path) {
        Ok(d) => d.unwrap_or(0.0),
        Err(e) => {
            debug!("No duration for {}: {e}", track.path.display());
            0.0
        }
    }
}

/// MP3 via `id3`. False if there was no readable tag.
fn apply_id3(track: &mut TrackRecord) -> bool {
    let tag = match Tag::read_from_path(&track.path) {
        Ok(t) => t,
        Err(e) => {
            debug!("No ID3 tag in {}: {e}", track.path.display());
            return false;
        }
    };

    if let Some(title) = tag.title().and_then(clean_text) {
        track.title = title;
    }
    if let Some(artist) = tag.artist().and_then(clean_text) {
        track.artist = artist;
    }
    if let Some(album) = tag.album().and_then(clean_text) {
        track.album = album;
    }

    let date = text_frame(&tag, "TDRC").or_else(|| text_frame(&tag, "TYER"));
    if let Some(year) = date.or_else(|| tag.year().map(|y| y.to_string())) {
        track.year = year;
    }

    track.track_number = tag
        .track()
        .filter(|n| *n > 0)
        .or_else(|| parse_track_number(text_frame(&tag, "TRCK").as_deref()));

    true
}

/// Everything else via Symphonia: tags found while probing (e.g. a leading ID3v2)
/// plus the container's own metadata. Also fills duration from the same probe.
fn apply_container_tags(track: &mut TrackRecord) -> bool {
    let mut probed = match decoder::probe(&track.path) {
        Ok(p) => p,
        Err(e) => {
            debug!("Probe failed for {}: {e}", track.path.display());
            return false;
        }
    };

    if let Some(t) = probed.format.default_track() {
        let params = &t.codec_params;
        track.duration = decoder::duration_from_params(params.time_base, params.n_frames)
            .unwrap_or(0.0);
    }

    let mut found = false;

    if let Some(meta) = probed.metadata.get() {
        if let Some(rev) = meta.current() {
            found |= apply_revision(track, rev);
        }
    }

    let meta = probed.format.metadata();
    if let Some(rev) = meta.current() {
        found |= apply_revision(track, rev);
    }

    found
}

fn apply_revision(track: &mut TrackRecord, rev: &MetadataRevision) -> bool {
    let mut found = false;

    for tag in rev.tags() {
        let Some(key) = tag.std_key else { continue };
        let Some(value) = clean_text(&tag.value.to_string()) else {
            continue;
        };

        match key {
            StandardTagKey::TrackTitle => track.title = value,
            StandardTagKey::Artist => track.artist = value,
            StandardTagKey::Album => track.album = value,
            StandardTagKey::Date | StandardTagKey::OriginalDate => {
                // First date wins; recording date is usually listed before original.
                if track.year == UNKNOWN_YEAR {
                    track.year = value;
                }
            }
            StandardTagKey::TrackNumber => {
                if let Some(n) = parse_track_number(Some(&value)) {
                    track.track_number = Some(n);
                }
            }
            _ => continue,
        }

        found = true;
    }

    found
}

/// Get a best-effort string value from a frame id.
fn text_frame(tag: &Tag, id: &str) -> Option<String> {
    let frame = tag.get(id)?;
    match frame.content() {
        Content::Text(s) => clean_text(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UNKNOWN_ARTIST, UNKNOWN_FORMAT};

    #[test]
    fn unreadable_file_falls_back_to_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("07 Broken Song.mp3");
        fs::write(&path, b"definitely not an mp3").unwrap();

        let (track, failed) = read_track(path);
        assert!(failed);
        assert_eq!(track.title, "07 Broken Song");
        assert_eq!(track.artist, UNKNOWN_ARTIST);
        assert_eq!(track.year, UNKNOWN_YEAR);
        assert_eq!(track.file_size, 21);
        assert_eq!(track.format, "mp3");
        assert_eq!(track.duration, 0.0);
        assert!(track.cover_art.is_none());
    }

    #[test]
    fn missing_file_still_yields_a_record() {
        let (track, failed) = read_track(PathBuf::from("/no/such/file"));
        assert!(failed);
        assert_eq!(track.title, "file");
        assert_eq!(track.format, UNKNOWN_FORMAT);
        assert_eq!(track.file_size, 0);
    }
}
