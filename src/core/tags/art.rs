use std::path::Path;

use id3::Tag;
use id3::frame::Content;

use crate::core::playback::decoder;
use crate::core::types::format_of;

/// First embedded picture (APIC/PIC for MP3, container visuals otherwise).
/// Missing or unreadable art is just `None`.
pub fn read_embedded_art(path: &Path) -> Option<Vec<u8>> {
    if format_of(path) == "mp3" {
        if let Some(bytes) = id3_art(path) {
            return Some(bytes);
        }
    }

    symphonia_art(path)
}

fn id3_art(path: &Path) -> Option<Vec<u8>> {
    let tag = Tag::read_from_path(path).ok()?;

    for f in tag.frames() {
        if f.id() != "APIC" && f.id() != "PIC" {
            continue;
        }
        if let Content::Picture(p) = f.content() {
            return Some(p.data.clone());
        }
    }

    None
}

fn symphonia_art(path: &Path) -> Option<Vec<u8>> {
    let mut probed = decoder::probe(path).ok()?;

    if let Some(meta) = probed.metadata.get() {
        if let Some(visual) = meta.current().and_then(|rev| rev.visuals().first()) {
            return Some(visual.data.to_vec());
        }
    }

    let meta = probed.format.metadata();
    meta.current()
        .and_then(|rev| rev.visuals().first())
        .map(|visual| visual.data.to_vec())
}
