//! core/tags/mod.rs
//!
//! Metadata extraction.
//! Public API:
//! - [`read_track`] reads one file into a [`TrackRecord`](crate::core::types::TrackRecord)
//!   (non-fatal on tag read failure).
//! - [`read_embedded_art`] pulls the first embedded picture.
//!
//! MP3 goes through `id3` (it knows ID3 frames best); every other container
//! goes through Symphonia's metadata revisions.

mod art;
mod read;
mod util;

pub use art::read_embedded_art;
pub use read::read_track;
