//! Peachy: the playback and queue core of a desktop music player.
//!
//! Everything interesting lives under [`core`]; the binary in `main.rs` is a thin
//! headless front end that drives it from the terminal.

pub mod core;
