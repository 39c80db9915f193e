//! Peachy: a small terminal music player.
//!
//! # What this program is
//! Point it at a folder. It scans for audio files, reads their tags, queues them up
//! and plays them through the default output device. The queue (and where you were
//! in it) survives restarts.
//!
//! # How it's wired
//! - `core::player` owns the audio engine + queue on its own thread
//! - this file only:
//!   - parses args, sets up logging and settings
//!   - reads commands from stdin and forwards them as `PlayerCommand`s
//!   - prints `PlayerEvent`s as they arrive
//!
//! # Commands (one per line)
//! `play`, `pause`, `toggle` (or empty line), `next`, `back`, `stop`,
//! `seek <secs>`, `goto <n>`, `clear`, `quit`

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peachy::core::media_keys::{Platform, create_media_keys};
use peachy::core::playback::{AudioOutput, EngineConfig, NullOutput, PlaybackEvent, RodioOutput};
use peachy::core::player::{PlayerCommand, PlayerController, PlayerEvent, start_player};
use peachy::core::queue::QueueEvent;
use peachy::core::settings::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about = "Peachy terminal music player", long_about = None)]
struct Args {
    /// Folder to scan. Defaults to the saved music folder.
    folder: Option<PathBuf>,

    /// Settings file (default: ~/.peachy-player/settings.json).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Keep settings in memory only; nothing is written to disk.
    #[arg(long)]
    ephemeral: bool,

    /// Decode but don't open an audio device.
    #[arg(long)]
    no_audio: bool,

    /// Position update interval in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let settings = Arc::new(open_settings(&args));

    let folder = args.folder.clone().or_else(|| settings.music_folder());
    if let Some(folder) = &args.folder {
        if let Err(e) = settings.set_music_folder(folder) {
            warn!("Could not remember music folder: {e}");
        }
    }

    let output: Arc<dyn AudioOutput> = if args.no_audio {
        Arc::new(NullOutput)
    } else {
        Arc::new(RodioOutput)
    };

    let config = EngineConfig {
        tick_interval: Duration::from_millis(args.tick_ms.max(10)),
        ..EngineConfig::default()
    };

    let restored = settings.queue().len();
    let (controller, events) = start_player(output, settings.clone(), config);

    let mut media_keys = create_media_keys(Platform::detect(), controller.clone());
    media_keys.register();

    // Only fill the queue from disk if there was nothing to restore.
    if restored == 0 {
        match &folder {
            Some(folder) => {
                let tracks = peachy::core::scan_folder(folder);
                info!("Queued {} tracks from {}", tracks.len(), folder.display());
                controller.send(PlayerCommand::Enqueue(tracks));
            }
            None => warn!("No folder given and none saved; queue is empty"),
        }
    }

    let command_tx = controller.clone();
    thread::spawn(move || read_commands(command_tx));

    let mut duration = 0.0;

    for event in events {
        match event {
            PlayerEvent::Playback(ev) => match ev {
                PlaybackEvent::Started(track) => {
                    println!("> {}", track.display_name());
                    media_keys.update_track(Some(&track));
                    media_keys.update_state(true, false);
                }
                PlaybackEvent::Paused => {
                    println!("|| paused");
                    media_keys.update_state(false, true);
                }
                PlaybackEvent::Resumed => {
                    println!("> resumed");
                    media_keys.update_state(true, false);
                }
                PlaybackEvent::Stopped => {
                    println!("[] stopped");
                    media_keys.update_state(false, false);
                }
                PlaybackEvent::Finished => media_keys.update_state(false, false),
                PlaybackEvent::DurationChanged(d) => duration = d,
                PlaybackEvent::PositionChanged(p) => {
                    eprint!("\r  {} / {}   ", format_time(p), format_time(duration));
                }
                PlaybackEvent::Error(msg) => error!("{msg}"),
            },
            PlayerEvent::Queue(ev) => match ev {
                QueueEvent::CurrentTrackChanged(None) => media_keys.update_track(None),
                QueueEvent::TrackRemoved(i) => println!("- removed #{}", i + 1),
                _ => {}
            },
        }
    }

    media_keys.cleanup();
    info!("Bye");
}

fn open_settings(args: &Args) -> Settings {
    if args.ephemeral {
        return Settings::in_memory();
    }
    match args.settings.clone().or_else(Settings::default_path) {
        Some(path) => Settings::open(path),
        None => {
            warn!("No home directory; settings will not be saved");
            Settings::in_memory()
        }
    }
}

/// stdin -> commands. Ends the player on EOF or `quit`.
fn read_commands(controller: PlayerController) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };

        match parse_command(line.trim()) {
            Some(PlayerCommand::Shutdown) => break,
            Some(cmd) => controller.send(cmd),
            None => println!("?? {}", line.trim()),
        }
    }
    controller.send(PlayerCommand::Shutdown);
}

fn parse_command(line: &str) -> Option<PlayerCommand> {
    let mut parts = line.split_whitespace();
    let word = parts.next().unwrap_or("toggle");
    let arg = parts.next();

    let cmd = match word {
        "play" => PlayerCommand::PlayCurrent,
        "pause" => PlayerCommand::Pause,
        "resume" => PlayerCommand::Resume,
        "toggle" | "p" => PlayerCommand::TogglePlayPause,
        "next" | "n" => PlayerCommand::Next,
        "back" | "b" => PlayerCommand::Previous,
        "stop" | "s" => PlayerCommand::Stop,
        "seek" => PlayerCommand::Seek(arg?.parse().ok()?),
        "goto" => PlayerCommand::PlayIndex(arg?.parse::<usize>().ok()?.checked_sub(1)?),
        "clear" => PlayerCommand::Clear,
        "quit" | "q" | "exit" => PlayerCommand::Shutdown,
        _ => return None,
    };
    Some(cmd)
}

fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
