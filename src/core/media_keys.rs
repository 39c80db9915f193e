//! core/media_keys.rs
//! Hardware/OS media keys.
//!
//! - `OsMediaKeys`: the platform's media session via souvlaki (MPRIS over D-Bus on
//!   Linux, SMTC on Windows, Now Playing on macOS)
//! - `NoMediaKeys`: accepts everything, shows nothing; used where the OS side is
//!   unavailable or refuses to register
//!
//! Either way, key presses turn into `PlayerCommand`s on the controller.

use std::time::Duration;

use souvlaki::{
    MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, PlatformConfig,
};
use tracing::{debug, info, warn};

use super::player::{PlayerCommand, PlayerController};
use super::types::TrackRecord;

const DBUS_NAME: &str = "peachy";
const DISPLAY_NAME: &str = "Peachy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Unsupported,
}

impl Platform {
    /// Decided once at startup.
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            _ => Platform::Unsupported,
        }
    }
}

/// A key press coming from the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    PlayPause,
    Play,
    Pause,
    Next,
    Previous,
    Stop,
}

impl MediaKey {
    pub fn command(self) -> PlayerCommand {
        match self {
            MediaKey::PlayPause => PlayerCommand::TogglePlayPause,
            MediaKey::Play => PlayerCommand::Resume,
            MediaKey::Pause => PlayerCommand::Pause,
            MediaKey::Next => PlayerCommand::Next,
            MediaKey::Previous => PlayerCommand::Previous,
            MediaKey::Stop => PlayerCommand::Stop,
        }
    }

    /// The keys we act on; seek/volume/raise requests are ignored.
    pub fn from_event(event: &MediaControlEvent) -> Option<Self> {
        match event {
            MediaControlEvent::Toggle => Some(MediaKey::PlayPause),
            MediaControlEvent::Play => Some(MediaKey::Play),
            MediaControlEvent::Pause => Some(MediaKey::Pause),
            MediaControlEvent::Next => Some(MediaKey::Next),
            MediaControlEvent::Previous => Some(MediaKey::Previous),
            MediaControlEvent::Stop => Some(MediaKey::Stop),
            _ => None,
        }
    }
}

pub trait MediaKeys {
    /// Hook into the OS. False if the platform refused.
    fn register(&mut self) -> bool;

    /// Show "now playing" metadata, or clear it.
    fn update_track(&mut self, track: Option<&TrackRecord>);

    fn update_state(&mut self, playing: bool, paused: bool);

    fn cleanup(&mut self);

    fn is_registered(&self) -> bool;
}

/// The OS media session, through souvlaki.
pub struct OsMediaKeys {
    platform: Platform,
    controller: PlayerController,
    controls: Option<MediaControls>,
}

impl OsMediaKeys {
    pub fn new(platform: Platform, controller: PlayerController) -> Self {
        Self {
            platform,
            controller,
            controls: None,
        }
    }

    fn open(&self) -> Result<MediaControls, String> {
        let config = PlatformConfig {
            dbus_name: DBUS_NAME,
            display_name: DISPLAY_NAME,
            // SMTC wants a window handle; a terminal player has none, so Windows
            // registration fails here and the caller falls back.
            hwnd: None,
        };

        let mut controls = MediaControls::new(config).map_err(|e| format!("{e:?}"))?;

        let controller = self.controller.clone();
        controls
            .attach(move |event: MediaControlEvent| {
                if let Some(key) = MediaKey::from_event(&event) {
                    debug!("Media key {key:?}");
                    controller.send(key.command());
                }
            })
            .map_err(|e| format!("{e:?}"))?;

        Ok(controls)
    }
}

impl MediaKeys for OsMediaKeys {
    fn register(&mut self) -> bool {
        if self.controls.is_some() {
            return true;
        }

        match self.open() {
            Ok(controls) => {
                info!("Media keys: registered with {:?}", self.platform);
                self.controls = Some(controls);
                true
            }
            Err(e) => {
                warn!("Media keys: {:?} registration failed: {e}", self.platform);
                false
            }
        }
    }

    fn update_track(&mut self, track: Option<&TrackRecord>) {
        let Some(controls) = self.controls.as_mut() else {
            return;
        };

        let metadata = match track {
            Some(t) => MediaMetadata {
                title: Some(t.title.as_str()),
                artist: Some(t.artist.as_str()),
                album: Some(t.album.as_str()),
                duration: t
                    .has_known_duration()
                    .then(|| Duration::from_secs_f64(t.duration)),
                ..Default::default()
            },
            None => MediaMetadata::default(),
        };

        if let Err(e) = controls.set_metadata(metadata) {
            debug!("Media keys: metadata update failed: {e:?}");
        }
    }

    fn update_state(&mut self, playing: bool, paused: bool) {
        let Some(controls) = self.controls.as_mut() else {
            return;
        };

        let playback = if playing {
            MediaPlayback::Playing { progress: None }
        } else if paused {
            MediaPlayback::Paused { progress: None }
        } else {
            MediaPlayback::Stopped
        };

        if let Err(e) = controls.set_playback(playback) {
            debug!("Media keys: state update failed: {e:?}");
        }
    }

    fn cleanup(&mut self) {
        if let Some(mut controls) = self.controls.take() {
            if let Err(e) = controls.detach() {
                debug!("Media keys: detach failed: {e:?}");
            }
        }
    }

    fn is_registered(&self) -> bool {
        self.controls.is_some()
    }
}

impl Drop for OsMediaKeys {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Accepts everything, shows nothing. Key presses can still be injected with
/// [`NoMediaKeys::press`].
pub struct NoMediaKeys {
    controller: PlayerController,
    registered: bool,
}

impl NoMediaKeys {
    pub fn new(controller: PlayerController) -> Self {
        Self {
            controller,
            registered: false,
        }
    }

    pub fn press(&self, key: MediaKey) {
        debug!("Media key {key:?}");
        self.controller.send(key.command());
    }
}

impl MediaKeys for NoMediaKeys {
    fn register(&mut self) -> bool {
        self.registered = true;
        true
    }

    fn update_track(&mut self, track: Option<&TrackRecord>) {
        if let Some(t) = track {
            debug!("Now playing: {}", t.display_name());
        }
    }

    fn update_state(&mut self, _playing: bool, _paused: bool) {}

    fn cleanup(&mut self) {
        self.registered = false;
    }

    fn is_registered(&self) -> bool {
        self.registered
    }
}

/// The OS bridge when the platform has one and it registers, else the no-op bridge.
///
/// The returned bridge is already registered when it is the OS one.
pub fn create_media_keys(platform: Platform, controller: PlayerController) -> Box<dyn MediaKeys> {
    if platform == Platform::Unsupported {
        info!("Media keys: platform not supported, using no-op bridge");
        return Box::new(NoMediaKeys::new(controller));
    }

    let mut os = OsMediaKeys::new(platform, controller.clone());
    if os.register() {
        return Box::new(os);
    }

    info!("Media keys: falling back to no-op bridge");
    Box::new(NoMediaKeys::new(controller))
}
