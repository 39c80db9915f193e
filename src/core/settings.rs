//! core/settings.rs
//! JSON key-value settings store.
//!
//! One object per process, built explicitly and handed around as `Arc<Settings>`
//! to whoever needs persistence (the queue, the CLI). Every `set` writes the
//! whole file; it's small.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::SettingsError;
use super::types::SavedTrack;

const APP_DIR: &str = ".peachy-player";
const SETTINGS_FILE: &str = "settings.json";

pub const KEY_MUSIC_FOLDER: &str = "music_folder";
pub const KEY_QUEUE: &str = "queue";
pub const KEY_CURRENT_QUEUE_INDEX: &str = "current_queue_index";

#[derive(Debug)]
pub struct Settings {
    path: Option<PathBuf>,
    data: Mutex<Map<String, Value>>,
}

impl Settings {
    /// `<home>/.peachy-player/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load from `path`. Missing file => empty store. Garbage => warn, empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match load_map(&path) {
            Ok(map) => map,
            Err(e) => {
                warn!("Could not load settings from {}: {e}", path.display());
                Map::new()
            }
        };

        Self {
            path: Some(path),
            data: Mutex::new(data),
        }
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(Map::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = self.lock();
        let value = data.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring malformed setting {key:?}: {e}");
                None
            }
        }
    }

    /// Set one key and write the file.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), SettingsError> {
        let value = serde_json::to_value(value)?;
        let mut data = self.lock();
        data.insert(key.to_string(), value);
        self.write(&data)
    }

    pub fn remove(&self, key: &str) -> Result<(), SettingsError> {
        let mut data = self.lock();
        if data.remove(key).is_some() {
            self.write(&data)?;
        }
        Ok(())
    }

    /// Re-read the backing file, replacing what's in memory.
    pub fn reload(&self) -> Result<(), SettingsError> {
        let path = self.path.as_deref().ok_or(SettingsError::NoPath)?;
        let map = load_map(path)?;
        *self.lock() = map;
        Ok(())
    }

    pub fn music_folder(&self) -> Option<PathBuf> {
        self.get(KEY_MUSIC_FOLDER)
    }

    pub fn set_music_folder(&self, folder: &Path) -> Result<(), SettingsError> {
        self.set(KEY_MUSIC_FOLDER, folder)
    }

    pub fn clear_music_folder(&self) -> Result<(), SettingsError> {
        self.remove(KEY_MUSIC_FOLDER)
    }

    pub fn queue(&self) -> Vec<SavedTrack> {
        self.get(KEY_QUEUE).unwrap_or_default()
    }

    /// `-1` when nothing was current.
    pub fn current_queue_index(&self) -> i64 {
        self.get(KEY_CURRENT_QUEUE_INDEX).unwrap_or(-1)
    }

    /// Queue + cursor in one write.
    pub fn save_queue(&self, tracks: &[SavedTrack], current_index: i64) -> Result<(), SettingsError> {
        let tracks = serde_json::to_value(tracks)?;
        let mut data = self.lock();
        data.insert(KEY_QUEUE.to_string(), tracks);
        data.insert(KEY_CURRENT_QUEUE_INDEX.to_string(), Value::from(current_index));
        self.write(&data)
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, data: &Map<String, Value>) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(data)?;
        fs::write(path, json)?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }
}

fn load_map(path: &Path) -> Result<Map<String, Value>, SettingsError> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let text = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(path: &str) -> SavedTrack {
        SavedTrack {
            file_path: PathBuf::from(path),
            title: "T".into(),
            artist: "A".into(),
            album: "B".into(),
            year: "2001".into(),
            track_number: Some(3),
            duration: 12.5,
            file_size: 1024,
            format: "mp3".into(),
        }
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::open(dir.path().join("nope/settings.json"));
        assert!(s.music_folder().is_none());
        assert_eq!(s.current_queue_index(), -1);
        assert!(s.queue().is_empty());
    }

    #[test]
    fn set_writes_through_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg/settings.json");

        let s = Settings::open(&path);
        s.set_music_folder(Path::new("/music")).unwrap();
        s.save_queue(&[saved("/music/a.mp3"), saved("/music/b.mp3")], 1)
            .unwrap();

        let again = Settings::open(&path);
        assert_eq!(again.music_folder(), Some(PathBuf::from("/music")));
        assert_eq!(again.queue().len(), 2);
        assert_eq!(again.queue()[1].file_path, PathBuf::from("/music/b.mp3"));
        assert_eq!(again.current_queue_index(), 1);
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let s = Settings::open(&path);
        assert!(s.queue().is_empty());

        // And the next write replaces the garbage.
        s.set("volume", 0.5).unwrap();
        assert_eq!(Settings::open(&path).get::<f64>("volume"), Some(0.5));
    }

    #[test]
    fn clear_music_folder_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let s = Settings::open(&path);
        s.set_music_folder(Path::new("/music")).unwrap();
        s.clear_music_folder().unwrap();

        assert!(Settings::open(&path).music_folder().is_none());
    }

    #[test]
    fn in_memory_store_keeps_values_without_a_file() {
        let s = Settings::in_memory();
        s.save_queue(&[saved("/x.mp3")], 0).unwrap();
        assert_eq!(s.queue().len(), 1);
        assert_eq!(s.current_queue_index(), 0);
        assert!(matches!(s.reload(), Err(SettingsError::NoPath)));
    }

    #[test]
    fn wrong_type_reads_as_none() {
        let s = Settings::in_memory();
        s.set(KEY_CURRENT_QUEUE_INDEX, "three").unwrap();
        assert_eq!(s.current_queue_index(), -1);
    }
}
