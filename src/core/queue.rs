//! core/queue.rs
//! The play queue: an ordered list of tracks plus a "current" cursor.
//!
//! Cursor rules (the whole point of this module):
//! - `None` or a valid index, after every mutation. Never dangling.
//! - insert at i <= cursor        => cursor + 1
//! - remove at i < cursor         => cursor - 1
//! - remove at i == cursor        => None (and a "current changed -> none" event)
//! - move a -> b                  => follows the moved track, or shifts by one
//!   when the track crossed over the cursor
//!
//! Bad indices are no-ops that return `false`/`None`. They never panic; UI code
//! can pass whatever the user clicked.
//!
//! Single-threaded: owned and mutated by the control thread only.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use tracing::{debug, info, warn};

use super::settings::Settings;
use super::tags::read_embedded_art;
use super::types::{SavedTrack, TrackRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// Structure or order changed
    QueueChanged,
    CurrentTrackChanged(Option<TrackRecord>),
    TrackAdded(TrackRecord),
    TrackRemoved(usize),
}

pub struct QueueManager {
    tracks: Vec<TrackRecord>,
    current: Option<usize>,

    event_tx: Sender<QueueEvent>,

    // Persistence (optional: tests and ephemeral runs go without)
    settings: Option<Arc<Settings>>,
}

impl QueueManager {
    pub fn new(event_tx: Sender<QueueEvent>) -> Self {
        Self {
            tracks: Vec::new(),
            current: None,
            event_tx,
            settings: None,
        }
    }

    /// Persist queue + cursor to `settings` on every change.
    pub fn with_settings(mut self, settings: Arc<Settings>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&TrackRecord> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&TrackRecord> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn add(&mut self, track: TrackRecord) {
        self.tracks.push(track.clone());
        self.emit(QueueEvent::TrackAdded(track));
        self.emit(QueueEvent::QueueChanged);
        self.persist();
    }

    /// Append many. Empty input is a no-op (no events).
    pub fn add_many(&mut self, tracks: Vec<TrackRecord>) {
        if tracks.is_empty() {
            return;
        }

        self.tracks.extend(tracks.iter().cloned());
        for track in tracks {
            self.emit(QueueEvent::TrackAdded(track));
        }
        self.emit(QueueEvent::QueueChanged);
        self.persist();
    }

    /// Insert at `index` (0..=len).
    pub fn insert(&mut self, index: usize, track: TrackRecord) -> bool {
        if index > self.tracks.len() {
            return false;
        }

        self.tracks.insert(index, track.clone());
        if let Some(cur) = self.current {
            if index <= cur {
                self.current = Some(cur + 1);
            }
        }

        self.emit(QueueEvent::TrackAdded(track));
        self.emit(QueueEvent::QueueChanged);
        self.persist();
        true
    }

    /// Remove at `index`. Removing the current track leaves nothing current.
    pub fn remove(&mut self, index: usize) -> Option<TrackRecord> {
        if index >= self.tracks.len() {
            return None;
        }

        let track = self.tracks.remove(index);
        match self.current {
            Some(cur) if index < cur => self.current = Some(cur - 1),
            Some(cur) if index == cur => {
                self.current = None;
                self.emit(QueueEvent::CurrentTrackChanged(None));
            }
            _ => {}
        }

        self.emit(QueueEvent::TrackRemoved(index));
        self.emit(QueueEvent::QueueChanged);
        self.persist();
        Some(track)
    }

    /// Move the track at `from` so it ends up at `to`.
    pub fn move_track(&mut self, from: usize, to: usize) -> bool {
        let len = self.tracks.len();
        if from >= len || to >= len || from == to {
            return false;
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);

        if let Some(cur) = self.current {
            self.current = Some(if cur == from {
                to
            } else if from < cur && cur <= to {
                cur - 1
            } else if to <= cur && cur < from {
                cur + 1
            } else {
                cur
            });
        }

        self.emit(QueueEvent::QueueChanged);
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
        self.emit(QueueEvent::CurrentTrackChanged(None));
        self.emit(QueueEvent::QueueChanged);
        self.persist();
    }

    /// Point the cursor at `index`, or at nothing with `None`.
    pub fn set_current(&mut self, index: Option<usize>) -> bool {
        if let Some(i) = index {
            if i >= self.tracks.len() {
                return false;
            }
        }

        self.current = index;
        self.emit(QueueEvent::CurrentTrackChanged(self.current().cloned()));
        self.persist();
        true
    }

    /// Advance one. From "nothing current" this lands on the first track.
    pub fn next(&mut self) -> Option<&TrackRecord> {
        let target = self.next_index()?;
        self.current = Some(target);
        self.emit(QueueEvent::CurrentTrackChanged(self.current().cloned()));
        self.persist();
        self.current()
    }

    pub fn previous(&mut self) -> Option<&TrackRecord> {
        let target = self.previous_index()?;
        self.current = Some(target);
        self.emit(QueueEvent::CurrentTrackChanged(self.current().cloned()));
        self.persist();
        self.current()
    }

    pub fn has_next(&self) -> bool {
        self.next_index().is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous_index().is_some()
    }

    /// Remove the current track; the one that slides into its slot becomes current.
    /// Removing the last track steps the cursor back one.
    pub fn remove_current(&mut self) -> Option<TrackRecord> {
        let cur = self.current.filter(|&i| i < self.tracks.len())?;
        let track = self.tracks.remove(cur);

        self.current = if cur < self.tracks.len() {
            Some(cur)
        } else {
            self.tracks.len().checked_sub(1)
        };

        self.emit(QueueEvent::TrackRemoved(cur));
        self.emit(QueueEvent::CurrentTrackChanged(self.current().cloned()));
        self.emit(QueueEvent::QueueChanged);
        self.persist();
        Some(track)
    }

    /// Flat records for persistence (no cover art).
    pub fn serialize(&self) -> Vec<SavedTrack> {
        self.tracks.iter().map(SavedTrack::from).collect()
    }

    /// Cursor in its persisted form: `-1` for none.
    pub fn saved_index(&self) -> i64 {
        self.current.map_or(-1, |i| i as i64)
    }

    /// Rebuild from persisted records.
    ///
    /// Entries whose file no longer exists are dropped. `saved_index` refers to the
    /// saved (pre-drop) ordering and is remapped onto the survivors; if the track it
    /// pointed at was dropped, nothing is current. Cover art is re-read from each
    /// surviving file rather than trusted from storage.
    pub fn restore(&mut self, records: Vec<SavedTrack>, saved_index: i64) {
        let wanted = usize::try_from(saved_index).ok();

        self.tracks.clear();
        self.current = None;

        let mut dropped = 0usize;
        for (i, saved) in records.into_iter().enumerate() {
            if !saved.file_path.exists() {
                debug!("Restore: dropping missing {}", saved.file_path.display());
                dropped += 1;
                continue;
            }

            let mut track = saved.into_record();
            track.cover_art = read_embedded_art(&track.path).map(Arc::from);

            if wanted == Some(i) {
                self.current = Some(self.tracks.len());
            }
            self.tracks.push(track);
        }

        info!(
            "Restored queue: {} tracks ({} missing), current={:?}",
            self.tracks.len(),
            dropped,
            self.current
        );

        self.emit(QueueEvent::QueueChanged);
        if self.current.is_some() {
            self.emit(QueueEvent::CurrentTrackChanged(self.current().cloned()));
        }
        self.persist();
    }

    fn next_index(&self) -> Option<usize> {
        let target = self.current.map_or(0, |i| i + 1);
        (target < self.tracks.len()).then_some(target)
    }

    fn previous_index(&self) -> Option<usize> {
        self.current.filter(|&i| i > 0).map(|i| i - 1)
    }

    fn emit(&self, event: QueueEvent) {
        // Nobody listening is fine.
        let _ = self.event_tx.send(event);
    }

    fn persist(&self) {
        let Some(settings) = &self.settings else {
            return;
        };

        if let Err(e) = settings.save_queue(&self.serialize(), self.saved_index()) {
            warn!("Failed to save queue: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver};

    fn track(name: &str) -> TrackRecord {
        let mut t = TrackRecord::new(format!("/music/{name}.mp3"));
        t.title = name.to_string();
        t
    }

    fn queue_of(names: &[&str]) -> (QueueManager, Receiver<QueueEvent>) {
        let (tx, rx) = mpsc::channel();
        let mut q = QueueManager::new(tx);
        q.add_many(names.iter().map(|n| track(n)).collect());
        // Start each test with a clean event stream.
        while rx.try_recv().is_ok() {}
        (q, rx)
    }

    fn titles(q: &QueueManager) -> Vec<&str> {
        q.tracks().iter().map(|t| t.title.as_str()).collect()
    }

    fn drain(rx: &Receiver<QueueEvent>) -> Vec<QueueEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn add_emits_added_then_changed() {
        let (mut q, rx) = queue_of(&[]);
        q.add(track("A"));

        let events = drain(&rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], QueueEvent::TrackAdded(t) if t.title == "A"));
        assert_eq!(events[1], QueueEvent::QueueChanged);
    }

    #[test]
    fn add_many_empty_is_silent() {
        let (mut q, rx) = queue_of(&["A"]);
        q.add_many(Vec::new());
        assert!(drain(&rx).is_empty());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn insert_before_or_at_cursor_shifts_it() {
        let (mut q, _rx) = queue_of(&["A", "B", "C"]);
        q.set_current(Some(1));

        assert!(q.insert(1, track("X")));
        assert_eq!(q.current_index(), Some(2));
        assert_eq!(q.current().unwrap().title, "B");

        assert!(q.insert(4, track("Y")));
        assert_eq!(q.current_index(), Some(2));

        assert!(!q.insert(9, track("Z")));
        assert_eq!(titles(&q), ["A", "X", "B", "C", "Y"]);
    }

    #[test]
    fn remove_adjusts_cursor() {
        let (mut q, rx) = queue_of(&["A", "B", "C", "D"]);
        q.set_current(Some(2));
        drain(&rx);

        // After the cursor: untouched
        assert_eq!(q.remove(3).unwrap().title, "D");
        assert_eq!(q.current_index(), Some(2));

        // Before the cursor: shifts down
        assert_eq!(q.remove(0).unwrap().title, "A");
        assert_eq!(q.current_index(), Some(1));
        assert_eq!(q.current().unwrap().title, "C");
        drain(&rx);

        // The cursor itself: nothing current
        assert_eq!(q.remove(1).unwrap().title, "C");
        assert_eq!(q.current_index(), None);
        assert_eq!(
            drain(&rx),
            [
                QueueEvent::CurrentTrackChanged(None),
                QueueEvent::TrackRemoved(1),
                QueueEvent::QueueChanged,
            ]
        );

        assert!(q.remove(5).is_none());
    }

    #[test]
    fn move_to_end_past_cursor() {
        let (mut q, _rx) = queue_of(&["A", "B", "C", "D"]);
        q.set_current(Some(2));

        assert!(q.move_track(0, 3));
        assert_eq!(titles(&q), ["B", "C", "D", "A"]);
        assert_eq!(q.current_index(), Some(1));
        assert_eq!(q.current().unwrap().title, "C");
    }

    #[test]
    fn move_follows_current_track() {
        let (mut q, _rx) = queue_of(&["A", "B", "C", "D"]);
        q.set_current(Some(1));

        assert!(q.move_track(1, 3));
        assert_eq!(q.current_index(), Some(3));
        assert_eq!(q.current().unwrap().title, "B");

        assert!(q.move_track(3, 0));
        assert_eq!(q.current_index(), Some(0));
        assert_eq!(titles(&q), ["B", "A", "C", "D"]);
    }

    #[test]
    fn move_backwards_over_cursor_shifts_up() {
        let (mut q, _rx) = queue_of(&["A", "B", "C", "D"]);
        q.set_current(Some(1));

        assert!(q.move_track(3, 0));
        assert_eq!(titles(&q), ["D", "A", "B", "C"]);
        assert_eq!(q.current().unwrap().title, "B");
    }

    #[test]
    fn move_rejects_bad_input() {
        let (mut q, rx) = queue_of(&["A", "B"]);
        assert!(!q.move_track(0, 0));
        assert!(!q.move_track(0, 2));
        assert!(!q.move_track(5, 1));
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let (mut q, rx) = queue_of(&["A", "B"]);
        q.set_current(Some(1));
        drain(&rx);

        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.current_index(), None);
        assert_eq!(
            drain(&rx),
            [QueueEvent::CurrentTrackChanged(None), QueueEvent::QueueChanged]
        );
    }

    #[test]
    fn set_current_validates_range() {
        let (mut q, _rx) = queue_of(&["A", "B"]);
        assert!(q.set_current(Some(1)));
        assert!(!q.set_current(Some(2)));
        assert_eq!(q.current_index(), Some(1));
        assert!(q.set_current(None));
        assert!(q.current().is_none());
    }

    #[test]
    fn next_and_previous_stop_at_the_ends() {
        let (mut q, rx) = queue_of(&["A", "B"]);

        assert!(q.has_next());
        assert!(!q.has_previous());
        assert_eq!(q.next().unwrap().title, "A");
        assert_eq!(q.next().unwrap().title, "B");
        assert!(!q.has_next());
        drain(&rx);

        assert!(q.next().is_none());
        assert!(drain(&rx).is_empty(), "failed next must not emit");

        assert_eq!(q.previous().unwrap().title, "A");
        assert!(q.previous().is_none());
        assert_eq!(q.current_index(), Some(0));
    }

    #[test]
    fn remove_current_slides_next_into_place() {
        let (mut q, rx) = queue_of(&["A", "B", "C"]);
        q.set_current(Some(1));
        drain(&rx);

        assert_eq!(q.remove_current().unwrap().title, "B");
        assert_eq!(titles(&q), ["A", "C"]);
        assert_eq!(q.current_index(), Some(1));
        assert_eq!(q.current().unwrap().title, "C");

        let events = drain(&rx);
        assert_eq!(events[0], QueueEvent::TrackRemoved(1));
        assert!(matches!(&events[1], QueueEvent::CurrentTrackChanged(Some(t)) if t.title == "C"));
        assert_eq!(events[2], QueueEvent::QueueChanged);
    }

    #[test]
    fn remove_current_at_end_steps_back() {
        let (mut q, _rx) = queue_of(&["A", "B"]);
        q.set_current(Some(1));
        q.remove_current();
        assert_eq!(q.current_index(), Some(0));

        q.remove_current();
        assert!(q.is_empty());
        assert_eq!(q.current_index(), None);
        assert!(q.remove_current().is_none());
    }

    #[test]
    fn duplicates_are_allowed() {
        let (mut q, _rx) = queue_of(&["A"]);
        q.add(track("A"));
        assert_eq!(titles(&q), ["A", "A"]);
    }

    #[test]
    fn serialize_keeps_order_and_cursor() {
        let (mut q, _rx) = queue_of(&["A", "B", "C"]);
        q.set_current(Some(2));

        let saved = q.serialize();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved[0].title, "A");
        assert_eq!(q.saved_index(), 2);

        q.set_current(None);
        assert_eq!(q.saved_index(), -1);
    }

    #[test]
    fn mutations_persist_to_settings() {
        let (tx, _rx) = mpsc::channel();
        let settings = Arc::new(Settings::in_memory());
        let mut q = QueueManager::new(tx).with_settings(settings.clone());

        q.add_many(vec![track("A"), track("B")]);
        q.set_current(Some(1));
        assert_eq!(settings.queue().len(), 2);
        assert_eq!(settings.current_queue_index(), 1);

        q.remove(0);
        assert_eq!(settings.queue().len(), 1);
        assert_eq!(settings.current_queue_index(), 0);

        q.clear();
        assert!(settings.queue().is_empty());
        assert_eq!(settings.current_queue_index(), -1);
    }
}
