//! Playback history for "previous" navigation.
//!
//! Bounded ring of recently started tracks, oldest evicted first. The most recent
//! entry is assumed to be whatever is playing right now.

use std::collections::VecDeque;

use super::types::TrackRecord;

pub const DEFAULT_HISTORY_CAPACITY: usize = 15;

#[derive(Debug, Clone)]
pub struct PlaybackHistory {
    /// Most recent = back
    tracks: VecDeque<TrackRecord>,
    capacity: usize,
}

impl PlaybackHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            tracks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append; drops the oldest entry when full.
    pub fn push(&mut self, track: TrackRecord) {
        if self.tracks.len() >= self.capacity {
            self.tracks.pop_front();
        }
        self.tracks.push_back(track);
    }

    /// Pop the current track and return the one before it.
    ///
    /// Needs at least two entries (current + a predecessor); otherwise nothing
    /// is popped and `None` comes back.
    pub fn previous(&mut self) -> Option<TrackRecord> {
        if self.tracks.len() < 2 {
            return None;
        }
        self.tracks.pop_back();
        self.tracks.back().cloned()
    }

    pub fn peek(&self) -> Option<&TrackRecord> {
        self.tracks.back()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &TrackRecord> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

impl Default for PlaybackHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str) -> TrackRecord {
        let mut t = TrackRecord::new(format!("/music/{name}.mp3"));
        t.title = name.to_string();
        t
    }

    #[test]
    fn previous_walks_back_until_one_left() {
        let mut h = PlaybackHistory::new(10);
        h.push(track("A"));
        h.push(track("B"));
        h.push(track("C"));

        assert_eq!(h.previous().unwrap().title, "B");
        assert_eq!(h.previous().unwrap().title, "A");
        assert!(h.previous().is_none());

        // The last entry is never popped by a failed previous().
        assert_eq!(h.len(), 1);
        assert_eq!(h.peek().unwrap().title, "A");
    }

    #[test]
    fn single_entry_has_no_previous() {
        let mut h = PlaybackHistory::default();
        assert!(h.previous().is_none());
        h.push(track("A"));
        assert!(h.previous().is_none());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn bounded_evicts_oldest() {
        let mut h = PlaybackHistory::new(3);
        for name in ["1", "2", "3", "4", "5"] {
            h.push(track(name));
        }

        assert_eq!(h.len(), 3);
        let titles: Vec<_> = h.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["3", "4", "5"]);
    }

    #[test]
    fn default_capacity_is_fifteen() {
        let mut h = PlaybackHistory::default();
        assert_eq!(h.capacity(), 15);
        for i in 0..40 {
            h.push(track(&i.to_string()));
        }
        assert_eq!(h.len(), 15);
    }

    #[test]
    fn clear_empties() {
        let mut h = PlaybackHistory::default();
        h.push(track("A"));
        h.push(track("B"));
        h.clear();
        assert!(h.is_empty());
        assert!(h.previous().is_none());
    }
}
