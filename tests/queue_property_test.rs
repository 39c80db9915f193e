//! Property-based tests for the queue cursor.
//!
//! Whatever sequence of operations runs, the cursor is either nothing or a valid
//! index, and it keeps pointing at the same track unless that track was removed
//! or the cursor was deliberately moved.

use std::path::PathBuf;
use std::sync::mpsc;

use peachy::core::queue::QueueManager;
use peachy::core::types::TrackRecord;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add,
    Insert(usize),
    Remove(usize),
    Move(usize, usize),
    SetCurrent(Option<usize>),
    Next,
    Previous,
    RemoveCurrent,
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    // Indices run past the end on purpose.
    prop_oneof![
        4 => Just(Op::Add),
        2 => (0usize..12).prop_map(Op::Insert),
        2 => (0usize..12).prop_map(Op::Remove),
        2 => (0usize..12, 0usize..12).prop_map(|(a, b)| Op::Move(a, b)),
        2 => proptest::option::of(0usize..12).prop_map(Op::SetCurrent),
        1 => Just(Op::Next),
        1 => Just(Op::Previous),
        1 => Just(Op::RemoveCurrent),
        1 => Just(Op::Clear),
    ]
}

fn numbered(n: usize) -> TrackRecord {
    TrackRecord::new(PathBuf::from(format!("/music/{n:03}.flac")))
}

fn current_path(queue: &QueueManager) -> Option<PathBuf> {
    queue.current().map(|t| t.path.clone())
}

proptest! {
    /// Property: cursor is always None or in bounds
    #[test]
    fn cursor_never_dangles(ops in prop::collection::vec(op(), 1..80)) {
        let (tx, _rx) = mpsc::channel();
        let mut queue = QueueManager::new(tx);
        let mut made = 0usize;

        for op in ops {
            match op {
                Op::Add => { queue.add(numbered(made)); made += 1; }
                Op::Insert(i) => { queue.insert(i, numbered(made)); made += 1; }
                Op::Remove(i) => { queue.remove(i); }
                Op::Move(a, b) => { queue.move_track(a, b); }
                Op::SetCurrent(i) => { queue.set_current(i); }
                Op::Next => { queue.next(); }
                Op::Previous => { queue.previous(); }
                Op::RemoveCurrent => { queue.remove_current(); }
                Op::Clear => queue.clear(),
            }

            if let Some(i) = queue.current_index() {
                prop_assert!(i < queue.len(), "cursor {} with len {}", i, queue.len());
            }
        }
    }

    /// Property: structural edits elsewhere don't change which track is current
    #[test]
    fn cursor_follows_its_track(
        len in 1usize..15,
        start in 0usize..15,
        edits in prop::collection::vec((0u8..3, 0usize..16, 0usize..16), 1..40),
    ) {
        let (tx, _rx) = mpsc::channel();
        let mut queue = QueueManager::new(tx);
        queue.add_many((0..len).map(numbered).collect());
        queue.set_current(Some(start % len));

        let mut made = len;
        for (kind, a, b) in edits {
            let before = current_path(&queue);

            match kind {
                0 => {
                    queue.insert(a, numbered(made));
                    made += 1;
                    prop_assert_eq!(current_path(&queue), before);
                }
                1 => {
                    let was_current = queue.current_index() == Some(a);
                    let removed = queue.remove(a);
                    if removed.is_some() && was_current {
                        prop_assert_eq!(queue.current_index(), None);
                    } else {
                        prop_assert_eq!(current_path(&queue), before);
                    }
                }
                _ => {
                    queue.move_track(a, b);
                    prop_assert_eq!(current_path(&queue), before);
                }
            }
        }
    }

    /// Property: persisted index always matches the cursor
    #[test]
    fn saved_index_mirrors_cursor(
        len in 0usize..10,
        pick in proptest::option::of(0usize..12),
    ) {
        let (tx, _rx) = mpsc::channel();
        let mut queue = QueueManager::new(tx);
        queue.add_many((0..len).map(numbered).collect());
        let accepted = queue.set_current(pick);

        prop_assert_eq!(accepted, pick.is_none_or(|i| i < len));
        match queue.current_index() {
            Some(i) => prop_assert_eq!(queue.saved_index(), i as i64),
            None => prop_assert_eq!(queue.saved_index(), -1),
        }
    }
}
