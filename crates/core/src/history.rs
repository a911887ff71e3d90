//! The rolling conversation history.
//!
//! One store is shared by every request the process handles. All access
//! goes through a single mutex so concurrent requests cannot interleave
//! an append with an eviction sweep.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::message::Turn;

/// Bounded, ordered, process-wide conversation history.
///
/// The store never holds more than `2 * max_pairs` turns; when an append
/// pushes it over the bound, turns are evicted from the front (strict FIFO,
/// oldest first — synthetic system turns are evicted like any other).
pub struct HistoryStore {
    max_pairs: usize,
    turns: Mutex<VecDeque<Turn>>,
}

impl HistoryStore {
    /// Create an empty store bounded at `2 * max_pairs` turns.
    pub fn new(max_pairs: usize) -> Self {
        Self {
            max_pairs,
            turns: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a turn to the tail, evicting from the head until the bound holds.
    pub fn append(&self, turn: Turn) {
        let mut turns = self.lock();
        turns.push_back(turn);
        while turns.len() > self.max_pairs * 2 {
            turns.pop_front();
        }
    }

    /// An independent, ordered copy of the current history.
    ///
    /// The copy does not race further mutation — a request builds its
    /// upstream payload from the snapshot, not the live store.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.lock().iter().cloned().collect()
    }

    /// Empty the store immediately.
    ///
    /// Requests already in flight keep their own accumulation and are
    /// unaffected until they commit.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of turns currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Turn>> {
        self.turns.lock().unwrap_or_else(|e| e.into_inner())
    }
}
