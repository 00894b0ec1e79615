//! Bounded turn history for loop and stuck detection.

use serde::Serialize;
use std::collections::VecDeque;

use crate::spatial::types::Button;

/// One game turn as seen by the loop enhancer.
#[derive(Debug, Clone, Serialize)]
pub struct TurnRecord {
    pub turn_number: u64,
    pub timestamp: String,
    pub screenshot_ref: String,
    pub screenshot_hash: String,
    pub buttons_pressed: Vec<Button>,
    /// Similarity to the previous turn's frame, `0.0` on the first turn.
    pub visual_similarity: f64,
    pub progress_made: bool,
    pub ai_reasoning: String,
}

/// A FIFO of the most recent turns; the oldest is evicted once full.
#[derive(Debug, Clone)]
pub struct TurnHistory {
    turns: VecDeque<TurnRecord>,
    capacity: usize,
}

impl TurnHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: TurnRecord) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&TurnRecord> {
        self.turns.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TurnRecord> {
        self.turns.iter()
    }

    /// The newest `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &TurnRecord> {
        self.turns.iter().skip(self.turns.len().saturating_sub(n))
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// How many turns in a row, ending with the newest, pressed exactly the
    /// same buttons as the newest. `0` when empty.
    pub fn consecutive_identical_actions(&self) -> usize {
        let Some(last) = self.turns.back() else {
            return 0;
        };
        self.turns
            .iter()
            .rev()
            .take_while(|t| t.buttons_pressed == last.buttons_pressed)
            .count()
    }

    /// How many turns in a row, ending with the newest, looked like the turn
    /// before them.
    pub fn consecutive_similar_frames(&self, threshold: f64) -> usize {
        self.turns
            .iter()
            .rev()
            .take_while(|t| t.visual_similarity >= threshold)
            .count()
    }
}
