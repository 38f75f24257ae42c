//! Fixed-capacity sample history.
//!
//! [`RingBuffer`] keeps the most recent `capacity` elements in insertion order
//! and evicts the oldest on overflow. It backs both the live flux stream and
//! the prediction history charts.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One timestamped scalar reading. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }

    /// A sample stamped with the current wall-clock time.
    pub fn now(value: f64) -> Self {
        Self::new(value, Utc::now())
    }
}

/// Bounded, insertion-ordered, oldest-evicted-first sequence.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add to the end, evicting the oldest element if the buffer is full.
    ///
    /// A zero-capacity buffer discards everything.
    pub fn append(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Every element, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    /// The most recent `k` elements (fewer if the buffer holds less), oldest first.
    pub fn recent(&self, k: usize) -> Vec<T> {
        let skip = self.items.len().saturating_sub(k);
        self.items.iter().skip(skip).cloned().collect()
    }
}
