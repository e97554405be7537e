//! Bounded, ordered log history with FIFO eviction and change notification.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::entry::LogEntry;

/// Retained line count when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// What a single mutation did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferChange {
    /// One entry appended at the tail; `evicted` entries dropped from the head.
    Appended { sequence: u64, evicted: usize },
    /// Buffer emptied; `removed` entries discarded.
    Cleared { removed: usize },
}

/// Receives exactly one callback per buffer mutation, after the buffer is
/// back in a consistent state.
pub trait BufferObserver: Send + Sync {
    fn buffer_changed(&self, change: &BufferChange);
}

/// Observer that counts mutations not yet consumed by its owner.
#[derive(Debug, Default)]
pub struct ChangeCounter {
    pending: AtomicU64,
}

impl ChangeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unconsumed changes.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume and return the pending change count.
    pub fn take(&self) -> u64 {
        self.pending.swap(0, Ordering::AcqRel)
    }
}

impl BufferObserver for ChangeCounter {
    fn buffer_changed(&self, _change: &BufferChange) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }
}

/// Fixed-capacity line store. Insertion order is arrival order.
pub struct LogBuffer {
    capacity: usize,
    entries: VecDeque<LogEntry>,
    next_sequence: u64,
    evicted_total: u64,
    observers: Vec<Arc<dyn BufferObserver>>,
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.len())
            .field("next_sequence", &self.next_sequence)
            .field("evicted_total", &self.evicted_total)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogBuffer {
    /// Create an empty buffer. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
            next_sequence: 0,
            evicted_total: 0,
            observers: Vec::new(),
        }
    }

    /// Register an observer for all future mutations.
    pub fn subscribe(&mut self, observer: Arc<dyn BufferObserver>) {
        self.observers.push(observer);
    }

    /// Parse `line` and append it at the tail.
    pub fn append(&mut self, line: &str) -> BufferChange {
        let entry = LogEntry::parsed(self.take_sequence(), line);
        self.push(entry)
    }

    /// Append `line` verbatim without parsing.
    pub fn append_synthetic(&mut self, line: &str) -> BufferChange {
        let entry = LogEntry::synthetic(self.take_sequence(), line);
        self.push(entry)
    }

    /// Drop every entry. The sequence counter keeps counting.
    pub fn clear(&mut self) -> BufferChange {
        let removed = self.entries.len();
        self.entries.clear();
        self.finish(BufferChange::Cleared { removed })
    }

    /// Point-in-time copy of the current entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Borrowing iterator over current entries, oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        sequence
    }

    fn push(&mut self, entry: LogEntry) -> BufferChange {
        let sequence = entry.sequence;
        self.entries.push_back(entry);

        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            let _ = self.entries.pop_front();
            evicted += 1;
        }
        self.evicted_total = self.evicted_total.saturating_add(evicted as u64);

        self.finish(BufferChange::Appended { sequence, evicted })
    }

    fn finish(&mut self, change: BufferChange) -> BufferChange {
        for observer in &self.observers {
            observer.buffer_changed(&change);
        }
        change
    }
}
