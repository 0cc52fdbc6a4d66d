//! RecentLog: the bounded recent-activity window.
//!
//! Every append enforces two bounds, in this order:
//!
//! 1. **Age** – entries older than `window` (measured against the timestamp
//!    of the entry just appended) are evicted from the front.
//! 2. **Count** – if more than `capacity` entries remain, the oldest are
//!    trimmed until the cap holds.
//!
//! Entries are kept in append order, so the buffer always holds the most
//! recent subset that satisfies both bounds.
//!
//! # VecDeque choice
//!
//! Both evictions pop from the front and appends push to the back, so a
//! `VecDeque` gives O(1) for every operation the log performs.

use std::collections::VecDeque;
use std::time::Duration;

use super::entry::LogEntry;

/// Default age window of the recent-activity log.
pub const DEFAULT_LOG_WINDOW: Duration = Duration::from_secs(30);

/// Default maximum number of entries kept.
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Ring buffer of recent log entries bounded by age and count.
#[derive(Debug, Clone)]
pub struct RecentLog {
    entries: VecDeque<LogEntry>,
    window: Duration,
    capacity: usize,
}

impl Default for RecentLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_WINDOW, DEFAULT_LOG_CAPACITY)
    }
}

impl RecentLog {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            window,
            capacity,
        }
    }

    /// Appends an entry and enforces both bounds.
    pub fn push(&mut self, entry: LogEntry) {
        let now = entry.timestamp;
        self.entries.push_back(entry);

        while let Some(oldest) = self.entries.front() {
            // A negative age (clock moved backwards) counts as fresh.
            let expired = (now - oldest.timestamp)
                .to_std()
                .map(|age| age > self.window)
                .unwrap_or(false);
            if !expired {
                break;
            }
            self.entries.pop_front();
        }

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Returns an owned copy of the current contents, oldest first.
    ///
    /// The copy is independent of the buffer: later appends never change it.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
