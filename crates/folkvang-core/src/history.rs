//! Bounded kill history
//!
//! Entries are kept in insertion order, which is chronological order since
//! every kill is timestamped at insertion. Once the buffer is full, pushing
//! a new entry evicts the oldest one.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use folkvang_core::{HistoryEntry, KillHistory, KillRecord, SlotKey};
//!
//! let mut history = KillHistory::with_capacity(2);
//! let now = Utc::now();
//! for (i, player) in ["a", "b", "c"].into_iter().enumerate() {
//!     let record = KillRecord::new(now + Duration::seconds(i as i64), player);
//!     history.push(HistoryEntry::new(SlotKey::resolve(1, "mage").unwrap(), &record));
//! }
//!
//! // "a" was evicted
//! let players: Vec<_> = history.iter().map(|e| e.player.as_str()).collect();
//! assert_eq!(players, ["b", "c"]);
//! ```

use crate::record::HistoryEntry;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Maximum number of kills retained
pub const HISTORY_CAPACITY: usize = 100;

/// FIFO-evicting log of recent kills
#[derive(Debug, Clone)]
pub struct KillHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl KillHistory {
    /// Create a history holding `HISTORY_CAPACITY` entries
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create a history with a custom bound
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, discarding the oldest ones beyond capacity
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries with `cutoff <= kill_time <= now`, newest first.
    ///
    /// Scans backward from the newest entry and stops at the first one older
    /// than the cutoff.
    pub fn since(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .take_while(|entry| entry.kill_time >= cutoff)
            .filter(|entry| entry.kill_time <= now)
            .cloned()
            .collect()
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for KillHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::KillRecord;
    use crate::slot::SlotKey;
    use chrono::{Duration, TimeZone};

    fn entry_at(t: DateTime<Utc>, player: &str) -> HistoryEntry {
        let slot = SlotKey::resolve(1, "mage").unwrap();
        HistoryEntry::new(slot, &KillRecord::new(t, player))
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_capacity() {
        let history = KillHistory::new();
        assert_eq!(history.capacity(), 100);
        assert!(history.is_empty());
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut history = KillHistory::new();
        for i in 0..150 {
            history.push(entry_at(base() + Duration::seconds(i), &format!("p{}", i)));
        }

        assert_eq!(history.len(), 100);
        let players: Vec<_> = history.iter().map(|e| e.player.clone()).collect();
        let expected: Vec<_> = (50..150).map(|i| format!("p{}", i)).collect();
        assert_eq!(players, expected);
        assert_eq!(history.newest().map(|e| e.player.as_str()), Some("p149"));
    }

    #[test]
    fn test_since_is_newest_first_and_inclusive() {
        let mut history = KillHistory::new();
        history.push(entry_at(base(), "old"));
        history.push(entry_at(base() + Duration::hours(1), "edge"));
        history.push(entry_at(base() + Duration::hours(2), "fresh"));

        let now = base() + Duration::hours(3);
        let recent = history.since(now - Duration::hours(2), now);
        let players: Vec<_> = recent.iter().map(|e| e.player.as_str()).collect();
        assert_eq!(players, ["fresh", "edge"]);
    }

    #[test]
    fn test_since_excludes_future_entries() {
        let mut history = KillHistory::new();
        history.push(entry_at(base(), "now"));
        history.push(entry_at(base() + Duration::minutes(5), "later"));

        let recent = history.since(base() - Duration::hours(1), base());
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].player, "now");
    }

    #[test]
    fn test_clear() {
        let mut history = KillHistory::with_capacity(3);
        history.push(entry_at(base(), "a"));
        history.clear();
        assert!(history.is_empty());
        assert!(history.newest().is_none());
    }
}
