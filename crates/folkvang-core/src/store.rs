//! The boss state store
//!
//! Owns the slot map and the kill history behind a single mutex. Every
//! operation, read or write, takes the lock for its whole duration, so a
//! kill is applied to both the slot map and the history before anyone else
//! can observe either.

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::history::KillHistory;
use crate::record::{HistoryEntry, KillRecord};
use crate::slot::SlotKey;
use crate::snapshot::BossState;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    state: BossState,
    history: KillHistory,
}

/// Shared tracker state
pub struct BossStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl BossStore {
    /// Create a store backed by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store with a custom time source
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    // Poisoning is recovered: all allocation for a kill happens before the
    // first write, so `Inner` is never left half-updated.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark every slot alive and drop the history
    pub fn initialize(&self) {
        let mut inner = self.lock();
        *inner = Inner::default();
    }

    /// Record a kill for a raw `(floor, boss)` pair.
    ///
    /// Overwrites any existing record for the slot, even if the boss is
    /// still on cooldown. Returns the record that was written.
    pub fn record_kill(&self, floor: i64, boss: &str, player: &str) -> Result<KillRecord> {
        let slot = SlotKey::resolve(floor, boss)?;
        Ok(self.record_slot_kill(slot, player))
    }

    /// Record a kill for an already-resolved slot
    pub fn record_slot_kill(&self, slot: SlotKey, player: &str) -> KillRecord {
        let mut inner = self.lock();
        let record = KillRecord::new(self.clock.now(), player);
        let entry = HistoryEntry::new(slot, &record);
        let stored = record.clone();
        inner.history.push(entry);
        inner.state.set(slot, stored);
        record
    }

    /// Independent copy of every slot
    pub fn snapshot(&self) -> BossState {
        self.lock().state.clone()
    }

    /// Kills from the last `window_hours` hours, newest first.
    ///
    /// A window reaching past the earliest representable time covers the
    /// whole history.
    pub fn recent_kills(&self, window_hours: u32) -> Vec<HistoryEntry> {
        let now = self.clock.now();
        let cutoff = Duration::try_hours(i64::from(window_hours))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.lock().history.since(cutoff, now)
    }

    /// Re-initialize all state. Always succeeds.
    pub fn reset_all(&self) -> bool {
        self.initialize();
        true
    }

    /// Number of entries currently held in the history
    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Full history, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for BossStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BossStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("BossStore")
            .field("dead", &inner.state.dead_count())
            .field("history", &inner.history.len())
            .finish()
    }
}
