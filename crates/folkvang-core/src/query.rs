//! Read-only projections over the store

use crate::record::HistoryEntry;
use crate::snapshot::BossState;
use crate::store::BossStore;
use std::sync::Arc;

/// Window used by recent-kill queries when the caller gives none
pub const DEFAULT_WINDOW_HOURS: u32 = 2;

#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<BossStore>,
}

impl QueryService {
    pub fn new(store: Arc<BossStore>) -> Self {
        Self { store }
    }

    /// Full slot state
    pub fn state(&self) -> BossState {
        self.store.snapshot()
    }

    /// Kills within the window, newest first
    pub fn recent_kills(&self, window_hours: Option<u32>) -> Vec<HistoryEntry> {
        self.store
            .recent_kills(window_hours.unwrap_or(DEFAULT_WINDOW_HOURS))
    }
}
