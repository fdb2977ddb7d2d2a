//! Kill records and history entries

use crate::slot::{BossType, Floor, SlotKey, RESPAWN_MINUTES};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cooldown data attached to a slot after a kill.
///
/// A slot without a record means the boss is alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillRecord {
    pub kill_time: DateTime<Utc>,
    pub player: String,
    pub respawn_minutes: u32,
}

impl KillRecord {
    pub fn new(kill_time: DateTime<Utc>, player: impl Into<String>) -> Self {
        Self {
            kill_time,
            player: player.into(),
            respawn_minutes: RESPAWN_MINUTES,
        }
    }

    /// When the boss is expected back
    pub fn respawn_at(&self) -> DateTime<Utc> {
        self.kill_time + chrono::Duration::minutes(i64::from(self.respawn_minutes))
    }
}

/// Immutable log line appended on every successful kill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub floor: Floor,
    pub boss: BossType,
    pub player: String,
    pub kill_time: DateTime<Utc>,
    pub respawn: u32,
}

impl HistoryEntry {
    pub fn new(slot: SlotKey, record: &KillRecord) -> Self {
        Self {
            floor: slot.floor,
            boss: slot.boss,
            player: record.player.clone(),
            kill_time: record.kill_time,
            respawn: record.respawn_minutes,
        }
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.floor, self.boss)
    }
}
