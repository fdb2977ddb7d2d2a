//! Kill reports: validation, recording, and the broadcast payload
//!
//! A `KillReport` is what a client sends, from either transport. The
//! `KillRecorder` checks it, writes it to the store, and hands back the
//! `KillEvent` the transport layer fans out. A rejected report produces an
//! error and touches nothing.

use crate::error::{Error, Result};
use crate::slot::{BossType, Floor, SlotKey, RESPAWN_MINUTES};
use crate::store::BossStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Floor as sent by a client: a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FloorInput {
    Number(i64),
    Text(String),
}

impl FloorInput {
    fn resolve(&self) -> Result<Option<i64>> {
        match self {
            FloorInput::Number(0) => Ok(None),
            FloorInput::Number(n) => Ok(Some(*n)),
            FloorInput::Text(s) if s.trim().is_empty() => Ok(None),
            FloorInput::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| Error::InvalidField {
                    field: "floor",
                    reason: format!("not an integer: {:?}", s),
                }),
        }
    }
}

impl From<i64> for FloorInput {
    fn from(n: i64) -> Self {
        FloorInput::Number(n)
    }
}

/// Inbound kill report
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KillReport {
    #[serde(default)]
    pub floor: Option<FloorInput>,
    #[serde(default)]
    pub boss: Option<String>,
    #[serde(default)]
    pub player: Option<String>,
}

impl KillReport {
    pub fn new(floor: impl Into<FloorInput>, boss: impl Into<String>) -> Self {
        Self {
            floor: Some(floor.into()),
            boss: Some(boss.into()),
            player: None,
        }
    }

    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    /// Check presence of the required fields and resolve the slot.
    ///
    /// A zero floor or empty boss counts as missing.
    pub fn slot(&self) -> Result<SlotKey> {
        let floor = match &self.floor {
            Some(input) => input.resolve()?,
            None => None,
        }
        .ok_or(Error::MissingField("floor"))?;
        let boss = self
            .boss
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or(Error::MissingField("boss"))?;
        SlotKey::resolve(floor, boss)
    }
}

/// Marker serialized as `"boss_killed"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KillAction {
    #[default]
    #[serde(rename = "boss_killed")]
    BossKilled,
}

/// Payload broadcast after a successful kill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillEvent {
    pub action: KillAction,
    pub floor: Floor,
    pub boss: BossType,
    pub player: String,
    pub kill_time: DateTime<Utc>,
    pub respawn_minutes: u32,
}

impl KillEvent {
    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.floor, self.boss)
    }
}

/// Bridges kill reports to the store
#[derive(Debug, Clone)]
pub struct KillRecorder {
    store: Arc<BossStore>,
}

impl KillRecorder {
    pub fn new(store: Arc<BossStore>) -> Self {
        Self { store }
    }

    /// Validate and record a report.
    ///
    /// `default_player` is used when the report carries no player name.
    /// On success exactly one kill has been written; on error, none.
    pub fn record(&self, report: &KillReport, default_player: &str) -> Result<KillEvent> {
        let slot = report.slot()?;
        let player = report
            .player
            .as_deref()
            .unwrap_or(default_player)
            .to_string();
        let record = self.store.record_slot_kill(slot, &player);

        Ok(KillEvent {
            action: KillAction::BossKilled,
            floor: slot.floor,
            boss: slot.boss,
            player,
            kill_time: record.kill_time,
            respawn_minutes: RESPAWN_MINUTES,
        })
    }

    pub fn store(&self) -> &Arc<BossStore> {
        &self.store
    }
}
