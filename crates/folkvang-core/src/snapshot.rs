//! Slot state and its serialized snapshot shape
//!
//! Serializes as `{"floor1": {"mage": null, "healer": {...}, ...}, ...}`
//! with every floor and boss key always present.

use crate::record::KillRecord;
use crate::slot::{BossType, Floor, SlotKey, FLOOR_COUNT};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Kill records for the four bosses of one floor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorState {
    pub mage: Option<KillRecord>,
    pub healer: Option<KillRecord>,
    pub spearman: Option<KillRecord>,
    pub berserk: Option<KillRecord>,
}

impl FloorState {
    pub fn get(&self, boss: BossType) -> Option<&KillRecord> {
        match boss {
            BossType::Mage => self.mage.as_ref(),
            BossType::Healer => self.healer.as_ref(),
            BossType::Spearman => self.spearman.as_ref(),
            BossType::Berserk => self.berserk.as_ref(),
        }
    }

    fn slot_mut(&mut self, boss: BossType) -> &mut Option<KillRecord> {
        match boss {
            BossType::Mage => &mut self.mage,
            BossType::Healer => &mut self.healer,
            BossType::Spearman => &mut self.spearman,
            BossType::Berserk => &mut self.berserk,
        }
    }
}

/// State of all sixteen slots
///
/// Returned by value from the store, so callers own an independent copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BossState {
    floors: [FloorState; FLOOR_COUNT as usize],
}

impl BossState {
    /// All slots alive
    pub fn new() -> Self {
        Self::default()
    }

    pub fn floor(&self, floor: Floor) -> &FloorState {
        &self.floors[floor.index()]
    }

    pub fn get(&self, slot: SlotKey) -> Option<&KillRecord> {
        self.floor(slot.floor).get(slot.boss)
    }

    /// Overwrite the record for a slot, returning the previous one
    pub(crate) fn set(&mut self, slot: SlotKey, record: KillRecord) -> Option<KillRecord> {
        self.floors[slot.floor.index()]
            .slot_mut(slot.boss)
            .replace(record)
    }

    /// Slots currently on cooldown
    pub fn dead_count(&self) -> usize {
        SlotKey::all().filter(|slot| self.get(*slot).is_some()).count()
    }

    /// Iterate `(floor, state)` pairs in floor order
    pub fn floors(&self) -> impl Iterator<Item = (Floor, &FloorState)> {
        Floor::all().map(move |floor| (floor, self.floor(floor)))
    }
}

impl Serialize for BossState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.floors.len()))?;
        for (floor, state) in self.floors() {
            map.serialize_entry(&floor.key(), state)?;
        }
        map.end()
    }
}
