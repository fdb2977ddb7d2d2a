//! Slot identity: the fixed floor and boss-type enumeration
//!
//! A slot is one `(floor, boss_type)` pair. There are exactly
//! `FLOOR_COUNT * BossType::ALL.len()` slots and the set never changes.
//! Every floor hosts the same four boss types, so boss validity is checked
//! against the global set rather than per floor.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of dungeon floors
pub const FLOOR_COUNT: u8 = 4;

/// Advisory cooldown after a kill, in minutes
pub const RESPAWN_MINUTES: u32 = 120;

/// A dungeon floor, numbered `1..=FLOOR_COUNT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Floor(u8);

impl Floor {
    /// Create a floor from its number, if it is in range
    pub fn new(number: u8) -> Option<Self> {
        (1..=FLOOR_COUNT).contains(&number).then_some(Self(number))
    }

    /// All floors in ascending order
    pub fn all() -> impl Iterator<Item = Floor> {
        (1..=FLOOR_COUNT).map(Floor)
    }

    /// The floor number (1-based)
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Zero-based index into per-floor storage
    pub(crate) fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Key used in state snapshots, e.g. `floor1`
    pub fn key(&self) -> String {
        format!("floor{}", self.0)
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Floor {
    type Error = String;

    fn try_from(number: u8) -> std::result::Result<Self, Self::Error> {
        Floor::new(number).ok_or_else(|| format!("floor {} out of range", number))
    }
}

impl From<Floor> for u8 {
    fn from(floor: Floor) -> Self {
        floor.0
    }
}

/// Boss type present on every floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BossType {
    Mage,
    Healer,
    Spearman,
    Berserk,
}

impl BossType {
    /// All boss types in snapshot order
    pub const ALL: [BossType; 4] = [
        BossType::Mage,
        BossType::Healer,
        BossType::Spearman,
        BossType::Berserk,
    ];

    /// Wire name of the boss type
    pub fn as_str(&self) -> &'static str {
        match self {
            BossType::Mage => "mage",
            BossType::Healer => "healer",
            BossType::Spearman => "spearman",
            BossType::Berserk => "berserk",
        }
    }
}

impl fmt::Display for BossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BossType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        BossType::ALL
            .into_iter()
            .find(|boss| boss.as_str() == s)
            .ok_or(())
    }
}

/// One tracked `(floor, boss_type)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub floor: Floor,
    pub boss: BossType,
}

impl SlotKey {
    pub fn new(floor: Floor, boss: BossType) -> Self {
        Self { floor, boss }
    }

    /// Resolve raw report values to a slot.
    ///
    /// Fails with `InvalidSlot` when the floor is outside `1..=FLOOR_COUNT`
    /// or the boss name is not one of the four known types.
    pub fn resolve(floor: i64, boss: &str) -> Result<Self> {
        let invalid = || Error::InvalidSlot {
            floor,
            boss: boss.to_string(),
        };
        let floor = u8::try_from(floor)
            .ok()
            .and_then(Floor::new)
            .ok_or_else(invalid)?;
        let boss = boss.parse::<BossType>().map_err(|_| invalid())?;
        Ok(Self { floor, boss })
    }

    /// All sixteen slots, floor-major
    pub fn all() -> impl Iterator<Item = SlotKey> {
        Floor::all().flat_map(|floor| {
            BossType::ALL
                .into_iter()
                .map(move |boss| SlotKey { floor, boss })
        })
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.floor.key(), self.boss)
    }
}
