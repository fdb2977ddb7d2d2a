//! Folkvang Core - Boss respawn tracking state
//!
//! This crate holds everything the tracker knows, independent of how clients
//! reach it:
//! - Slot identity (`Floor`, `BossType`, `SlotKey`): four floors, four bosses
//! - `BossStore`: slot map plus bounded kill history behind one lock
//! - `KillRecorder`: validates a `KillReport` and produces a `KillEvent`
//! - `QueryService`: snapshot and recent-kill projections
//! - `Clock`: time source, swappable for `ManualClock` in tests
//!
//! ## Example
//!
//! ```rust
//! use folkvang_core::{BossStore, KillRecorder, KillReport, QueryService};
//! use std::sync::Arc;
//!
//! let store = Arc::new(BossStore::new());
//! let recorder = KillRecorder::new(store.clone());
//! let queries = QueryService::new(store);
//!
//! let event = recorder
//!     .record(&KillReport::new(1, "mage").with_player("Alice"), "Player")
//!     .unwrap();
//! assert_eq!(event.player, "Alice");
//! assert_eq!(queries.recent_kills(None).len(), 1);
//! ```

mod clock;
mod error;
mod history;
mod query;
mod record;
mod recorder;
mod slot;
mod snapshot;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use history::{KillHistory, HISTORY_CAPACITY};
pub use query::{QueryService, DEFAULT_WINDOW_HOURS};
pub use record::{HistoryEntry, KillRecord};
pub use recorder::{FloorInput, KillAction, KillEvent, KillRecorder, KillReport};
pub use slot::{BossType, Floor, SlotKey, FLOOR_COUNT, RESPAWN_MINUTES};
pub use snapshot::{BossState, FloorState};
pub use store::BossStore;
