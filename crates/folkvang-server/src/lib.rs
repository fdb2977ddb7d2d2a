//! Folkvang Server - HTTP and WebSocket front end for the boss tracker
//!
//! - `api`: JSON endpoints (`/health`, `/api/status`, `/api/kills`,
//!   `/api/kill`, `/api/reset`)
//! - `session`: per-connection WebSocket event channel
//! - `hub`: registry of connected clients and broadcast fan-out
//! - `server`: hyper accept loop, WebSocket upgrade, CORS
//!
//! State lives in [`folkvang_core`]; this crate only moves it over the wire.

pub mod api;
pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod session;
pub mod state;

pub use api::{dispatch, ApiRequest, ApiResponse};
pub use config::{Config, ConfigError};
pub use error::{Result, ServerError};
pub use hub::{ClientHub, ClientId};
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{ConnectionState, Session};
pub use state::{AppState, ResetError, Surface};
