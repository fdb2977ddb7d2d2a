//! State shared by every connection

use crate::config::Config;
use crate::hub::ClientHub;
use crate::protocol::ServerMessage;
use chrono::{DateTime, Utc};
use folkvang_core::{BossStore, KillEvent, KillRecorder, KillReport, QueryService};
use std::sync::Arc;
use tracing::{info, warn};

/// Why an admin reset was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetError {
    Unauthorized,
    Failed,
}

/// Which surface a request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Http,
    WebSocket,
}

impl Surface {
    /// Player name recorded when a report carries none
    pub fn default_player(&self) -> &'static str {
        match self {
            Surface::Http => "Player",
            Surface::WebSocket => "Unknown",
        }
    }
}

/// Server state shared across all connections
pub struct AppState {
    pub config: Config,
    pub store: Arc<BossStore>,
    pub recorder: KillRecorder,
    pub queries: QueryService,
    pub hub: ClientHub,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Arc::new(BossStore::new()))
    }

    pub fn with_store(config: Config, store: Arc<BossStore>) -> Self {
        Self {
            config,
            recorder: KillRecorder::new(store.clone()),
            queries: QueryService::new(store.clone()),
            store,
            hub: ClientHub::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.store.clock().now()
    }

    /// Validate and record a kill. Fan-out is left to the caller, since
    /// the two surfaces address different audiences.
    pub fn report_kill(
        &self,
        report: &KillReport,
        surface: Surface,
    ) -> folkvang_core::Result<KillEvent> {
        match self.recorder.record(report, surface.default_player()) {
            Ok(event) => {
                info!(
                    player = %event.player,
                    floor = %event.floor,
                    boss = %event.boss,
                    ?surface,
                    "boss kill recorded"
                );
                Ok(event)
            }
            Err(err) => {
                warn!(error = %err, ?surface, "kill report rejected");
                Err(err)
            }
        }
    }

    /// Reset every slot if `credential` matches the admin token, then
    /// notify all event-channel clients
    pub async fn reset_all(&self, credential: Option<&str>) -> Result<(), ResetError> {
        if credential != Some(self.config.admin_token.as_str()) {
            warn!("reset refused: bad credential");
            return Err(ResetError::Unauthorized);
        }
        if !self.store.reset_all() {
            return Err(ResetError::Failed);
        }
        let notified = self.hub.broadcast(&ServerMessage::reset_all()).await;
        info!(notified, "all bosses reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppState {
        AppState::new(Config {
            admin_token: "letmein".to_string(),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_reset_requires_exact_token() {
        let app = app();
        app.report_kill(&KillReport::new(1, "mage"), Surface::Http)
            .unwrap();
        let (_id, mut rx) = app.hub.register().await;

        for bad in [None, Some(""), Some("letmein "), Some("LETMEIN")] {
            assert_eq!(app.reset_all(bad).await, Err(ResetError::Unauthorized));
        }
        assert_eq!(app.store.snapshot().dead_count(), 1);
        assert!(rx.try_recv().is_err());

        assert_eq!(app.reset_all(Some("letmein")).await, Ok(()));
        assert_eq!(app.store.snapshot().dead_count(), 0);
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::reset_all());
    }

    #[test]
    fn test_default_player_per_surface() {
        let app = app();
        let http = app
            .report_kill(&KillReport::new(1, "mage"), Surface::Http)
            .unwrap();
        let ws = app
            .report_kill(&KillReport::new(1, "healer"), Surface::WebSocket)
            .unwrap();
        assert_eq!(http.player, "Player");
        assert_eq!(ws.player, "Unknown");
    }
}
