//! Event-channel sessions
//!
//! One `Session` per WebSocket connection. On connect it registers with the
//! hub, which queues the welcome and a full snapshot for that client ahead
//! of any broadcast.
//! After disconnect it is removed from the hub and ignores further input.

use crate::hub::{ClientId, Outbound};
use crate::protocol::{
    rejection_message, ClientMessage, KillConfirmation, ServerMessage, Welcome,
};
use crate::state::{AppState, Surface};
use folkvang_core::KillReport;
use futures_util::{FutureExt, SinkExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

const WELCOME_MESSAGE: &str = "Connected to Folkvang Server";
const WRITER_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle of an event-channel connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

pub struct Session {
    id: ClientId,
    app: Arc<AppState>,
    state: ConnectionState,
}

impl Session {
    /// Register a new client with its welcome and initial snapshot already
    /// at the head of its queue
    pub async fn connect(app: Arc<AppState>) -> (Self, Outbound) {
        let (id, outbound) = app.hub.register_with(|id| greeting(&app, id)).await;
        let mut session = Self {
            id,
            app,
            state: ConnectionState::Connecting,
        };
        session.on_connected();
        (session, outbound)
    }

    fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        info!(client_id = %self.id, "client connected");
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Handle one inbound text frame
    pub async fn handle_text(&mut self, text: &str) {
        if self.state != ConnectionState::Connected {
            return;
        }
        match ClientMessage::parse(text) {
            Ok(message) => self.handle(message).await,
            Err(err) => {
                debug!(client_id = %self.id, error = %err, "unreadable client message");
                self.reply(ServerMessage::error(err.to_string())).await;
            }
        }
    }

    pub async fn handle(&mut self, message: ClientMessage) {
        if self.state != ConnectionState::Connected {
            return;
        }
        match message {
            ClientMessage::BossKill(report) => self.handle_kill(&report).await,
            ClientMessage::Ping => {
                self.reply(ServerMessage::pong(self.app.now())).await;
            }
            ClientMessage::GetState => {
                let snapshot = self.app.queries.state();
                self.reply(ServerMessage::StateUpdate(snapshot)).await;
            }
        }
    }

    // Everyone else gets the update; the reporter gets a confirmation instead.
    async fn handle_kill(&mut self, report: &KillReport) {
        match self.app.report_kill(report, Surface::WebSocket) {
            Ok(event) => {
                let update = ServerMessage::BossUpdate(event.clone());
                let delivered = self.app.hub.broadcast_except(self.id, &update).await;
                debug!(client_id = %self.id, delivered, "kill broadcast");
                let confirmation = KillConfirmation::accepted(event);
                self.reply(ServerMessage::KillConfirmed(confirmation)).await;
            }
            Err(err) => {
                let confirmation = KillConfirmation::rejected(rejection_message(&err));
                self.reply(ServerMessage::KillConfirmed(confirmation)).await;
            }
        }
    }

    async fn reply(&self, message: ServerMessage) {
        if !self.app.hub.send_to(self.id, message).await {
            debug!(client_id = %self.id, "reply dropped, client gone");
        }
    }

    /// Leave the hub. Idempotent.
    pub async fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.app.hub.unregister(self.id).await;
        self.state = ConnectionState::Disconnected;
        info!(client_id = %self.id, "client disconnected");
    }
}

fn greeting(app: &AppState, id: ClientId) -> Vec<ServerMessage> {
    let welcome = ServerMessage::Connected(Welcome {
        message: WELCOME_MESSAGE.to_string(),
        server_time: app.now(),
        client_id: id.to_string(),
    });
    vec![welcome, ServerMessage::InitialState(app.queries.state())]
}

/// Drive a WebSocket until the client goes away
pub async fn run<S>(socket: WebSocketStream<S>, app: Arc<AppState>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut stream) = socket.split();
    let (mut session, mut outbound) = Session::connect(app).await;
    let client_id = session.id();

    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!(%client_id, error = %e, "failed to encode message");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!(%client_id, error = %e, "send failed");
                break;
            }
        }
        if let Err(e) = sink.close().await {
            debug!(%client_id, error = %e, "close failed");
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let handled = AssertUnwindSafe(session.handle_text(&text))
                    .catch_unwind()
                    .await;
                if handled.is_err() {
                    error!(%client_id, "message handler panicked");
                    session.reply(ServerMessage::error("Internal server error")).await;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(%client_id, error = %e, "websocket read error");
                break;
            }
        }
    }

    // Leaving the hub drops the queue's sender, so the writer drains what
    // is left and closes the sink.
    session.disconnect().await;
    if timeout(WRITER_GRACE, &mut writer).await.is_err() {
        debug!(%client_id, "writer still busy, aborting");
        writer.abort();
    }
}
