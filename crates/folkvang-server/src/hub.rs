//! Connected-client registry and event fan-out
//!
//! Each WebSocket session registers here and gets a bounded receiver of
//! `ServerMessage`s. Broadcasts walk the registry and push a clone to every
//! sender, optionally skipping one client. A client whose queue is full is
//! considered stalled and evicted. Removing a client drops its sender, so
//! nothing more is queued for it.

use crate::protocol::ServerMessage;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

/// Messages a client may have waiting before it counts as stalled
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

/// Identity of one event-channel connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client:{}", self.0)
    }
}

/// Receiving end of a client's outbound queue
pub type Outbound = mpsc::Receiver<ServerMessage>;

/// Registry of connected clients
#[derive(Clone, Default)]
pub struct ClientHub {
    clients: Arc<RwLock<HashMap<ClientId, mpsc::Sender<ServerMessage>>>>,
    next_id: Arc<AtomicU64>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client and return its id plus the queue to drain
    pub async fn register(&self) -> (ClientId, Outbound) {
        self.register_with(|_| Vec::new()).await
    }

    /// Add a client whose queue starts with `greeting(id)`.
    ///
    /// The greeting is built and queued while the registry is write-locked,
    /// so no broadcast can land ahead of it.
    pub async fn register_with<F>(&self, greeting: F) -> (ClientId, Outbound)
    where
        F: FnOnce(ClientId) -> Vec<ServerMessage>,
    {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);

        let mut clients = self.clients.write().await;
        for message in greeting(id) {
            if tx.try_send(message).is_err() {
                warn!(client_id = %id, "greeting exceeds queue capacity, truncated");
                break;
            }
        }
        clients.insert(id, tx);
        (id, rx)
    }

    /// Remove a client. Returns whether it was registered.
    pub async fn unregister(&self, id: ClientId) -> bool {
        self.clients.write().await.remove(&id).is_some()
    }

    /// Queue a message for one client
    pub async fn send_to(&self, id: ClientId, message: ServerMessage) -> bool {
        let outcome = match self.clients.read().await.get(&id) {
            Some(tx) => tx.try_send(message),
            None => return false,
        };
        match outcome {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.evict(&[id]).await;
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Queue a message for every client. Returns how many accepted it.
    pub async fn broadcast(&self, message: &ServerMessage) -> usize {
        self.fan_out(message, None).await
    }

    /// Queue a message for every client except `exclude`
    pub async fn broadcast_except(&self, exclude: ClientId, message: &ServerMessage) -> usize {
        self.fan_out(message, Some(exclude)).await
    }

    async fn fan_out(&self, message: &ServerMessage, exclude: Option<ClientId>) -> usize {
        let mut delivered = 0;
        let mut stalled = Vec::new();
        {
            let clients = self.clients.read().await;
            for (id, tx) in clients.iter().filter(|(id, _)| Some(**id) != exclude) {
                match tx.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => stalled.push(*id),
                    Err(TrySendError::Closed(_)) => {}
                }
            }
        }
        self.evict(&stalled).await;
        delivered
    }

    async fn evict(&self, stalled: &[ClientId]) {
        if stalled.is_empty() {
            return;
        }
        let mut clients = self.clients.write().await;
        for id in stalled {
            if clients.remove(id).is_some() {
                warn!(client_id = %id, "outbound queue full, dropping client");
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    pub async fn contains(&self, id: ClientId) -> bool {
        self.clients.read().await.contains_key(&id)
    }
}

impl fmt::Debug for ClientHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHub")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
