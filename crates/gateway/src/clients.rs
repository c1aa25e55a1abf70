//! Registry of live connections (ClientLink, C7's bookkeeping half).
//!
//! Every outbound frame is addressed to one specific client_id, so the
//! registry is just a map from client_id to that connection's writer
//! channel, rather than a capability-based routing table.

use std::collections::HashMap;

use ab_protocol::frame::OutboundFrame;
use ab_tools::OutboundSink;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Channel a `ClientRegistry` uses to push frames to one connection's
/// writer task.
pub type ClientSink = mpsc::UnboundedSender<OutboundFrame>;

struct ConnectedClient {
    sink: ClientSink,
    connected_at: DateTime<Utc>,
}

/// Thread-safe registry of connected frontend clients, keyed by client_id.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, ConnectedClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, replacing any existing one with the same
    /// client_id (the `connect` handshake already rejects a literal
    /// duplicate before this is reached; this also covers a stale entry
    /// left behind by an ungraceful disconnect).
    pub fn register(&self, client_id: impl Into<String>, sink: ClientSink) {
        self.clients.write().insert(client_id.into(), ConnectedClient { sink, connected_at: Utc::now() });
    }

    pub fn remove(&self, client_id: &str) {
        self.clients.write().remove(client_id);
    }

    pub fn is_connected(&self, client_id: &str) -> bool {
        self.clients.read().contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl OutboundSink for ClientRegistry {
    /// Fire-and-forget: a dropped receiver (connection already gone) is
    /// swallowed here. The caller learns about it later, if it matters, as
    /// a PendingCall timeout or cancellation.
    fn send(&self, client_id: &str, frame: OutboundFrame) {
        if let Some(client) = self.clients.read().get(client_id) {
            if client.sink.send(frame).is_err() {
                tracing::debug!(client_id = %client_id, "dropped outbound frame: writer gone");
            }
        } else {
            tracing::debug!(client_id = %client_id, "dropped outbound frame: client not connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_send_delivers_to_channel() {
        let registry = ClientRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("c1", tx);

        registry.send("c1", OutboundFrame::Pong { timestamp: 1 });
        assert!(matches!(rx.try_recv().unwrap(), OutboundFrame::Pong { timestamp: 1 }));
    }

    #[test]
    fn send_to_unknown_client_is_a_noop() {
        let registry = ClientRegistry::new();
        registry.send("ghost", OutboundFrame::Pong { timestamp: 1 });
    }

    #[test]
    fn remove_drops_the_entry() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("c1", tx);
        assert!(registry.is_connected("c1"));
        registry.remove("c1");
        assert!(!registry.is_connected("c1"));
    }
}
