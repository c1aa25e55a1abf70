//! Rendezvous point for frontend-invoking tool calls (PendingCallRegistry).
//!
//! A caller registers a pending call and gets back a handle it can await
//! with a timeout; whichever of (resolve, reject, timeout) happens first
//! wins, and the others are no-ops. Generalized from a per-node router to
//! per-client routing so a connection teardown can drain every call that
//! client is waiting on.

use std::collections::HashMap;
use std::time::Duration;

use ab_domain::Error;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

/// What kind of inbound frame a pending call is waiting to be resolved by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitedType {
    DiceResult,
    CombatState,
    ActorSheet,
    AttributeModAck,
}

impl AwaitedType {
    fn label(self) -> &'static str {
        match self {
            Self::DiceResult => "dice_result",
            Self::CombatState => "combat_state",
            Self::ActorSheet => "actor_sheet",
            Self::AttributeModAck => "attribute_mod_ack",
        }
    }
}

type Outcome = Result<Value, String>;

struct PendingEntry {
    client_id: String,
    awaited_type: AwaitedType,
    tx: oneshot::Sender<Outcome>,
}

/// A handle returned by `register`, awaited (with a timeout) by the caller.
pub struct PendingHandle {
    request_id: Uuid,
    awaited_type: AwaitedType,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Wait for resolution, surfacing expiry as `Error::Timeout` rather than
    /// panicking the caller — the tool handler decides what a timeout means.
    pub async fn await_with_timeout(self, timeout: Duration) -> Result<Value, Error> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(Error::ProviderError {
                provider: self.awaited_type.label().into(),
                message,
            }),
            Ok(Err(_)) => Err(Error::Transport(format!(
                "pending call {} dropped before resolving",
                self.request_id
            ))),
            Err(_) => Err(Error::Timeout(format!(
                "{} timed out after {:?}",
                self.awaited_type.label(),
                timeout
            ))),
        }
    }
}

/// Registry of in-flight pending calls, keyed by request_id.
#[derive(Default)]
pub struct PendingCallRegistry {
    entries: Mutex<HashMap<Uuid, PendingEntry>>,
}

impl PendingCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a request_id, store the entry, and return an awaitable handle.
    pub fn register(&self, client_id: impl Into<String>, awaited_type: AwaitedType) -> PendingHandle {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        let prev = self.entries.lock().insert(
            request_id,
            PendingEntry {
                client_id: client_id.into(),
                awaited_type,
                tx,
            },
        );
        debug_assert!(prev.is_none(), "request_id collision: {request_id}");
        PendingHandle {
            request_id,
            awaited_type,
            rx,
        }
    }

    /// Fulfill a pending call. No-op (with a debug record) if the entry is
    /// gone — already resolved, rejected, cancelled, or timed out.
    pub fn resolve(&self, request_id: Uuid, result: Value) {
        match self.entries.lock().remove(&request_id) {
            Some(entry) => {
                let _ = entry.tx.send(Ok(result));
            }
            None => {
                tracing::debug!(request_id = %request_id, "late resolve for unknown pending call");
            }
        }
    }

    /// Symmetric fail path.
    pub fn reject(&self, request_id: Uuid, message: impl Into<String>) {
        match self.entries.lock().remove(&request_id) {
            Some(entry) => {
                let _ = entry.tx.send(Err(message.into()));
            }
            None => {
                tracing::debug!(request_id = %request_id, "late reject for unknown pending call");
            }
        }
    }

    /// Remove a pending call without resolving it (link teardown of a
    /// single call, the receiver is simply dropped).
    pub fn cancel(&self, request_id: Uuid) {
        self.entries.lock().remove(&request_id);
    }

    /// Remove and fail every pending call bound to a client at once.
    /// Returns the count cancelled.
    pub fn cancel_for_client(&self, client_id: &str) -> usize {
        let mut entries = self.entries.lock();
        let ids: Vec<Uuid> = entries
            .iter()
            .filter(|(_, e)| e.client_id == client_id)
            .map(|(id, _)| *id)
            .collect();
        let count = ids.len();
        for id in ids {
            if let Some(entry) = entries.remove(&id) {
                let _ = entry.tx.send(Err(format!("client {client_id} disconnected")));
            }
        }
        if count > 0 {
            tracing::warn!(client_id = %client_id, cancelled = count, "drained pending calls on disconnect");
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_wakes_waiter() {
        let registry = PendingCallRegistry::new();
        let handle = registry.register("client-1", AwaitedType::DiceResult);
        let request_id = handle.request_id();

        registry.resolve(request_id, serde_json::json!({"total": 14}));

        let result = handle.await_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(result, serde_json::json!({"total": 14}));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn reject_surfaces_as_provider_error() {
        let registry = PendingCallRegistry::new();
        let handle = registry.register("client-1", AwaitedType::ActorSheet);
        registry.reject(handle.request_id(), "token not found");

        let err = handle.await_with_timeout(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, Error::ProviderError { .. }));
    }

    #[tokio::test]
    async fn unresolved_call_times_out() {
        let registry = PendingCallRegistry::new();
        let handle = registry.register("client-1", AwaitedType::CombatState);

        let err = handle.await_with_timeout(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn late_resolve_after_cancel_is_noop() {
        let registry = PendingCallRegistry::new();
        let handle = registry.register("client-1", AwaitedType::DiceResult);
        let request_id = handle.request_id();

        registry.cancel(request_id);
        // The entry is gone; a late resolve from a racing frame must not panic.
        registry.resolve(request_id, serde_json::json!(null));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancel_for_client_drains_only_that_client() {
        let registry = PendingCallRegistry::new();
        let h1 = registry.register("client-1", AwaitedType::DiceResult);
        let h2 = registry.register("client-1", AwaitedType::CombatState);
        let h3 = registry.register("client-2", AwaitedType::ActorSheet);

        let cancelled = registry.cancel_for_client("client-1");
        assert_eq!(cancelled, 2);
        assert_eq!(registry.pending_count(), 1);

        assert!(h1.await_with_timeout(Duration::from_millis(10)).await.is_err());
        assert!(h2.await_with_timeout(Duration::from_millis(10)).await.is_err());

        registry.resolve(h3.request_id(), serde_json::json!({"ok": true}));
        assert!(h3.await_with_timeout(Duration::from_millis(10)).await.is_ok());
    }

    #[tokio::test]
    async fn exactly_once_completion_resolve_then_reject_is_noop() {
        let registry = PendingCallRegistry::new();
        let handle = registry.register("client-1", AwaitedType::DiceResult);
        let request_id = handle.request_id();

        registry.resolve(request_id, serde_json::json!(1));
        // Entry already removed; this must not resurrect or overwrite it.
        registry.reject(request_id, "too late");

        let result = handle.await_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(result, serde_json::json!(1));
    }
}
