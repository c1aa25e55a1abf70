//! Shared application state passed to the connection handler and the turn
//! orchestrator. Grouped by concern (core services, session management,
//! per-client state, settings) since this system has a single channel (the
//! VTT link) and no admin/skills/run surface to carry alongside it.

use std::sync::Arc;

use ab_collector::MessageCollector;
use ab_domain::conversation::ToolDefinition;
use ab_domain::{Config, Settings};
use ab_pending::PendingCallRegistry;
use ab_providers::ProviderGateway;
use ab_sessions::SessionStore;
use ab_tools::ToolExecutor;
use parking_lot::RwLock;

use crate::clients::ClientRegistry;
use crate::session_lock::SessionLockMap;

/// Shared application state, cloned (cheaply, via `Arc` fields) into every
/// connection task.
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub providers: Arc<ProviderGateway>,
    pub tool_definitions: Arc<Vec<ToolDefinition>>,

    // ── Session management ────────────────────────────────────────────
    pub sessions: Arc<SessionStore>,
    pub session_locks: Arc<SessionLockMap>,

    // ── Per-client state ──────────────────────────────────────────────
    pub collector: Arc<MessageCollector>,
    pub pending: Arc<PendingCallRegistry>,
    pub tools: Arc<ToolExecutor>,
    pub clients: Arc<ClientRegistry>,

    // ── Settings (synced at runtime, not loaded from disk) ────────────
    pub settings: Arc<RwLock<Settings>>,
}
