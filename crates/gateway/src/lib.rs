//! The gateway binary's library half: ClientLink (C7), RequestIngress (C8),
//! and TurnOrchestrator (C6), plus the connection-scoped bookkeeping they
//! share. Split into a lib so `main.rs` and the integration tests can both
//! reach `AppState` and the axum router by path.

pub mod clients;
pub mod ingress;
pub mod link;
pub mod session_lock;
pub mod state;
pub mod turn;
