//! The outbound half of a tool round-trip, decoupled from the not-yet-built
//! connection layer so `ToolExecutor` never depends on it directly.

use ab_protocol::frame::OutboundFrame;

/// Delivers a frame to a specific client's live connection. Implemented by
/// the gateway's client link; fire-and-forget from the tool executor's
/// point of view — delivery failure surfaces later as a pending-call
/// timeout or cancellation, not as a return value here.
pub trait OutboundSink: Send + Sync {
    fn send(&self, client_id: &str, frame: OutboundFrame);
}
