use serde::Serialize;

/// Structured trace events emitted across the gateway. These are internal
/// observability, not the wire protocol — see `ab_protocol` for that.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        client_id: String,
        session_id: String,
        is_new: bool,
    },
    SessionEvicted {
        session_id: String,
        idle_minutes: u64,
    },
    LlmRequest {
        provider: String,
        model: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ToolDispatched {
        tool_name: String,
        call_id: String,
        client_id: String,
    },
    PendingCallTimedOut {
        request_id: String,
        awaited_type: String,
    },
    PendingCallLateResolve {
        request_id: String,
    },
    TurnStepBudgetReached {
        session_id: String,
        iterations: u32,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ab_event");
    }
}
