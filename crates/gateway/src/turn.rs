//! TurnOrchestrator (C6): drives one chat request end to end.
//!
//! `AssembleContext → CallLLM → (DispatchToolCalls → CollectToolResults →
//! CallLLM)* → StoreFinal`. A `for loop_idx in 0..MAX_TOOL_LOOPS` body,
//! tool futures dispatched concurrently with `join_all` and appended back
//! in the original `tool_calls` order, the whole run wrapped in one
//! tracing span.

use std::sync::Arc;
use std::time::Duration;

use ab_domain::settings::LlmFamilySettings;
use ab_domain::conversation::ConversationMessage;
use ab_domain::error::Result;
use ab_domain::trace::TraceEvent;
use ab_protocol::compact::CompactEvent;
use ab_protocol::frame::{ChatResponseData, EncounterState, ErrorData, OutboundFrame};
use ab_providers::gateway::ChatConfig;
use ab_tools::OutboundSink;
use ab_collector::{EntryKind, LogEntry};
use futures_util::future::join_all;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::state::AppState;

/// Tool-call loop budget: a turn that's still calling tools after this many
/// rounds stops and returns a partial result instead of looping forever.
const MAX_TOOL_LOOPS: u32 = 10;

/// Everything a turn needs that isn't already reachable from `AppState`.
pub struct TurnParams {
    pub client_id: String,
    pub session_id: String,
    pub family: LlmFamilySettings,
    pub ai_role: String,
}

/// Entry point spawned (detached) by RequestIngress. Never propagates an
/// error to the caller — a failure becomes an `error` frame to the client.
pub async fn run_turn(state: Arc<AppState>, params: TurnParams) {
    let span = tracing::info_span!(
        "turn.run",
        session_id = %params.session_id,
        client_id = %params.client_id,
    );
    let client_id = params.client_id.clone();
    if let Err(e) = run_turn_inner(&state, params).instrument(span).await {
        tracing::warn!(client_id = %client_id, error = %e, "turn failed");
        state.clients.send(
            &client_id,
            OutboundFrame::Error { data: ErrorData { error: e.to_string(), timestamp: now_ms() } },
        );
    }
}

async fn run_turn_inner(state: &Arc<AppState>, params: TurnParams) -> Result<()> {
    let TurnParams { client_id, session_id, family, ai_role } = params;

    // Every turn on this session is a critical section: a concurrent
    // chat_request for the same session_id queues behind this permit
    // rather than racing it.
    let _permit = state.session_locks.acquire(&session_id).await;

    assemble_context(state, &client_id, &session_id, &ai_role).await?;

    let mut call = ChatConfig::new(family.provider.clone());
    call.model_id = Some(family.model.clone());
    call.temperature = 0.1;
    call.timeout_sec = family.timeout_sec;
    call.max_retries = family.max_retries;

    for loop_idx in 0..MAX_TOOL_LOOPS {
        let history = state.sessions.history(&session_id, None).unwrap_or_default();

        let llm_span = tracing::info_span!("llm.call", provider = %call.provider_id, model = ?call.model_id);
        let completion = state
            .providers
            .complete(&history, state.tool_definitions.as_slice(), &call)
            .instrument(llm_span)
            .await?;

        state.sessions.append(
            &session_id,
            ConversationMessage::assistant(completion.content.clone(), completion.tool_calls.clone()),
        )?;

        if completion.tool_calls.is_empty() {
            store_final(state, &session_id);
            state.clients.send(
                &client_id,
                OutboundFrame::ChatResponse {
                    data: ChatResponseData { message: json!({ "content": completion.content }) },
                },
            );
            return Ok(());
        }

        let tool_futures = completion.tool_calls.iter().map(|tc| {
            let tools = state.tools.clone();
            let client_id = client_id.clone();
            let name = tc.name.clone();
            let args = tc.arguments_json.clone();
            let span = tracing::info_span!("tool.call", tool_name = %name);
            async move { tools.dispatch(&name, args, &client_id).await }.instrument(span)
        });
        // join_all preserves input order in its output Vec even though the
        // futures race concurrently, so zipping against the original
        // tool_calls here reproduces "appended in tool_call.id order, not
        // completion order" for free.
        let tool_results = join_all(tool_futures).await;

        for (tc, result) in completion.tool_calls.iter().zip(tool_results.into_iter()) {
            TraceEvent::ToolDispatched {
                tool_name: tc.name.clone(),
                call_id: tc.id.clone(),
                client_id: client_id.clone(),
            }
            .emit();
            state.sessions.append(&session_id, ConversationMessage::tool(tc.id.clone(), result.to_string()))?;
        }

        if loop_idx == MAX_TOOL_LOOPS - 1 {
            TraceEvent::TurnStepBudgetReached { session_id: session_id.clone(), iterations: MAX_TOOL_LOOPS }.emit();
            store_final(state, &session_id);
            state.clients.send(
                &client_id,
                OutboundFrame::ChatResponse {
                    data: ChatResponseData {
                        message: json!({
                            "success": true,
                            "partial": true,
                            "reached_limit": true,
                            "iterations": MAX_TOOL_LOOPS,
                        }),
                    },
                },
            );
            return Ok(());
        }
    }

    Ok(())
}

/// Compose the turn's user message from the delta of events since the
/// session's last incorporated timestamp plus any fresh combat context, and
/// append it (and a dynamic instruction suffix) to the session.
async fn assemble_context(state: &Arc<AppState>, client_id: &str, session_id: &str, ai_role: &str) -> Result<()> {
    let since_ts = state.sessions.get_last_context_timestamp(session_id).unwrap_or(0);
    let entries = state.collector.since(client_id, since_ts);
    let mut events: Vec<CompactEvent> = entries.iter().filter_map(log_entry_to_compact).collect();

    let newest_ts = entries.iter().map(|e| e.timestamp).max();

    if let Some(combat) = state.collector.get_all_encounters(client_id).into_iter().find(|e| e.is_active) {
        events.push(CompactEvent::CombatContext { combat_context: encounter_json(&combat) });
    }

    let mut block = json!({ "events": events });
    // Folded into this turn's user content rather than rewritten into the
    // stored system message, so conversation history stays append-only and
    // a session never carries more than one system message.
    if let Some(delta) = state.collector.get_game_delta(client_id) {
        block["recent_changes"] = delta;
        state.collector.clear_game_delta(client_id);
    }

    let in_combat = events.iter().any(|e| matches!(e, CompactEvent::CombatContext { .. }));
    let mut content = block.to_string();
    content.push(' ');
    content.push_str(&instruction_suffix(ai_role, in_combat));

    let ts = newest_ts.unwrap_or_else(now_ms);
    state.sessions.append(session_id, ConversationMessage::user(content, ts))?;
    Ok(())
}

fn store_final(state: &Arc<AppState>, session_id: &str) {
    if let Some(history) = state.sessions.history(session_id, None) {
        if let Some(ConversationMessage::User { timestamp, .. }) =
            history.iter().rev().find(|m| matches!(m, ConversationMessage::User { .. }))
        {
            state.sessions.set_last_context_timestamp(session_id, *timestamp);
        }
    }
}

fn instruction_suffix(ai_role: &str, in_combat: bool) -> String {
    if in_combat {
        format!("{ai_role} Combat is active; keep turn order and resource changes precise.")
    } else {
        ai_role.to_string()
    }
}

fn encounter_json(e: &EncounterState) -> Value {
    json!({
        "encounter_id": e.encounter_id,
        "is_active": e.is_active,
        "round": e.round,
        "turn": e.turn,
        "combatants": e.combatants,
        "last_updated": e.last_updated,
    })
}

/// Mirrors `ToolExecutor`'s own `log_entry_to_compact`; kept local since
/// turn assembly and tool dispatch each need the conversion but neither
/// crate depends on the other.
fn log_entry_to_compact(entry: &LogEntry) -> Option<CompactEvent> {
    let p = &entry.payload;
    match entry.kind {
        EntryKind::Chat | EntryKind::Card => Some(CompactEvent::ChatMessage {
            ts: entry.timestamp,
            speaker: p.get("speaker").and_then(Value::as_str).map(str::to_string),
            alias: p.get("alias").and_then(Value::as_str).map(str::to_string),
            content: p.get("content").and_then(Value::as_str).unwrap_or_default().to_string(),
        }),
        EntryKind::DiceRoll => Some(CompactEvent::DiceRoll {
            ts: entry.timestamp,
            speaker: p.get("speaker").and_then(Value::as_str).map(str::to_string),
            alias: p.get("alias").and_then(Value::as_str).map(str::to_string),
            formula: p.get("formula").and_then(Value::as_str).unwrap_or_default().to_string(),
            total: p.get("total").and_then(Value::as_f64).unwrap_or(0.0),
            results: p
                .get("results")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default(),
            flavor: p.get("flavor").and_then(Value::as_str).unwrap_or_default().to_string(),
        }),
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_collector::{MessageCollector, NewEntry};
    use ab_domain::config::CollectorConfig;

    fn collector() -> MessageCollector {
        MessageCollector::new(CollectorConfig { item_cap: 100, retention_hours: 24 })
    }

    #[test]
    fn log_entry_to_compact_maps_chat_and_roll() {
        let c = collector();
        c.append_chat(
            "c1",
            NewEntry { kind: EntryKind::Chat, payload: json!({"content": "hi"}), timestamp: Some(10) },
            1000,
        );
        let entries = c.recent("c1", 10);
        let ev = log_entry_to_compact(&entries[0]).unwrap();
        assert!(matches!(ev, CompactEvent::ChatMessage { .. }));
    }

    #[test]
    fn instruction_suffix_mentions_combat_only_when_active() {
        assert!(!instruction_suffix("GM", false).contains("Combat"));
        assert!(instruction_suffix("GM", true).contains("Combat"));
    }
}
