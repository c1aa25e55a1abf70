//! RequestIngress (C8): the thin entry point for a `chat_request` frame.
//!
//! Validate, resolve the session, spawn `run_turn` as a detached task, and
//! return immediately so the connection's reader loop stays free to keep
//! servicing the `roll_result`/`combat_state` frames the spawned turn is
//! waiting on.

use std::sync::Arc;

use ab_domain::conversation::ConversationMessage;
use ab_protocol::frame::{ChatRequestData, EncounterState};
use serde_json::Value;

use crate::state::AppState;
use crate::turn::{run_turn, TurnParams};

pub async fn handle_chat_request(state: Arc<AppState>, client_id: String, data: ChatRequestData) {
    merge_inbound_messages(&state, &client_id, &data.messages);

    if let Some(combat) = &data.combat_state {
        let encounter_id = combat.combat_id.clone().unwrap_or_else(|| "active".into());
        state.collector.upsert_encounter(
            &client_id,
            EncounterState {
                encounter_id,
                is_active: combat.in_combat,
                round: combat.round,
                turn: combat.turn,
                combatants: combat.combatants.clone(),
                last_updated: now_ms(),
            },
        );
    }

    let settings = state.settings.read().clone();
    let in_combat = data.combat_state.as_ref().map(|c| c.in_combat).unwrap_or_else(|| {
        state.collector.get_all_encounters(&client_id).iter().any(|e| e.is_active)
    });
    let family = settings.resolve_family(in_combat).clone();

    let session_id = state.sessions.get_or_create(&client_id, &family.provider, &family.model, None);

    let is_first_turn = state.sessions.history(&session_id, None).map(|h| h.is_empty()).unwrap_or(true);
    if is_first_turn {
        let system_prompt = build_system_prompt(&settings.ai_role, &state, &client_id);
        if let Err(e) = state.sessions.append(&session_id, ConversationMessage::system(system_prompt)) {
            tracing::warn!(session_id = %session_id, error = %e, "failed to seed system message");
            return;
        }
    }

    tokio::spawn(run_turn(
        state.clone(),
        TurnParams { client_id, session_id, family, ai_role: settings.ai_role },
    ));
}

/// Append inbound messages the frontend attached to the request itself,
/// skipping anything already older than what the session has incorporated.
fn merge_inbound_messages(state: &Arc<AppState>, client_id: &str, messages: &Option<Vec<Value>>) {
    let Some(messages) = messages else { return };
    for msg in messages {
        let timestamp = msg.get("timestamp").and_then(Value::as_i64);
        let content = msg.get("content").and_then(Value::as_str).unwrap_or_default();
        let speaker = msg.get("speaker").and_then(Value::as_str);
        state.collector.append_chat(
            client_id,
            ab_collector::NewEntry {
                kind: ab_collector::EntryKind::Chat,
                payload: serde_json::json!({ "content": content, "speaker": speaker }),
                timestamp,
            },
            now_ms(),
        );
    }
}

fn build_system_prompt(ai_role: &str, state: &Arc<AppState>, client_id: &str) -> String {
    let world = state.collector.get_world(client_id);
    let mut prompt = ai_role.to_string();
    prompt.push_str(
        "\n\nConversation history arrives as compact JSON events (t=\"cm\" chat, \"dr\" dice roll, \
         \"cd\" chat card, \"combat_context\" combat state). Use tools to act on the table.",
    );
    if let Some(world) = world {
        if !world.active_scene.is_null() {
            prompt.push_str(&format!("\n\nCurrent scene: {}", world.active_scene));
        }
    }
    prompt
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}
