//! `ToolExecutor` (C5): dispatches a fixed catalog of tool calls to the
//! frontend via a PendingCall round-trip, or answers directly from the
//! MessageCollector where no round-trip is needed.

use std::sync::Arc;
use std::time::Duration;

use ab_collector::{EntryKind, LogEntry, MessageCollector, NewEntry};
use ab_domain::config::ToolsConfig;
use ab_domain::error::Error;
use ab_pending::{AwaitedType, PendingCallRegistry};
use ab_protocol::compact::CompactEvent;
use ab_protocol::frame::{
    ChatResponseData, Combatant, EncounterOpData, EncounterState, ExecuteRollData,
    GetActorDetailsData, ModifyTokenAttributeData, OutboundFrame,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::sink::OutboundSink;

pub struct ToolExecutor {
    pending: Arc<PendingCallRegistry>,
    collector: Arc<MessageCollector>,
    sink: Arc<dyn OutboundSink>,
    config: ToolsConfig,
}

impl ToolExecutor {
    pub fn new(
        pending: Arc<PendingCallRegistry>,
        collector: Arc<MessageCollector>,
        sink: Arc<dyn OutboundSink>,
        config: ToolsConfig,
    ) -> Self {
        Self { pending, collector, sink, config }
    }

    /// Dispatch a single tool call by name. Always returns a JSON value
    /// suitable for a `role: tool` message; malformed input or a failed
    /// round-trip is reported as `{"success": false, "error": ...}` rather
    /// than surfaced as an `Err`, so the orchestrator never has to special-
    /// case a tool failure to keep the conversation well-formed.
    pub async fn dispatch(&self, name: &str, args: Value, client_id: &str) -> Value {
        match name {
            "get_message_history" => self.get_message_history(args, client_id),
            "post_message" => self.post_message(args, client_id),
            "roll_dice" => self.roll_dice(args, client_id).await,
            "get_encounter" => self.get_encounter(args, client_id).await,
            "create_encounter" => self.create_encounter(args, client_id).await,
            "delete_encounter" => self.delete_encounter(args, client_id).await,
            "activate_combat" => self.activate_combat(args, client_id).await,
            "advance_combat_turn" => self.advance_combat_turn(args, client_id).await,
            "get_actor_details" => self.get_actor_details(args, client_id).await,
            "modify_token_attribute" => self.modify_token_attribute(args, client_id).await,
            other => fail(format!("unknown tool: {other}")),
        }
    }

    // ── get_message_history ──────────────────────────────────────

    fn get_message_history(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct Args {
            count: u32,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { count }");
        };
        if args.count < 1 || args.count > self.config.max_history_count {
            return fail(format!("count must be between 1 and {}", self.config.max_history_count));
        }
        // Always reads the full window via `recent`, never `since` — delta
        // filtering is disabled for this tool so the model gets a
        // self-contained slice of history regardless of what the session
        // has already been fed.
        let entries = self.collector.recent(client_id, args.count as usize);
        let events: Vec<CompactEvent> = entries.iter().filter_map(log_entry_to_compact).collect();
        json!({ "success": true, "events": events })
    }

    // ── post_message ──────────────────────────────────────────────

    fn post_message(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct PostItem {
            content: String,
            #[serde(default, rename = "type")]
            kind: Option<String>,
            #[serde(default)]
            speaker: Option<String>,
            #[serde(default)]
            flavor: Option<String>,
            #[serde(default)]
            flags: Option<Value>,
            #[serde(default)]
            whisper: Option<Vec<String>>,
            #[serde(default)]
            compact_format: Option<bool>,
        }
        #[derive(Deserialize)]
        struct Args {
            messages: Vec<PostItem>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { messages: [...] }");
        };

        let mut results = Vec::with_capacity(args.messages.len());
        for (index, item) in args.messages.into_iter().enumerate() {
            let is_card = item.kind.as_deref() == Some("card");

            let message = json!({
                "content": item.content,
                "type": item.kind.clone().unwrap_or_else(|| "chat".to_string()),
                "speaker": item.speaker,
                "flavor": item.flavor,
                "flags": item.flags,
                "whisper": item.whisper,
                "compact_format": item.compact_format,
            });
            self.sink.send(client_id, OutboundFrame::ChatResponse { data: ChatResponseData { message } });

            // Record what was said so it reappears in future compact
            // history the same as a frontend-originated chat/card event.
            let entry = if is_card {
                NewEntry {
                    kind: EntryKind::Card,
                    payload: json!({
                        "name": item.speaker.clone().unwrap_or_else(|| "Game Master".to_string()),
                        "description": item.content,
                        "actions": item.flags.as_ref().and_then(|f| f.as_array().cloned()).unwrap_or_default(),
                    }),
                    timestamp: None,
                }
            } else {
                NewEntry {
                    kind: EntryKind::Chat,
                    payload: json!({
                        "speaker": item.speaker,
                        "alias": item.flavor,
                        "content": item.content,
                    }),
                    timestamp: None,
                }
            };
            self.collector.append_chat(client_id, entry, now_ms());

            results.push(json!({ "index": index, "success": true }));
        }

        json!({ "success": true, "results": results })
    }

    // ── roll_dice ─────────────────────────────────────────────────

    async fn roll_dice(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct RollItem {
            formula: String,
            #[serde(default)]
            flavor: Option<String>,
        }
        #[derive(Deserialize)]
        struct Args {
            rolls: Vec<RollItem>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { rolls: [...] }");
        };
        if args.rolls.is_empty() {
            return fail("rolls must contain at least one formula");
        }

        let rolls: Vec<Value> = args
            .rolls
            .iter()
            .map(|r| json!({ "formula": r.formula, "flavor": r.flavor }))
            .collect();

        let handle = self.pending.register(client_id, AwaitedType::DiceResult);
        let request_id = handle.request_id();
        self.sink.send(
            client_id,
            OutboundFrame::ExecuteRoll { request_id, data: ExecuteRollData { rolls } },
        );

        match handle.await_with_timeout(Duration::from_secs(self.config.roll_dice_timeout_secs)).await {
            Ok(result) => json!({ "success": true, "results": result }),
            Err(e) => fail(e.to_string()),
        }
    }

    // ── get_encounter ─────────────────────────────────────────────

    async fn get_encounter(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize, Default)]
        struct Args {
            #[serde(default)]
            encounter_id: Option<String>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { encounter_id? }");
        };

        let handle = self.pending.register(client_id, AwaitedType::CombatState);
        let request_id = handle.request_id();
        self.sink.send(
            client_id,
            OutboundFrame::CombatStateRefresh {
                request_id,
                data: json!({ "encounter_id": args.encounter_id }),
            },
        );

        match handle.await_with_timeout(Duration::from_secs(self.config.get_encounter_timeout_secs)).await {
            Ok(result) => json!({ "success": true, "source": "live", "data": result }),
            Err(Error::Timeout(_)) => {
                // Non-fatal: fall back to whatever the collector has cached.
                let cached = match &args.encounter_id {
                    Some(id) => self.collector.get_encounter(client_id, id).map(encounter_json),
                    None => Some(Value::Array(
                        self.collector.get_all_encounters(client_id).into_iter().map(encounter_json).collect(),
                    )),
                };
                json!({
                    "success": true,
                    "source": "cache",
                    "warning": "timed out waiting for a refresh; returning cached state",
                    "data": cached,
                })
            }
            Err(e) => fail(e.to_string()),
        }
    }

    // ── create_encounter ──────────────────────────────────────────

    async fn create_encounter(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct Args {
            actor_ids: Vec<String>,
            #[serde(default = "default_true")]
            roll_initiative: bool,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { actor_ids, roll_initiative? }");
        };
        if args.actor_ids.is_empty() {
            return fail("actor_ids must not be empty");
        }

        let handle = self.pending.register(client_id, AwaitedType::CombatState);
        let request_id = handle.request_id();
        self.sink.send(
            client_id,
            OutboundFrame::CreateEncounter {
                request_id,
                data: EncounterOpData {
                    encounter_id: None,
                    actor_ids: Some(args.actor_ids),
                    roll_initiative: Some(args.roll_initiative),
                },
            },
        );

        match handle.await_with_timeout(Duration::from_secs(self.config.combat_mutation_timeout_secs)).await {
            Ok(result) => merge_success(result),
            Err(Error::Timeout(_)) => {
                if self.collector.get_all_encounters(client_id).iter().any(|e| e.is_active) {
                    json!({
                        "success": true,
                        "warning": "no acknowledgement received, but an active encounter now exists",
                    })
                } else {
                    fail("timed out waiting for the encounter to be created, and none appeared")
                }
            }
            Err(e) => fail(e.to_string()),
        }
    }

    // ── delete_encounter ──────────────────────────────────────────

    async fn delete_encounter(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct Args {
            encounter_id: String,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { encounter_id }");
        };

        match self.collector.get_encounter(client_id, &args.encounter_id) {
            Some(enc) if enc.is_active => {}
            Some(_) => return fail("encounter exists but is not active"),
            None => return fail("encounter not found"),
        }

        let handle = self.pending.register(client_id, AwaitedType::CombatState);
        let request_id = handle.request_id();
        self.sink.send(
            client_id,
            OutboundFrame::DeleteEncounter {
                request_id,
                data: EncounterOpData {
                    encounter_id: Some(args.encounter_id.clone()),
                    actor_ids: None,
                    roll_initiative: None,
                },
            },
        );

        match handle.await_with_timeout(Duration::from_secs(self.config.combat_mutation_timeout_secs)).await {
            Ok(result) => merge_success(result),
            Err(Error::Timeout(_)) => {
                if self.collector.get_encounter(client_id, &args.encounter_id).is_none() {
                    json!({
                        "success": true,
                        "message": "Encounter ended successfully (already removed from cache)",
                        "in_combat": false,
                    })
                } else {
                    self.collector.remove_encounter(client_id, &args.encounter_id);
                    json!({
                        "success": true,
                        "message": "Encounter ended successfully (force removed from cache)",
                        "in_combat": false,
                    })
                }
            }
            Err(e) => fail(e.to_string()),
        }
    }

    // ── activate_combat ───────────────────────────────────────────

    async fn activate_combat(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct Args {
            encounter_id: String,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { encounter_id }");
        };

        let handle = self.pending.register(client_id, AwaitedType::CombatState);
        let request_id = handle.request_id();
        self.sink.send(
            client_id,
            OutboundFrame::ActivateCombat {
                request_id,
                data: EncounterOpData { encounter_id: Some(args.encounter_id), actor_ids: None, roll_initiative: None },
            },
        );

        match handle.await_with_timeout(Duration::from_secs(self.config.combat_mutation_timeout_secs)).await {
            Ok(result) => {
                let in_combat = result.get("in_combat").and_then(Value::as_bool).unwrap_or(false);
                json!({ "success": in_combat, "data": result })
            }
            Err(e) => fail(e.to_string()),
        }
    }

    // ── advance_combat_turn ───────────────────────────────────────

    async fn advance_combat_turn(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct Args {
            encounter_id: String,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { encounter_id }");
        };

        let before = self.collector.get_encounter(client_id, &args.encounter_id);

        let handle = self.pending.register(client_id, AwaitedType::CombatState);
        let request_id = handle.request_id();
        self.sink.send(
            client_id,
            OutboundFrame::AdvanceTurn {
                request_id,
                data: EncounterOpData { encounter_id: Some(args.encounter_id), actor_ids: None, roll_initiative: None },
            },
        );

        match handle.await_with_timeout(Duration::from_secs(self.config.combat_mutation_timeout_secs)).await {
            Ok(result) => {
                let new_round = result.get("round").and_then(Value::as_u64);
                let new_turn = result.get("turn").and_then(Value::as_u64);
                let advanced = match before {
                    Some(b) => Some((b.round as u64, b.turn as u64)) != new_round.zip(new_turn),
                    None => true,
                };
                json!({ "success": true, "advanced": advanced, "data": result })
            }
            Err(e) => fail(e.to_string()),
        }
    }

    // ── get_actor_details ─────────────────────────────────────────

    async fn get_actor_details(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct Args {
            token_id: String,
            #[serde(default)]
            search_phrase: Option<String>,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { token_id, search_phrase? }");
        };

        let handle = self.pending.register(client_id, AwaitedType::ActorSheet);
        let request_id = handle.request_id();
        self.sink.send(
            client_id,
            OutboundFrame::GetActorDetails {
                request_id,
                data: GetActorDetailsData { token_id: args.token_id, search_phrase: args.search_phrase },
            },
        );

        match handle.await_with_timeout(Duration::from_secs(self.config.actor_details_timeout_secs)).await {
            Ok(result) => json!({ "success": true, "data": result }),
            Err(e) => fail(e.to_string()),
        }
    }

    // ── modify_token_attribute ────────────────────────────────────

    async fn modify_token_attribute(&self, args: Value, client_id: &str) -> Value {
        #[derive(Deserialize)]
        struct Args {
            token_id: String,
            attribute_path: String,
            value: f64,
            #[serde(default = "default_true")]
            is_delta: bool,
            #[serde(default = "default_true")]
            is_bar: bool,
        }
        let Ok(args) = serde_json::from_value::<Args>(args) else {
            return fail("invalid arguments: expected { token_id, attribute_path, value, is_delta?, is_bar? }");
        };

        let handle = self.pending.register(client_id, AwaitedType::AttributeModAck);
        let request_id = handle.request_id();
        self.sink.send(
            client_id,
            OutboundFrame::ModifyTokenAttribute {
                request_id,
                data: ModifyTokenAttributeData {
                    token_id: args.token_id,
                    attribute_path: args.attribute_path,
                    value: json!(args.value),
                    is_delta: args.is_delta,
                    is_bar: args.is_bar,
                },
            },
        );

        match handle.await_with_timeout(Duration::from_secs(self.config.modify_attribute_timeout_secs)).await {
            Ok(result) => json!({ "success": true, "data": result }),
            Err(e) => fail(e.to_string()),
        }
    }
}

fn default_true() -> bool {
    true
}

fn fail(message: impl Into<String>) -> Value {
    json!({ "success": false, "error": message.into() })
}

/// Flatten a resolved `CombatStateData`-shaped result onto a `{success: true, ...}`
/// object rather than nesting it under a `data` key, so callers see
/// `in_combat`/`combat_id` at the top level.
fn merge_success(result: Value) -> Value {
    match result {
        Value::Object(fields) => {
            let mut out = serde_json::Map::new();
            out.insert("success".to_string(), json!(true));
            out.extend(fields);
            Value::Object(out)
        }
        other => json!({ "success": true, "data": other }),
    }
}

fn encounter_json(e: EncounterState) -> Value {
    json!({
        "encounter_id": e.encounter_id,
        "is_active": e.is_active,
        "round": e.round,
        "turn": e.turn,
        "combatants": e.combatants.into_iter().map(combatant_json).collect::<Vec<_>>(),
        "last_updated": e.last_updated,
    })
}

fn combatant_json(c: Combatant) -> Value {
    json!({
        "id": c.id,
        "name": c.name,
        "initiative": c.initiative,
        "is_player": c.is_player,
        "is_current_turn": c.is_current_turn,
        "actor_id": c.actor_id,
    })
}

/// Milliseconds since the epoch, for entries synthesized by a tool rather
/// than carried in on a frame.
fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Convert a collector `LogEntry` into the compact wire form fed to the LLM.
fn log_entry_to_compact(entry: &LogEntry) -> Option<CompactEvent> {
    let p = &entry.payload;
    match entry.kind {
        EntryKind::Chat => Some(CompactEvent::ChatMessage {
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
        EntryKind::Card => Some(CompactEvent::ChatCard {
            ts: entry.timestamp,
            name: p.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            description: p.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
            actions: p
                .get("actions")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::config::ToolsConfig;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, OutboundFrame)>>,
    }
    impl OutboundSink for RecordingSink {
        fn send(&self, client_id: &str, frame: OutboundFrame) {
            self.sent.lock().unwrap().push((client_id.to_string(), frame));
        }
    }

    fn executor(sink: Arc<RecordingSink>) -> (ToolExecutor, Arc<PendingCallRegistry>, Arc<MessageCollector>) {
        let pending = Arc::new(PendingCallRegistry::new());
        let collector = Arc::new(MessageCollector::new(ab_domain::config::CollectorConfig { item_cap: 100, retention_hours: 24 }));
        let exec = ToolExecutor::new(pending.clone(), collector.clone(), sink, ToolsConfig::default());
        (exec, pending, collector)
    }

    #[tokio::test]
    async fn get_message_history_rejects_out_of_range_count() {
        let (exec, ..) = executor(Arc::new(RecordingSink::default()));
        let result = exec.dispatch("get_message_history", json!({ "count": 0 }), "c1").await;
        assert_eq!(result["success"], false);
    }

    #[tokio::test]
    async fn get_message_history_returns_recorded_events() {
        let (exec, _pending, collector) = executor(Arc::new(RecordingSink::default()));
        collector.append_chat(
            "c1",
            NewEntry { kind: EntryKind::Chat, payload: json!({ "content": "hello" }), timestamp: Some(1) },
            1000,
        );
        let result = exec.dispatch("get_message_history", json!({ "count": 10 }), "c1").await;
        assert_eq!(result["success"], true);
        assert_eq!(result["events"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn post_message_sends_a_chat_response_and_records_it() {
        let sink = Arc::new(RecordingSink::default());
        let (exec, _pending, collector) = executor(sink.clone());
        let result = exec
            .dispatch("post_message", json!({ "messages": [{ "content": "The door creaks open." }] }), "c1")
            .await;
        assert_eq!(result["success"], true);
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
        assert_eq!(collector.recent("c1", 10).len(), 1);
    }

    #[tokio::test]
    async fn roll_dice_resolves_from_a_pending_call() {
        let sink = Arc::new(RecordingSink::default());
        let (exec, pending, _collector) = executor(sink.clone());
        let exec = Arc::new(exec);
        let exec2 = exec.clone();
        let task = tokio::spawn(async move {
            exec2.dispatch("roll_dice", json!({ "rolls": [{ "formula": "1d20" }] }), "c1").await
        });

        // Wait for the tool to register its pending call and emit the frame.
        let request_id = loop {
            if let Some((_, frame)) = sink.sent.lock().unwrap().first() {
                match frame {
                    OutboundFrame::ExecuteRoll { request_id, .. } => break *request_id,
                    other => panic!("unexpected frame: {other:?}"),
                }
            }
            tokio::task::yield_now().await;
        };
        pending.resolve(request_id, json!([{ "formula": "1d20", "total": 14 }]));

        let result = task.await.unwrap();
        assert_eq!(result["success"], true);
    }

    #[tokio::test]
    async fn roll_dice_rejects_empty_roll_list() {
        let (exec, ..) = executor(Arc::new(RecordingSink::default()));
        let result = exec.dispatch("roll_dice", json!({ "rolls": [] }), "c1").await;
        assert_eq!(result["success"], false);
    }

    #[tokio::test]
    async fn create_encounter_success_flattens_combat_state_onto_top_level() {
        let sink = Arc::new(RecordingSink::default());
        let (exec, pending, _collector) = executor(sink.clone());
        let exec = Arc::new(exec);
        let exec2 = exec.clone();
        let task = tokio::spawn(async move {
            exec2.dispatch("create_encounter", json!({ "actor_ids": ["a1", "a2"] }), "c1").await
        });

        let request_id = loop {
            if let Some((_, frame)) = sink.sent.lock().unwrap().first() {
                match frame {
                    OutboundFrame::CreateEncounter { request_id, .. } => break *request_id,
                    other => panic!("unexpected frame: {other:?}"),
                }
            }
            tokio::task::yield_now().await;
        };
        pending.resolve(
            request_id,
            json!({ "combat_id": "enc-2", "in_combat": true, "round": 1, "turn": 0, "combatants": [] }),
        );

        let result = task.await.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["in_combat"], true);
        assert_eq!(result["combat_id"], "enc-2");
        assert!(result.get("data").is_none(), "combat state fields must be flattened, not nested under data");
    }

    #[tokio::test]
    async fn activate_combat_success_reads_in_combat_field() {
        let sink = Arc::new(RecordingSink::default());
        let (exec, pending, _collector) = executor(sink.clone());
        let exec = Arc::new(exec);
        let exec2 = exec.clone();
        let task = tokio::spawn(async move {
            exec2.dispatch("activate_combat", json!({ "encounter_id": "enc-1" }), "c1").await
        });

        let request_id = loop {
            if let Some((_, frame)) = sink.sent.lock().unwrap().first() {
                match frame {
                    OutboundFrame::ActivateCombat { request_id, .. } => break *request_id,
                    other => panic!("unexpected frame: {other:?}"),
                }
            }
            tokio::task::yield_now().await;
        };
        pending.resolve(
            request_id,
            json!({ "combat_id": "enc-1", "in_combat": true, "round": 1, "turn": 0, "combatants": [] }),
        );

        let result = task.await.unwrap();
        assert_eq!(result["success"], true);
    }

    #[tokio::test]
    async fn delete_encounter_force_clears_cache_on_timeout_scenario_d() {
        let sink = Arc::new(RecordingSink::default());
        let (exec, _pending, collector) = executor(sink.clone());
        collector.upsert_encounter(
            "c1",
            EncounterState { encounter_id: "enc-1".into(), is_active: true, round: 1, turn: 0, combatants: vec![], last_updated: 1 },
        );
        let config = ToolsConfig { combat_mutation_timeout_secs: 0, ..ToolsConfig::default() };
        let exec = ToolExecutor::new(Arc::new(PendingCallRegistry::new()), collector.clone(), sink, config);

        let result = exec.dispatch("delete_encounter", json!({ "encounter_id": "enc-1" }), "c1").await;
        assert_eq!(result["success"], true);
        assert_eq!(result["message"], "Encounter ended successfully (force removed from cache)");
        assert_eq!(result["in_combat"], false);
        assert!(collector.get_encounter("c1", "enc-1").is_none(), "force cleanup must remove the stale cache entry");
    }

    #[tokio::test]
    async fn get_encounter_falls_back_to_cache_on_timeout() {
        let sink = Arc::new(RecordingSink::default());
        let (exec, _pending, collector) = executor(sink.clone());
        collector.upsert_encounter(
            "c1",
            EncounterState { encounter_id: "enc-1".into(), is_active: true, round: 1, turn: 0, combatants: vec![], last_updated: 1 },
        );
        let config = ToolsConfig { get_encounter_timeout_secs: 0, ..ToolsConfig::default() };
        let exec = ToolExecutor::new(Arc::new(PendingCallRegistry::new()), collector, sink, config);

        let result = exec.dispatch("get_encounter", json!({ "encounter_id": "enc-1" }), "c1").await;
        assert_eq!(result["success"], true);
        assert_eq!(result["source"], "cache");
    }

    #[tokio::test]
    async fn delete_encounter_fails_precheck_when_absent() {
        let (exec, ..) = executor(Arc::new(RecordingSink::default()));
        let result = exec.dispatch("delete_encounter", json!({ "encounter_id": "nope" }), "c1").await;
        assert_eq!(result["success"], false);
    }

    #[tokio::test]
    async fn unknown_tool_name_fails() {
        let (exec, ..) = executor(Arc::new(RecordingSink::default()));
        let result = exec.dispatch("not_a_real_tool", json!({}), "c1").await;
        assert_eq!(result["success"], false);
    }
}
