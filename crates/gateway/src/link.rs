//! ClientLink (C7): one axum WebSocket connection per frontend client.
//!
//! A `wait_for_hello`-style `connect` handshake with a timeout, a writer
//! task forwarding an outbound channel to the socket sink, and a
//! single-threaded reader loop so one client's inbound frames are
//! processed FIFO (no internal fan-out).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};

use ab_protocol::frame::{ChatRequestData, ConnectedData, EncounterState, ErrorData, InboundFrame, OutboundFrame};
use ab_tools::OutboundSink;

use crate::ingress::handle_chat_request;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(state)
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

struct Hello {
    client_id: String,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let handshake_timeout = Duration::from_secs(state.config.server.handshake_timeout_secs);

    let hello = match wait_for_hello(&mut ws_stream, handshake_timeout).await {
        Some(h) => h,
        None => {
            tracing::warn!("client disconnected before sending connect");
            return;
        }
    };
    let client_id = hello.client_id;

    if state.clients.is_connected(&client_id) {
        let _ = send_ws_message(
            &mut ws_sink,
            &OutboundFrame::Error {
                data: ErrorData { error: format!("client_id {client_id} already connected"), timestamp: now_ms() },
            },
        )
        .await;
        return;
    }

    if send_ws_message(
        &mut ws_sink,
        &OutboundFrame::Connected { data: ConnectedData { client_id: client_id.clone(), server_time: now_ms() } },
    )
    .await
    .is_err()
    {
        tracing::warn!(client_id = %client_id, "failed to send connected ack");
        return;
    }

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    state.clients.register(client_id.clone(), outbound_tx);
    tracing::info!(client_id = %client_id, "client connected");

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if send_ws_message(&mut ws_sink, &frame).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<InboundFrame>(&text) {
                Ok(frame) => handle_inbound(&state, &client_id, frame).await,
                Err(e) => {
                    tracing::debug!(client_id = %client_id, error = %e, "ignoring unparseable frame");
                    state.clients.send(
                        &client_id,
                        OutboundFrame::Error {
                            data: ErrorData { error: format!("unparseable frame: {e}"), timestamp: now_ms() },
                        },
                    );
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Cleanup: cancel in-flight tool round-trips so the owning turn fails
    // fast rather than hanging on an unreachable client, then tear down the
    // connection immediately but leave the inbox for the grace window in
    // case this is a quick reconnect.
    writer.abort();
    let cancelled = state.pending.cancel_for_client(&client_id);
    state.clients.remove(&client_id);
    tracing::info!(client_id = %client_id, cancelled_pending = cancelled, "client disconnected");

    let grace = Duration::from_secs(state.config.server.inbox_grace_secs);
    let collector = state.collector.clone();
    let grace_client_id = client_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        collector.clear(&grace_client_id);
    });
}

async fn wait_for_hello(
    stream: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    timeout: Duration,
) -> Option<Hello> {
    let result = tokio::time::timeout(timeout, async {
        while let Some(Ok(msg)) = stream.next().await {
            if let Message::Text(text) = msg {
                if let Ok(InboundFrame::Connect { client_id, .. }) = serde_json::from_str::<InboundFrame>(&text) {
                    return Some(Hello { client_id });
                }
            }
        }
        None
    })
    .await;
    result.unwrap_or(None)
}

async fn send_ws_message(
    sink: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    frame: &OutboundFrame,
) -> Result<(), ()> {
    let json = serde_json::to_string(frame).map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}

async fn handle_inbound(state: &Arc<AppState>, client_id: &str, frame: InboundFrame) {
    match frame {
        InboundFrame::Connect { .. } => {
            state.clients.send(
                client_id,
                OutboundFrame::Error {
                    data: ErrorData { error: "duplicate connect on an open connection".into(), timestamp: now_ms() },
                },
            );
        }

        InboundFrame::Ping {} => {
            state.clients.send(client_id, OutboundFrame::Pong { timestamp: now_ms() });
        }

        InboundFrame::SettingsSync { data } => {
            *state.settings.write() = data.settings.normalize();
        }

        InboundFrame::ChatMessage { data } => {
            state.collector.append_chat(
                client_id,
                ab_collector::NewEntry {
                    kind: ab_collector::EntryKind::Chat,
                    payload: serde_json::json!({
                        "content": data.content,
                        "speaker": data.speaker,
                        "alias": data.alias,
                    }),
                    timestamp: data.timestamp,
                },
                now_ms(),
            );
        }

        InboundFrame::DiceRoll { data } => {
            state.collector.append_roll(
                client_id,
                ab_collector::NewEntry {
                    kind: ab_collector::EntryKind::DiceRoll,
                    payload: serde_json::json!({
                        "formula": data.formula,
                        "total": data.total,
                        "results": data.results,
                        "speaker": data.speaker,
                        "flavor": data.flavor,
                    }),
                    timestamp: data.timestamp,
                },
                now_ms(),
            );
        }

        InboundFrame::CombatContext { data } => {
            let encounter_id = data.combat_id.clone().unwrap_or_else(|| "active".into());
            state.collector.upsert_encounter(
                client_id,
                EncounterState {
                    encounter_id,
                    is_active: data.in_combat,
                    round: data.round,
                    turn: data.turn,
                    combatants: data.combatants,
                    last_updated: now_ms(),
                },
            );
        }

        InboundFrame::WorldState { data } => {
            state.collector.set_world(client_id, data);
        }

        InboundFrame::ChatRequest { data } => {
            handle_chat_request_detached(state, client_id, data);
        }

        InboundFrame::RollResult { request_id, data } => {
            state.pending.resolve(request_id, serde_json::json!({ "results": data.results }));
        }

        InboundFrame::CombatState { request_id, data } => {
            if let Some(request_id) = request_id {
                state.pending.resolve(request_id, serde_json::to_value(&data).unwrap_or(serde_json::Value::Null));
            }
            state.collector.upsert_encounter(
                client_id,
                EncounterState {
                    encounter_id: data.combat_id,
                    is_active: data.in_combat,
                    round: data.round,
                    turn: data.turn,
                    combatants: data.combatants,
                    last_updated: now_ms(),
                },
            );
        }

        InboundFrame::ActorDetailsResult { request_id, data } => {
            state.pending.resolve(request_id, serde_json::to_value(&data).unwrap_or(serde_json::Value::Null));
        }

        InboundFrame::ModifyAttributeResult { request_id, data } => {
            state.pending.resolve(request_id, serde_json::to_value(&data).unwrap_or(serde_json::Value::Null));
        }
    }
}

fn handle_chat_request_detached(state: &Arc<AppState>, client_id: &str, data: ChatRequestData) {
    let state = state.clone();
    let client_id = client_id.to_string();
    tokio::spawn(async move { handle_chat_request(state, client_id, data).await });
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}
