//! Gateway-owned session store (SessionStore, C3).
//!
//! A `Session` owns its conversation directly in memory — there is no
//! durable transcript in this system.

use std::collections::HashMap;

use ab_domain::conversation::{validate_tool_pairing, ConversationMessage};
use ab_domain::error::{Error, Result};
use ab_domain::trace::TraceEvent;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::lifecycle::LifecycleManager;

/// A single conversation session tracked by the gateway.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub client_id: String,
    pub provider_id: String,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub last_context_timestamp: Option<i64>,
    pub conversation: Vec<ConversationMessage>,
}

fn triple_key(client_id: &str, provider_id: &str, model_id: &str) -> String {
    format!("{client_id}\u{0}{provider_id}\u{0}{model_id}")
}

/// One atomic "conversation turn" unit for pruning purposes: either a single
/// user/system/plain-assistant message, or an assistant message carrying
/// tool_calls together with every one of its tool replies.
struct TurnUnit {
    messages: Vec<ConversationMessage>,
}

impl TurnUnit {
    fn estimated_tokens(&self, chars_per_token: usize) -> usize {
        self.messages
            .iter()
            .map(|m| m.estimated_tokens(chars_per_token))
            .sum()
    }
}

fn group_into_turns(messages: &[ConversationMessage]) -> Vec<TurnUnit> {
    let mut units = Vec::new();
    let mut i = 0;
    while i < messages.len() {
        if let Some(ids) = messages[i].tool_call_ids() {
            let expected = ids.len();
            let mut j = i + 1;
            let mut seen = 0;
            while j < messages.len() && seen < expected {
                if matches!(messages[j], ConversationMessage::Tool { .. }) {
                    seen += 1;
                    j += 1;
                } else {
                    break;
                }
            }
            units.push(TurnUnit {
                messages: messages[i..j].to_vec(),
            });
            i = j;
        } else {
            units.push(TurnUnit {
                messages: vec![messages[i].clone()],
            });
            i += 1;
        }
    }
    units
}

/// Prune `messages` from the front (after a leading system message, if any)
/// to fit `budget` tokens, without ever splitting an assistant/tool_calls
/// turn from its replies.
fn prune_to_budget(
    messages: &[ConversationMessage],
    budget: usize,
    chars_per_token: usize,
) -> Vec<ConversationMessage> {
    let (system, rest) = match messages.first() {
        Some(ConversationMessage::System { .. }) => (Some(messages[0].clone()), &messages[1..]),
        _ => (None, messages),
    };

    let system_tokens = system
        .as_ref()
        .map(|m| m.estimated_tokens(chars_per_token))
        .unwrap_or(0);

    let mut units: std::collections::VecDeque<TurnUnit> = group_into_turns(rest).into();
    let mut total: usize = system_tokens + units.iter().map(|u| u.estimated_tokens(chars_per_token)).sum::<usize>();

    while total > budget && units.len() > 1 {
        if let Some(front) = units.pop_front() {
            total -= front.estimated_tokens(chars_per_token);
        }
    }

    let mut out = Vec::new();
    if let Some(sys) = system {
        out.push(sys);
    }
    for unit in units {
        out.extend(unit.messages);
    }
    out
}

/// Gateway-owned, in-memory session store.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    /// client_id/provider_id/model_id triple → session_id, for reuse.
    by_triple: RwLock<HashMap<String, String>>,
    lifecycle: LifecycleManager,
    chars_per_token: usize,
    default_token_budget: usize,
}

impl SessionStore {
    pub fn new(idle_timeout_minutes: u64, chars_per_token: usize, default_token_budget: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            by_triple: RwLock::new(HashMap::new()),
            lifecycle: LifecycleManager::new(idle_timeout_minutes),
            chars_per_token,
            default_token_budget,
        }
    }

    fn is_live(&self, session: &Session, now: DateTime<Utc>) -> bool {
        !self.lifecycle.is_expired(session.last_activity_at, now)
    }

    /// Resolve or create a session for (client_id, provider_id, model_id),
    /// honoring a client-requested session id when it is still valid.
    pub fn get_or_create(
        &self,
        client_id: &str,
        provider_id: &str,
        model_id: &str,
        requested_session_id: Option<&str>,
    ) -> String {
        let now = Utc::now();

        if let Some(requested) = requested_session_id {
            let mut sessions = self.sessions.write();
            if let Some(session) = sessions.get_mut(requested) {
                if session.client_id == client_id && self.is_live(session, now) {
                    session.last_activity_at = now;
                    return session.session_id.clone();
                }
            }
        }

        let key = triple_key(client_id, provider_id, model_id);
        {
            let by_triple = self.by_triple.read();
            if let Some(existing_id) = by_triple.get(&key) {
                let mut sessions = self.sessions.write();
                if let Some(session) = sessions.get_mut(existing_id) {
                    if self.is_live(session, now) {
                        session.last_activity_at = now;
                        return session.session_id.clone();
                    }
                }
            }
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let session = Session {
            session_id: session_id.clone(),
            client_id: client_id.to_string(),
            provider_id: provider_id.to_string(),
            model_id: model_id.to_string(),
            created_at: now,
            last_activity_at: now,
            last_context_timestamp: None,
            conversation: Vec::new(),
        };

        self.sessions.write().insert(session_id.clone(), session);
        self.by_triple.write().insert(key, session_id.clone());

        TraceEvent::SessionResolved {
            client_id: client_id.to_string(),
            session_id: session_id.clone(),
            is_new: true,
        }
        .emit();

        session_id
    }

    /// Append a message to a session's conversation.
    pub fn append(&self, session_id: &str, message: ConversationMessage) -> Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionExpired(session_id.to_string()))?;
        if !self.is_live(session, now) {
            return Err(Error::SessionExpired(session_id.to_string()));
        }
        session.conversation.push(message);
        session.last_activity_at = now;
        Ok(())
    }

    /// The stored conversation, optionally pruned from the front to fit a
    /// token budget while preserving the leading system message and the
    /// assistant↔tool pairing invariant.
    pub fn history(&self, session_id: &str, token_budget: Option<usize>) -> Option<Vec<ConversationMessage>> {
        let sessions = self.sessions.read();
        let session = sessions.get(session_id)?;
        let budget = token_budget.unwrap_or(self.default_token_budget);
        let pruned = prune_to_budget(&session.conversation, budget, self.chars_per_token);
        debug_assert!(validate_tool_pairing(&pruned).is_ok(), "pruning must preserve tool pairing");
        Some(pruned)
    }

    pub fn set_last_context_timestamp(&self, session_id: &str, ts: i64) {
        if let Some(session) = self.sessions.write().get_mut(session_id) {
            session.last_context_timestamp = Some(ts);
        }
    }

    pub fn get_last_context_timestamp(&self, session_id: &str) -> Option<i64> {
        self.sessions.read().get(session_id)?.last_context_timestamp
    }

    /// Drop sessions idle beyond the configured timeout. Returns the number
    /// evicted.
    pub fn auto_evict(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let mut by_triple = self.by_triple.write();

        let expired: Vec<(String, String, i64)> = sessions
            .values()
            .filter(|s| !self.is_live(s, now))
            .map(|s| {
                let idle_minutes = now.signed_duration_since(s.last_activity_at).num_minutes();
                (
                    s.session_id.clone(),
                    triple_key(&s.client_id, &s.provider_id, &s.model_id),
                    idle_minutes,
                )
            })
            .collect();

        for (session_id, key, idle_minutes) in &expired {
            sessions.remove(session_id);
            by_triple.remove(key);
            TraceEvent::SessionEvicted {
                session_id: session_id.clone(),
                idle_minutes: (*idle_minutes).max(0) as u64,
            }
            .emit();
        }

        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(30, 4, 1000)
    }

    #[test]
    fn get_or_create_creates_new_session() {
        let s = store();
        let id = s.get_or_create("client-1", "openai", "gpt-4o", None);
        assert!(!id.is_empty());
    }

    #[test]
    fn get_or_create_reuses_live_triple() {
        let s = store();
        let id1 = s.get_or_create("client-1", "openai", "gpt-4o", None);
        let id2 = s.get_or_create("client-1", "openai", "gpt-4o", None);
        assert_eq!(id1, id2);
    }

    #[test]
    fn get_or_create_distinguishes_models() {
        let s = store();
        let id1 = s.get_or_create("client-1", "openai", "gpt-4o", None);
        let id2 = s.get_or_create("client-1", "openai", "gpt-4o-mini", None);
        assert_ne!(id1, id2);
    }

    #[test]
    fn requested_session_id_honored_when_owned_by_client() {
        let s = store();
        let id = s.get_or_create("client-1", "openai", "gpt-4o", None);
        let resolved = s.get_or_create("client-1", "openai", "gpt-4o", Some(&id));
        assert_eq!(id, resolved);
    }

    #[test]
    fn requested_session_id_ignored_for_other_client() {
        let s = store();
        let id = s.get_or_create("client-1", "openai", "gpt-4o", None);
        let resolved = s.get_or_create("client-2", "openai", "gpt-4o", Some(&id));
        assert_ne!(id, resolved);
    }

    #[test]
    fn append_and_history_round_trip() {
        let s = store();
        let id = s.get_or_create("client-1", "openai", "gpt-4o", None);
        s.append(&id, ConversationMessage::system("sys")).unwrap();
        s.append(&id, ConversationMessage::user("hi", 1)).unwrap();
        let history = s.history(&id, None).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn append_to_unknown_session_is_expired_error() {
        let s = store();
        let err = s.append("ghost", ConversationMessage::user("hi", 1)).unwrap_err();
        assert!(matches!(err, Error::SessionExpired(_)));
    }

    #[test]
    fn history_prunes_oldest_turns_first_keeping_system() {
        let s = store();
        let id = s.get_or_create("client-1", "openai", "gpt-4o", None);
        s.append(&id, ConversationMessage::system("sys")).unwrap();
        for i in 0..20 {
            s.append(&id, ConversationMessage::user(format!("message number {i}"), i)).unwrap();
        }
        let pruned = s.history(&id, Some(20)).unwrap();
        assert!(matches!(pruned[0], ConversationMessage::System { .. }));
        assert!(pruned.len() < 21, "expected pruning to drop some messages");
    }

    #[test]
    fn history_never_splits_tool_call_turn() {
        let s = store();
        let id = s.get_or_create("client-1", "openai", "gpt-4o", None);
        s.append(&id, ConversationMessage::system("sys")).unwrap();
        for i in 0..5 {
            s.append(&id, ConversationMessage::user(format!("filler {i}"), i)).unwrap();
        }
        let tool_call = ab_domain::conversation::ToolCall {
            id: "call-1".into(),
            name: "roll_dice".into(),
            arguments_json: serde_json::json!({"formula": "1d20"}),
        };
        s.append(&id, ConversationMessage::assistant("", vec![tool_call])).unwrap();
        s.append(&id, ConversationMessage::tool("call-1", "15")).unwrap();

        // Budget tight enough to force pruning but the tool turn must survive whole.
        let pruned = s.history(&id, Some(1)).unwrap();
        assert!(validate_tool_pairing(&pruned).is_ok());
    }

    #[test]
    fn auto_evict_drops_idle_sessions() {
        let s = SessionStore::new(0, 4, 1000);
        let id = s.get_or_create("client-1", "openai", "gpt-4o", None);
        std::thread::sleep(std::time::Duration::from_millis(10));
        let evicted = s.auto_evict();
        assert_eq!(evicted, 1);
        assert!(s.history(&id, None).is_none());
    }
}
