//! Per-client inbox: chat/roll logs, world snapshot, and encounter map
//! (MessageCollector, C2).
//!
//! Two-level locking: a read lock on the outer map to find a client's
//! inbox, then a write lock scoped to that one inbox for mutation, so
//! concurrent clients never contend with each other.

use std::collections::HashMap;
use std::sync::Arc;

use ab_protocol::frame::{EncounterState, WorldStateData};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

/// What kind of event a `LogEntry` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Chat,
    DiceRoll,
    Card,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: i64,
    pub kind: EntryKind,
    pub payload: Value,
}

/// A new entry as handed to the collector; timestamp is filled in if absent.
pub struct NewEntry {
    pub kind: EntryKind,
    pub payload: Value,
    pub timestamp: Option<i64>,
}

struct Inbox {
    chat: Vec<LogEntry>,
    rolls: Vec<LogEntry>,
    world: Option<WorldStateData>,
    encounters: HashMap<String, EncounterState>,
    game_delta: Option<Value>,
    last_timestamp: i64,
}

impl Inbox {
    fn new() -> Self {
        Self {
            chat: Vec::new(),
            rolls: Vec::new(),
            world: None,
            encounters: HashMap::new(),
            game_delta: None,
            last_timestamp: 0,
        }
    }

    fn assign_timestamp(&mut self, requested: Option<i64>) -> i64 {
        let ts = match requested {
            Some(ts) if ts > self.last_timestamp => ts,
            _ => self.last_timestamp + 1,
        };
        self.last_timestamp = ts;
        ts
    }

    fn evict(&mut self, item_cap: usize, retention_hours: u64, now_ms: i64) {
        let cutoff = now_ms - (retention_hours as i64) * 3_600_000;
        for log in [&mut self.chat, &mut self.rolls] {
            log.retain(|e| e.timestamp >= cutoff);
            if log.len() > item_cap {
                let drop = log.len() - item_cap;
                log.drain(0..drop);
            }
        }
    }
}

pub struct MessageCollector {
    inboxes: RwLock<HashMap<String, Arc<RwLock<Inbox>>>>,
    config: ab_domain::config::CollectorConfig,
}

impl MessageCollector {
    pub fn new(config: ab_domain::config::CollectorConfig) -> Self {
        Self {
            inboxes: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn inbox_for(&self, client_id: &str) -> Arc<RwLock<Inbox>> {
        if let Some(inbox) = self.inboxes.read().get(client_id) {
            return inbox.clone();
        }
        self.inboxes
            .write()
            .entry(client_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Inbox::new())))
            .clone()
    }

    fn append(&self, client_id: &str, entry: NewEntry, now_ms: i64, to_roll_log: bool) -> i64 {
        let inbox = self.inbox_for(client_id);
        let mut guard = inbox.write();
        let ts = guard.assign_timestamp(entry.timestamp);
        let log_entry = LogEntry {
            timestamp: ts,
            kind: entry.kind,
            payload: entry.payload,
        };
        if to_roll_log {
            guard.rolls.push(log_entry);
        } else {
            guard.chat.push(log_entry);
        }
        guard.evict(self.config.item_cap, self.config.retention_hours, now_ms);
        ts
    }

    /// Append a chat/card entry. Returns the assigned timestamp.
    pub fn append_chat(&self, client_id: &str, entry: NewEntry, now_ms: i64) -> i64 {
        self.append(client_id, entry, now_ms, false)
    }

    /// Append a dice-roll entry on the dedicated roll stream. Returns the
    /// assigned timestamp.
    pub fn append_roll(&self, client_id: &str, entry: NewEntry, now_ms: i64) -> i64 {
        self.append(client_id, entry, now_ms, true)
    }

    fn merged(inbox: &Inbox) -> Vec<LogEntry> {
        let mut merged: Vec<LogEntry> = inbox
            .chat
            .iter()
            .chain(inbox.rolls.iter())
            .cloned()
            .collect();
        merged.sort_by_key(|e| e.timestamp);
        merged
    }

    /// Last `n` chat ∪ roll entries, oldest first.
    pub fn recent(&self, client_id: &str, n: usize) -> Vec<LogEntry> {
        let Some(inbox) = self.inboxes.read().get(client_id).cloned() else {
            return Vec::new();
        };
        let guard = inbox.read();
        let merged = Self::merged(&guard);
        let start = merged.len().saturating_sub(n);
        merged[start..].to_vec()
    }

    /// All chat ∪ roll entries with timestamp strictly greater than `since`.
    pub fn since(&self, client_id: &str, since: i64) -> Vec<LogEntry> {
        let Some(inbox) = self.inboxes.read().get(client_id).cloned() else {
            return Vec::new();
        };
        let guard = inbox.read();
        Self::merged(&guard)
            .into_iter()
            .filter(|e| e.timestamp > since)
            .collect()
    }

    pub fn set_world(&self, client_id: &str, snapshot: WorldStateData) {
        self.inbox_for(client_id).write().world = Some(snapshot);
    }

    pub fn get_world(&self, client_id: &str) -> Option<WorldStateData> {
        self.inboxes
            .read()
            .get(client_id)
            .and_then(|i| i.read().world.clone())
    }

    pub fn upsert_encounter(&self, client_id: &str, encounter: EncounterState) {
        let inbox = self.inbox_for(client_id);
        inbox
            .write()
            .encounters
            .insert(encounter.encounter_id.clone(), encounter);
    }

    pub fn get_encounter(&self, client_id: &str, encounter_id: &str) -> Option<EncounterState> {
        self.inboxes
            .read()
            .get(client_id)?
            .read()
            .encounters
            .get(encounter_id)
            .cloned()
    }

    pub fn get_all_encounters(&self, client_id: &str) -> Vec<EncounterState> {
        self.inboxes
            .read()
            .get(client_id)
            .map(|i| i.read().encounters.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Force-remove a cached encounter (used when a delete times out but a
    /// late `combat_state` frame never arrives to upsert its own removal).
    pub fn remove_encounter(&self, client_id: &str, encounter_id: &str) {
        if let Some(inbox) = self.inboxes.read().get(client_id) {
            inbox.write().encounters.remove(encounter_id);
        }
    }

    /// Changes-since-last-turn summary, deposited by the link and consumed
    /// once at the start of the next turn.
    pub fn get_game_delta(&self, client_id: &str) -> Option<Value> {
        self.inboxes
            .read()
            .get(client_id)
            .and_then(|i| i.read().game_delta.clone())
    }

    pub fn set_game_delta(&self, client_id: &str, delta: Value) {
        self.inbox_for(client_id).write().game_delta = Some(delta);
    }

    pub fn clear_game_delta(&self, client_id: &str) {
        if let Some(inbox) = self.inboxes.read().get(client_id) {
            inbox.write().game_delta = None;
        }
    }

    /// Drop the inbox entirely (connection teardown past the grace window).
    pub fn clear(&self, client_id: &str) {
        self.inboxes.write().remove(client_id);
    }
}
