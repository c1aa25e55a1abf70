//! The compact event schema fed to the LLM as conversation history.
//!
//! Keys are kept short deliberately: these objects are serialized into user
//! message content and counted against the model's context budget.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum CompactEvent {
    #[serde(rename = "dr")]
    DiceRoll {
        ts: i64,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "s")]
        speaker: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "a")]
        alias: Option<String>,
        #[serde(rename = "f")]
        formula: String,
        #[serde(rename = "tt")]
        total: f64,
        #[serde(rename = "r")]
        results: Vec<f64>,
        #[serde(rename = "ft")]
        flavor: String,
    },

    #[serde(rename = "cm")]
    ChatMessage {
        ts: i64,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "s")]
        speaker: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "a")]
        alias: Option<String>,
        #[serde(rename = "c")]
        content: String,
    },

    #[serde(rename = "cd")]
    ChatCard {
        ts: i64,
        #[serde(rename = "n")]
        name: String,
        #[serde(rename = "d")]
        description: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "a")]
        actions: Vec<String>,
    },

    #[serde(rename = "combat_context")]
    CombatContext {
        combat_context: serde_json::Value,
    },
}

impl CompactEvent {
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::DiceRoll { ts, .. } | Self::ChatMessage { ts, .. } | Self::ChatCard { ts, .. } => {
                Some(*ts)
            }
            Self::CombatContext { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dice_roll_uses_short_keys() {
        let ev = CompactEvent::DiceRoll {
            ts: 1000,
            speaker: Some("Aria".into()),
            alias: None,
            formula: "1d20+5".into(),
            total: 18.0,
            results: vec![13.0],
            flavor: "attack roll".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["t"], "dr");
        assert_eq!(json["f"], "1d20+5");
        assert_eq!(json["tt"], 18.0);
        assert!(json.get("formula").is_none());
    }

    #[test]
    fn chat_message_round_trips() {
        let ev = CompactEvent::ChatMessage {
            ts: 42,
            speaker: None,
            alias: Some("DM".into()),
            content: "The door creaks open.".into(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: CompactEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp(), Some(42));
    }
}
