//! The conversation data model.
//!
//! `ConversationMessage` is modeled as a tagged union rather than a struct
//! with an inheritance-style payload, avoiding structured inheritance: each
//! role carries exactly the fields that role
//! needs, and the "assistant with tool_calls must be followed by matching
//! tool messages" invariant is checked at append time rather than encoded
//! in the type.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An LLM-emitted request to perform a named action and return a result.
/// Ordered within the assistant message that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments_json: serde_json::Value,
}

/// A tool's JSON-Schema definition, handed to the provider verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One message in a Session's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationMessage {
    System {
        content: String,
    },
    User {
        content: String,
        timestamp: i64,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self::User { content: content.into(), timestamp }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant { content: content.into(), tool_calls }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool { tool_call_id: tool_call_id.into(), content: content.into() }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    /// Tool call ids carried by this message, if it is an assistant message
    /// with pending tool calls.
    pub fn tool_call_ids(&self) -> Option<Vec<&str>> {
        match self {
            Self::Assistant { tool_calls, .. } if !tool_calls.is_empty() => {
                Some(tool_calls.iter().map(|tc| tc.id.as_str()).collect())
            }
            _ => None,
        }
    }

    /// Rough token-count estimate, used by the session's pruning policy.
    /// A character-based heuristic is close enough for a budget that only
    /// needs to decide which turns to drop, not bill anyone precisely.
    pub fn estimated_tokens(&self, chars_per_token: usize) -> usize {
        let chars = match self {
            Self::System { content } => content.len(),
            Self::User { content, .. } => content.len(),
            Self::Assistant { content, tool_calls } => {
                content.len()
                    + tool_calls
                        .iter()
                        .map(|tc| tc.name.len() + tc.arguments_json.to_string().len())
                        .sum::<usize>()
            }
            Self::Tool { content, .. } => content.len(),
        };
        (chars / chars_per_token.max(1)).max(1)
    }
}

/// Checks that every assistant message with non-empty tool_calls is
/// immediately followed by exactly one `tool` message per call id, with no
/// id repeated, before any further assistant/user message.
pub fn validate_tool_pairing(messages: &[ConversationMessage]) -> Result<(), String> {
    let mut i = 0;
    while i < messages.len() {
        if let Some(ids) = messages[i].tool_call_ids() {
            let expected: HashSet<&str> = ids.iter().copied().collect();
            let mut seen: HashSet<&str> = HashSet::new();
            let mut j = i + 1;
            while j < messages.len() && seen.len() < expected.len() {
                match &messages[j] {
                    ConversationMessage::Tool { tool_call_id, .. } => {
                        if !expected.contains(tool_call_id.as_str()) {
                            return Err(format!(
                                "tool message {tool_call_id} does not match any pending tool_call"
                            ));
                        }
                        if !seen.insert(tool_call_id.as_str()) {
                            return Err(format!("duplicate tool_call_id {tool_call_id}"));
                        }
                        j += 1;
                    }
                    _ => {
                        return Err(format!(
                            "assistant message at index {i} is missing {} tool replies",
                            expected.len() - seen.len()
                        ));
                    }
                }
            }
            if seen.len() < expected.len() {
                return Err(format!(
                    "assistant message at index {i} is missing {} tool replies",
                    expected.len() - seen.len()
                ));
            }
            i = j;
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(id: &str) -> ToolCall {
        ToolCall { id: id.into(), name: "roll_dice".into(), arguments_json: serde_json::json!({}) }
    }

    #[test]
    fn well_formed_conversation_passes() {
        let msgs = vec![
            ConversationMessage::system("sys"),
            ConversationMessage::user("hi", 1),
            ConversationMessage::assistant("", vec![tc("a"), tc("b")]),
            ConversationMessage::tool("a", "1"),
            ConversationMessage::tool("b", "2"),
            ConversationMessage::assistant("done", vec![]),
        ];
        assert!(validate_tool_pairing(&msgs).is_ok());
    }

    #[test]
    fn missing_tool_reply_is_rejected() {
        let msgs = vec![
            ConversationMessage::assistant("", vec![tc("a"), tc("b")]),
            ConversationMessage::tool("a", "1"),
            ConversationMessage::user("oops", 2),
        ];
        assert!(validate_tool_pairing(&msgs).is_err());
    }

    #[test]
    fn duplicate_tool_call_id_is_rejected() {
        let msgs = vec![
            ConversationMessage::assistant("", vec![tc("a")]),
            ConversationMessage::tool("a", "1"),
            ConversationMessage::tool("a", "2"),
        ];
        assert!(validate_tool_pairing(&msgs).is_err());
    }

    #[test]
    fn assistant_without_tool_calls_needs_no_pairing() {
        let msgs = vec![
            ConversationMessage::user("hi", 1),
            ConversationMessage::assistant("hello", vec![]),
        ];
        assert!(validate_tool_pairing(&msgs).is_ok());
    }

    #[test]
    fn estimated_tokens_scales_with_content_length() {
        let short = ConversationMessage::user("hi", 1);
        let long = ConversationMessage::user("hello there, this is much longer", 1);
        assert!(long.estimated_tokens(4) > short.estimated_tokens(4));
    }

    #[test]
    fn tool_call_ids_none_for_plain_assistant() {
        let msg = ConversationMessage::assistant("hi", vec![]);
        assert!(msg.tool_call_ids().is_none());
    }
}
