//! JSON-Schema `ToolDefinition`s for the fixed tool catalog, built once at
//! startup and handed to `ProviderGateway::complete` verbatim.

use ab_domain::conversation::ToolDefinition;
use serde_json::json;

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_message_history".into(),
            description: "Fetch the most recent chat and dice-roll events for this table, in compact form.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "count": { "type": "integer", "minimum": 1, "maximum": 50, "description": "Number of recent events to return" }
                },
                "required": ["count"]
            }),
        },
        ToolDefinition {
            name: "post_message".into(),
            description: "Post one or more messages into the table's chat.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "messages": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "content": { "type": "string" },
                                "type": { "type": "string", "enum": ["chat", "card"] },
                                "speaker": { "type": "string" },
                                "flavor": { "type": "string" },
                                "flags": {},
                                "whisper": { "type": "array", "items": { "type": "string" } },
                                "compact_format": { "type": "boolean" }
                            },
                            "required": ["content"]
                        }
                    }
                },
                "required": ["messages"]
            }),
        },
        ToolDefinition {
            name: "roll_dice".into(),
            description: "Ask the frontend to roll one or more dice formulas and report the results.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "rolls": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "formula": { "type": "string" },
                                "flavor": { "type": "string" }
                            },
                            "required": ["formula"]
                        }
                    }
                },
                "required": ["rolls"]
            }),
        },
        ToolDefinition {
            name: "get_encounter".into(),
            description: "Fetch the current state of an encounter, or a summary of all active encounters.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "encounter_id": { "type": "string" }
                }
            }),
        },
        ToolDefinition {
            name: "create_encounter".into(),
            description: "Create a new combat encounter from a list of actor/token ids.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "actor_ids": { "type": "array", "items": { "type": "string" } },
                    "roll_initiative": { "type": "boolean", "description": "Defaults to true" }
                },
                "required": ["actor_ids"]
            }),
        },
        ToolDefinition {
            name: "delete_encounter".into(),
            description: "Delete an active encounter.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "encounter_id": { "type": "string" }
                },
                "required": ["encounter_id"]
            }),
        },
        ToolDefinition {
            name: "activate_combat".into(),
            description: "Activate an encounter, making it the live combat.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "encounter_id": { "type": "string" }
                },
                "required": ["encounter_id"]
            }),
        },
        ToolDefinition {
            name: "advance_combat_turn".into(),
            description: "Advance the active encounter to the next turn (and round, if needed).".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "encounter_id": { "type": "string" }
                },
                "required": ["encounter_id"]
            }),
        },
        ToolDefinition {
            name: "get_actor_details".into(),
            description: "Fetch the sheet data for a token's actor, optionally narrowed by a search phrase.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "token_id": { "type": "string" },
                    "search_phrase": { "type": "string" }
                },
                "required": ["token_id"]
            }),
        },
        ToolDefinition {
            name: "modify_token_attribute".into(),
            description: "Modify a numeric attribute on a token (e.g. hit points), as a delta or an absolute set.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "token_id": { "type": "string" },
                    "attribute_path": { "type": "string" },
                    "value": { "type": "number" },
                    "is_delta": { "type": "boolean", "description": "Defaults to true" },
                    "is_bar": { "type": "boolean", "description": "Defaults to true" }
                },
                "required": ["token_id", "attribute_path", "value"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_ten_tools_with_unique_names() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), 10);
        let mut names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 10);
    }
}
