use ab_domain::Settings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A combatant entry inside an encounter, as carried on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub name: String,
    pub initiative: f64,
    pub is_player: bool,
    pub is_current_turn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
}

/// Encounter/combat state as reported by the frontend or pushed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterState {
    pub encounter_id: String,
    pub is_active: bool,
    pub round: u32,
    pub turn: u32,
    #[serde(default)]
    pub combatants: Vec<Combatant>,
    pub last_updated: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceRollData {
    pub formula: String,
    pub total: f64,
    #[serde(default)]
    pub results: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatContextData {
    pub in_combat: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_id: Option<String>,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub combatants: Vec<Combatant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldStateData {
    #[serde(default)]
    pub session_info: serde_json::Value,
    #[serde(default)]
    pub party_compendium: serde_json::Value,
    #[serde(default)]
    pub active_scene: serde_json::Value,
    #[serde(default)]
    pub compendium_index: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_encounter: Option<EncounterState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequestData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<serde_json::Value>>,
    pub context_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_state: Option<CombatContextData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollResultData {
    pub results: Vec<DiceRollData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatStateData {
    pub combat_id: String,
    pub in_combat: bool,
    pub round: u32,
    pub turn: u32,
    #[serde(default)]
    pub combatants: Vec<Combatant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorDetailsResultData {
    pub token_id: String,
    #[serde(flatten)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyAttributeResultData {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSyncData {
    pub settings: Settings,
}

/// Frames sent by the frontend to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundFrame {
    #[serde(rename = "connect")]
    Connect {
        client_id: String,
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        world_info: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_info: Option<serde_json::Value>,
    },

    #[serde(rename = "ping")]
    Ping {},

    #[serde(rename = "settings_sync")]
    SettingsSync { data: SettingsSyncData },

    #[serde(rename = "chat_message")]
    ChatMessage { data: ChatEntryData },

    #[serde(rename = "dice_roll")]
    DiceRoll { data: DiceRollData },

    #[serde(rename = "combat_context")]
    CombatContext { data: CombatContextData },

    #[serde(rename = "world_state")]
    WorldState { data: WorldStateData },

    #[serde(rename = "chat_request")]
    ChatRequest { data: ChatRequestData },

    #[serde(rename = "roll_result")]
    RollResult {
        request_id: Uuid,
        data: RollResultData,
    },

    #[serde(rename = "combat_state")]
    CombatState {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<Uuid>,
        data: CombatStateData,
    },

    #[serde(rename = "actor_details_result")]
    ActorDetailsResult {
        request_id: Uuid,
        data: ActorDetailsResultData,
    },

    #[serde(rename = "modify_attribute_result")]
    ModifyAttributeResult {
        request_id: Uuid,
        data: ModifyAttributeResultData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedData {
    pub client_id: String,
    pub server_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub error: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponseData {
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRollData {
    pub rolls: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EncounterOpData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_initiative: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetActorDetailsData {
    pub token_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_phrase: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyTokenAttributeData {
    pub token_id: String,
    pub attribute_path: String,
    pub value: serde_json::Value,
    pub is_delta: bool,
    pub is_bar: bool,
}

/// Frames sent by the gateway to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundFrame {
    #[serde(rename = "connected")]
    Connected { data: ConnectedData },

    #[serde(rename = "pong")]
    Pong { timestamp: i64 },

    #[serde(rename = "error")]
    Error { data: ErrorData },

    #[serde(rename = "chat_response")]
    ChatResponse { data: ChatResponseData },

    #[serde(rename = "execute_roll")]
    ExecuteRoll {
        request_id: Uuid,
        data: ExecuteRollData,
    },

    #[serde(rename = "combat_state_refresh")]
    CombatStateRefresh {
        request_id: Uuid,
        data: serde_json::Value,
    },

    #[serde(rename = "create_encounter")]
    CreateEncounter {
        request_id: Uuid,
        data: EncounterOpData,
    },

    #[serde(rename = "delete_encounter")]
    DeleteEncounter {
        request_id: Uuid,
        data: EncounterOpData,
    },

    #[serde(rename = "activate_combat")]
    ActivateCombat {
        request_id: Uuid,
        data: EncounterOpData,
    },

    #[serde(rename = "advance_turn")]
    AdvanceTurn {
        request_id: Uuid,
        data: EncounterOpData,
    },

    #[serde(rename = "get_actor_details")]
    GetActorDetails {
        request_id: Uuid,
        data: GetActorDetailsData,
    },

    #[serde(rename = "modify_token_attribute")]
    ModifyTokenAttribute {
        request_id: Uuid,
        data: ModifyTokenAttributeData,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_frame_round_trips() {
        let frame = InboundFrame::Connect {
            client_id: "c1".into(),
            token: "tok".into(),
            world_info: None,
            user_info: None,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"connect\""));
        let back: InboundFrame = serde_json::from_str(&json).unwrap();
        match back {
            InboundFrame::Connect { client_id, .. } => assert_eq!(client_id, "c1"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn roll_result_carries_request_id() {
        let id = Uuid::new_v4();
        let frame = InboundFrame::RollResult {
            request_id: id,
            data: RollResultData {
                results: vec![DiceRollData {
                    formula: "1d20".into(),
                    total: 15.0,
                    results: vec![15.0],
                    speaker: None,
                    flavor: None,
                    timestamp: None,
                }],
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["request_id"], serde_json::json!(id));
    }

    #[test]
    fn modify_token_attribute_serializes_expected_shape() {
        let frame = OutboundFrame::ModifyTokenAttribute {
            request_id: Uuid::new_v4(),
            data: ModifyTokenAttributeData {
                token_id: "tok-1".into(),
                attribute_path: "attributes.hp.value".into(),
                value: serde_json::json!(-5),
                is_delta: true,
                is_bar: true,
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "modify_token_attribute");
        assert_eq!(json["data"]["attribute_path"], "attributes.hp.value");
    }
}
