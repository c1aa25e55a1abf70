use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tools (per-tool timeout overrides, ToolExecutor C5)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-tool round-trip timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "d_roll_dice_secs")]
    pub roll_dice_timeout_secs: u64,
    #[serde(default = "d_get_encounter_secs")]
    pub get_encounter_timeout_secs: u64,
    #[serde(default = "d_combat_mutation_secs")]
    pub combat_mutation_timeout_secs: u64,
    #[serde(default = "d_actor_details_secs")]
    pub actor_details_timeout_secs: u64,
    #[serde(default = "d_modify_attribute_secs")]
    pub modify_attribute_timeout_secs: u64,
    /// Upper bound accepted by `get_message_history`'s `count` argument.
    #[serde(default = "d_max_history_count")]
    pub max_history_count: u32,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            roll_dice_timeout_secs: d_roll_dice_secs(),
            get_encounter_timeout_secs: d_get_encounter_secs(),
            combat_mutation_timeout_secs: d_combat_mutation_secs(),
            actor_details_timeout_secs: d_actor_details_secs(),
            modify_attribute_timeout_secs: d_modify_attribute_secs(),
            max_history_count: d_max_history_count(),
        }
    }
}

fn d_roll_dice_secs() -> u64 {
    30
}
fn d_get_encounter_secs() -> u64 {
    5
}
fn d_combat_mutation_secs() -> u64 {
    15
}
fn d_actor_details_secs() -> u64 {
    5
}
fn d_modify_attribute_secs() -> u64 {
    15
}
fn d_max_history_count() -> u32 {
    50
}
