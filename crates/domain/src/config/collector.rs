use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MessageCollector (C2) bounds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Max items retained per client per log (chat, rolls).
    #[serde(default = "d_item_cap")]
    pub item_cap: usize,
    /// Age-based retention window, in hours.
    #[serde(default = "d_retention_hours")]
    pub retention_hours: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            item_cap: d_item_cap(),
            retention_hours: d_retention_hours(),
        }
    }
}

fn d_item_cap() -> usize {
    100
}
fn d_retention_hours() -> u64 {
    24
}
