use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session lifecycle and pruning configuration (SessionStore, C3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Idle timeout in minutes. A session whose `last_activity_at` is older
    /// than this is dropped by the next `auto_evict()` sweep.
    ///
    /// Defaults to two weeks.
    #[serde(default = "d_idle_timeout_minutes")]
    pub idle_timeout_minutes: u64,

    /// How often `auto_evict()` runs.
    #[serde(default = "d_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,

    /// Character-based token budget applied to `history()` when no explicit
    /// budget is requested by the caller.
    #[serde(default = "d_default_token_budget")]
    pub default_token_budget: usize,

    /// Characters-per-token heuristic used to estimate token counts.
    #[serde(default = "d_chars_per_token")]
    pub chars_per_token: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: d_idle_timeout_minutes(),
            cleanup_interval_minutes: d_cleanup_interval_minutes(),
            default_token_budget: d_default_token_budget(),
            chars_per_token: d_chars_per_token(),
        }
    }
}

fn d_idle_timeout_minutes() -> u64 {
    20_160
}
fn d_cleanup_interval_minutes() -> u64 {
    10
}
fn d_default_token_budget() -> usize {
    8_000
}
fn d_chars_per_token() -> usize {
    4
}
