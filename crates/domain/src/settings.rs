//! The per-turn validated settings bundle.
//!
//! Synced wholesale by a `settings_sync` frame and read once per turn by
//! RequestIngress. Unlike `Config`, this bundle is runtime-mutable and owned
//! by the gateway's `AppState`, not loaded from disk at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One LLM family's resolved call parameters — "general" or "tactical".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmFamilySettings {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default = "d_timeout_sec")]
    pub timeout_sec: u64,
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
}

impl LlmFamilySettings {
    fn clamp_ranges(&mut self) {
        if !(1..=600).contains(&self.timeout_sec) {
            self.timeout_sec = d_timeout_sec();
        }
        if self.max_retries > 10 {
            self.max_retries = d_max_retries();
        }
    }
}

fn d_timeout_sec() -> u64 {
    30
}
fn d_max_retries() -> u32 {
    2
}

/// Which LLM family a turn should use when no explicit signal resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatProcessingMode {
    #[default]
    General,
    Tactical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub general: LlmFamilySettings,
    pub tactical: LlmFamilySettings,
    #[serde(default = "d_max_context")]
    pub maximum_message_context: u32,
    #[serde(default = "d_ai_role")]
    pub ai_role: String,
    /// Absent unless the frontend's `settings_sync` explicitly named a mode;
    /// `None` is what lets `resolve_family` fall back to combat detection
    /// instead of silently treating "not configured" as "General".
    #[serde(default)]
    pub chat_processing_mode: Option<ChatProcessingMode>,
}

fn d_max_context() -> u32 {
    20
}
fn d_ai_role() -> String {
    "You are an assistant helping run a tabletop session.".into()
}

impl Settings {
    /// Apply declared numeric ranges, substituting the field default at the
    /// boundary rather than rejecting the whole bundle.
    pub fn normalize(mut self) -> Self {
        self.general.clamp_ranges();
        self.tactical.clamp_ranges();
        if !(1..=200).contains(&self.maximum_message_context) {
            self.maximum_message_context = d_max_context();
        }
        self
    }

    /// Resolve which LLM family a turn should use.
    ///
    /// Preference order: explicit `chat_processing_mode` setting first,
    /// falling back to whether the recent context looks like it's in
    /// combat. The two signals are never silently unified.
    pub fn resolve_family(&self, in_combat_detected: bool) -> &LlmFamilySettings {
        let use_tactical = match self.chat_processing_mode {
            Some(ChatProcessingMode::Tactical) => true,
            Some(ChatProcessingMode::General) => false,
            None => in_combat_detected,
        };
        if use_tactical {
            &self.tactical
        } else {
            &self.general
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> LlmFamilySettings {
        LlmFamilySettings {
            provider: "openai".into(),
            model: "gpt-4o".into(),
            base_url: None,
            api_version: None,
            timeout_sec: 30,
            max_retries: 2,
            custom_headers: HashMap::new(),
        }
    }

    fn settings() -> Settings {
        let mut tactical = family();
        tactical.provider = "anthropic".into();
        Settings {
            general: family(),
            tactical,
            maximum_message_context: 20,
            ai_role: "GM".into(),
            chat_processing_mode: None,
        }
    }

    #[test]
    fn normalize_keeps_in_range_values() {
        let s = settings().normalize();
        assert_eq!(s.maximum_message_context, 20);
        assert_eq!(s.general.timeout_sec, 30);
    }

    #[test]
    fn normalize_rejects_out_of_range_context_to_default() {
        let mut s = settings();
        s.maximum_message_context = 0;
        let s = s.normalize();
        assert_eq!(s.maximum_message_context, d_max_context());
    }

    #[test]
    fn normalize_rejects_out_of_range_timeout() {
        let mut s = settings();
        s.general.timeout_sec = 99_999;
        let s = s.normalize();
        assert_eq!(s.general.timeout_sec, d_timeout_sec());
    }

    #[test]
    fn explicit_mode_wins_over_detection() {
        let mut s = settings();
        s.chat_processing_mode = Some(ChatProcessingMode::Tactical);
        // Even with no combat detected, the explicit setting wins.
        let family = s.resolve_family(false);
        assert_eq!(family.provider, s.tactical.provider);
    }

    #[test]
    fn detection_used_when_no_explicit_mode() {
        let s = settings();
        let family = s.resolve_family(true);
        assert_eq!(family.provider, s.tactical.provider);

        let family = s.resolve_family(false);
        assert_eq!(family.provider, s.general.provider);
    }
}
