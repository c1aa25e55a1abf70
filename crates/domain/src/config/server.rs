use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Grace window after a connection closes before its ClientInbox is torn down.
    #[serde(default = "d_inbox_grace_secs")]
    pub inbox_grace_secs: u64,
    /// Timeout for the initial `connect` handshake frame.
    #[serde(default = "d_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            inbox_grace_secs: d_inbox_grace_secs(),
            handshake_timeout_secs: d_handshake_timeout_secs(),
        }
    }
}

fn d_port() -> u16 {
    8787
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_inbox_grace_secs() -> u64 {
    60
}
fn d_handshake_timeout_secs() -> u64 {
    10
}
