//! `KeyStore` — the out-of-scope external collaborator named in the system
//! overview, resolving a provider id to an API key. The encrypted on-disk
//! store and CLI key-management wizard are not part of this crate; only two
//! concrete doubles are, for wiring the gateway up without them.

use std::collections::HashMap;

pub trait KeyStore: Send + Sync {
    /// Look up the API key for a provider id. `None` means no key is
    /// configured, which the gateway turns into `MissingApiKey`.
    fn get_key(&self, provider_id: &str) -> Option<String>;
}

/// Fixed id → key map, useful for tests and for embedding a small number of
/// keys directly in a deployment's own config loader.
pub struct StaticKeyStore {
    keys: HashMap<String, String>,
}

impl StaticKeyStore {
    pub fn new(keys: HashMap<String, String>) -> Self {
        Self { keys }
    }
}

impl KeyStore for StaticKeyStore {
    fn get_key(&self, provider_id: &str) -> Option<String> {
        self.keys.get(provider_id).cloned()
    }
}

/// Reads `<PROVIDER_ID>_API_KEY` (id uppercased, hyphens turned to
/// underscores) from the process environment — a single fixed naming
/// convention, no plaintext-config or keychain modes.
pub struct EnvKeyStore;

impl EnvKeyStore {
    fn env_var_name(provider_id: &str) -> String {
        format!("{}_API_KEY", provider_id.to_uppercase().replace('-', "_"))
    }
}

impl KeyStore for EnvKeyStore {
    fn get_key(&self, provider_id: &str) -> Option<String> {
        std::env::var(Self::env_var_name(provider_id)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_store_reads_upper_snake_var() {
        std::env::set_var("MY_PROVIDER_API_KEY", "secret-123");
        let ks = EnvKeyStore;
        assert_eq!(ks.get_key("my-provider"), Some("secret-123".to_string()));
        std::env::remove_var("MY_PROVIDER_API_KEY");
    }

    #[test]
    fn env_key_store_missing_var_is_none() {
        let ks = EnvKeyStore;
        assert_eq!(ks.get_key("ghost-provider-xyz"), None);
    }

    #[test]
    fn static_key_store_returns_configured_key() {
        let mut keys = HashMap::new();
        keys.insert("openai".to_string(), "sk-abc".to_string());
        let ks = StaticKeyStore::new(keys);
        assert_eq!(ks.get_key("openai"), Some("sk-abc".to_string()));
        assert_eq!(ks.get_key("anthropic"), None);
    }
}
