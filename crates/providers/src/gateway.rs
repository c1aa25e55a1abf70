//! `ProviderGateway` (C4): the single entry point the rest of the system
//! calls through — "send chat completion with optional tool schema" over
//! whichever provider/model a given request names, with auth resolution,
//! timeouts, and transport-level retry handled uniformly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ab_domain::config::{AuthMode, LlmConfig, ProviderConfig, ProviderKind};
use ab_domain::conversation::{ConversationMessage, ToolDefinition};
use ab_domain::error::{Error, Result};

use crate::anthropic::AnthropicProvider;
use crate::bedrock::BedrockProvider;
use crate::google::GoogleProvider;
use crate::keystore::KeyStore;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::{ChatRequest, CompletionResult, LlmProvider};

/// Per-call overrides layered on top of a provider's registered defaults.
pub struct ChatConfig {
    pub provider_id: String,
    pub model_id: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_sec: u64,
    pub max_retries: u32,
}

impl ChatConfig {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_id: None,
            temperature: 0.1,
            max_tokens: None,
            timeout_sec: 30,
            max_retries: 0,
        }
    }
}

pub struct ProviderGateway {
    providers: HashMap<String, ProviderConfig>,
    client: Arc<reqwest::Client>,
    key_store: Arc<dyn KeyStore>,
}

impl ProviderGateway {
    pub fn new(config: &LlmConfig, key_store: Arc<dyn KeyStore>) -> Result<Self> {
        let client = Arc::new(
            reqwest::Client::builder()
                .timeout(Duration::from_millis(config.default_timeout_ms))
                .build()
                .map_err(|e| Error::Transport(e.to_string()))?,
        );
        let providers = config.providers.iter().map(|p| (p.id.clone(), p.clone())).collect();
        Ok(Self { providers, client, key_store })
    }

    fn build_adapter(&self, cfg: &ProviderConfig, api_key: Option<String>) -> Arc<dyn LlmProvider> {
        match cfg.kind {
            ProviderKind::OpenaiCompat | ProviderKind::AzureOpenai => {
                Arc::new(OpenAiCompatProvider::new(cfg, api_key, self.client.clone()))
            }
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(cfg, api_key, self.client.clone())),
            ProviderKind::Google => Arc::new(GoogleProvider::new(cfg, api_key, self.client.clone())),
            ProviderKind::AwsBedrock => Arc::new(BedrockProvider::new(cfg)),
        }
    }

    /// Resolve the provider's API key. `AuthMode::NotRequired` providers
    /// (local models) get a placeholder and always proceed; `ApiKey`
    /// providers fail fast when the key store has nothing for them.
    fn resolve_key(&self, cfg: &ProviderConfig) -> Result<Option<String>> {
        match cfg.auth.mode {
            AuthMode::NotRequired => Ok(None),
            AuthMode::ApiKey => match self.key_store.get_key(&cfg.id) {
                Some(key) => Ok(Some(key)),
                None => Err(Error::MissingApiKey(cfg.id.clone())),
            },
        }
    }

    /// Send a chat completion request and wait for the full response.
    pub async fn complete(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
        call: &ChatConfig,
    ) -> Result<CompletionResult> {
        let cfg = self
            .providers
            .get(&call.provider_id)
            .ok_or_else(|| Error::ProviderNotFound(call.provider_id.clone()))?;

        let api_key = self.resolve_key(cfg)?;
        let adapter = self.build_adapter(cfg, api_key);

        let req = ChatRequest {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            model: call.model_id.clone(),
            temperature: call.temperature,
            max_tokens: call.max_tokens,
        };

        let mut attempt = 0;
        loop {
            let outcome = tokio::time::timeout(Duration::from_secs(call.timeout_sec), adapter.chat(&req)).await;

            let result = match outcome {
                Ok(inner) => inner,
                Err(_) => Err(Error::Timeout(call.provider_id.clone())),
            };

            match result {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < call.max_retries && is_transport_error(&e) => {
                    tracing::warn!(
                        provider = %call.provider_id,
                        attempt,
                        error = %e,
                        "transport error, retrying"
                    );
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transport_error(e: &Error) -> bool {
    matches!(e, Error::Transport(_) | Error::Timeout(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::config::{AuthConfig, ProviderConfig, ProviderKind};

    fn provider(id: &str, mode: AuthMode) -> ProviderConfig {
        ProviderConfig {
            id: id.into(),
            kind: ProviderKind::OpenaiCompat,
            base_url: "https://example.invalid".into(),
            auth: AuthConfig { mode, header: None, prefix: None, env: None },
            default_model: None,
            suppress_base_url_override: false,
        }
    }

    struct EmptyKeyStore;
    impl KeyStore for EmptyKeyStore {
        fn get_key(&self, _provider_id: &str) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn unknown_provider_id_is_provider_not_found() {
        let config = LlmConfig { providers: vec![provider("openai", AuthMode::ApiKey)], ..Default::default() };
        let gw = ProviderGateway::new(&config, Arc::new(EmptyKeyStore)).unwrap();
        let err = gw.complete(&[], &[], &ChatConfig::new("nonexistent")).await.unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound(id) if id == "nonexistent"));
    }

    #[tokio::test]
    async fn missing_key_for_api_key_provider_fails_fast() {
        let config = LlmConfig { providers: vec![provider("openai", AuthMode::ApiKey)], ..Default::default() };
        let gw = ProviderGateway::new(&config, Arc::new(EmptyKeyStore)).unwrap();
        let err = gw.complete(&[], &[], &ChatConfig::new("openai")).await.unwrap_err();
        assert!(matches!(err, Error::MissingApiKey(id) if id == "openai"));
    }

    #[tokio::test]
    async fn not_required_provider_skips_key_check() {
        // With no key store entry and AuthMode::NotRequired, resolve_key
        // returns Ok(None) rather than failing fast; the (stubbed) HTTP
        // call downstream may still fail, but not with MissingApiKey.
        let config = LlmConfig { providers: vec![provider("local", AuthMode::NotRequired)], ..Default::default() };
        let gw = ProviderGateway::new(&config, Arc::new(EmptyKeyStore)).unwrap();
        let cfg = gw.providers.get("local").unwrap();
        assert!(gw.resolve_key(cfg).unwrap().is_none());
    }
}
