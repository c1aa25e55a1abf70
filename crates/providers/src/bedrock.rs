//! AWS Bedrock stub adapter.
//!
//! Native Bedrock SigV4 auth requires the `aws-sigv4`/`aws-credential-types`
//! crates, which this crate doesn't otherwise need. This stub registers the
//! `aws_bedrock` provider kind so the config option is recognized, but its
//! runtime method always returns an actionable error pointing at Bedrock's
//! OpenAI-compatible gateway instead.
//!
//! ```toml
//! [[llm.providers]]
//! id = "bedrock"
//! kind = "openai_compat"
//! base_url = "https://bedrock-runtime.us-east-1.amazonaws.com/v1"
//! ```

use ab_domain::config::ProviderConfig;
use ab_domain::error::{Error, Result};

use crate::traits::{ChatRequest, CompletionResult, LlmProvider};

const STUB_MSG: &str = "AWS Bedrock native SigV4 auth is not implemented. Use \
kind = \"openai_compat\" with Bedrock's OpenAI-compatible endpoint instead: \
base_url = \"https://bedrock-runtime.<region>.amazonaws.com/v1\", with IAM \
credentials configured externally.";

pub struct BedrockProvider {
    id: String,
}

impl BedrockProvider {
    pub fn new(cfg: &ProviderConfig) -> Self {
        tracing::warn!(
            provider_id = %cfg.id,
            "AWS Bedrock provider registered as a stub; see BedrockProvider docs"
        );
        Self { id: cfg.id.clone() }
    }
}

#[async_trait::async_trait]
impl LlmProvider for BedrockProvider {
    async fn chat(&self, _req: &ChatRequest) -> Result<CompletionResult> {
        Err(Error::ProviderError { provider: self.id.clone(), message: STUB_MSG.into() })
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
