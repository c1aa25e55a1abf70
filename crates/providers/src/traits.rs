//! Provider-agnostic request/response types and the `LlmProvider` adapter
//! trait (ProviderGateway, C4).

use ab_domain::conversation::{ConversationMessage, ToolCall, ToolDefinition};
use ab_domain::error::Result;

/// A chat completion call, already resolved to one concrete provider/model.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ConversationMessage>,
    pub tools: Vec<ToolDefinition>,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The result of a completed chat call.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
    pub provider_id: String,
    pub model_id: String,
}

/// Trait every LLM adapter implements. Non-streaming only — this system
/// never forwards incremental deltas to the frontend, so there is no
/// consumer for a stream.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<CompletionResult>;

    fn provider_id(&self) -> &str;
}
