//! Anthropic-native adapter.
//!
//! Implements the Anthropic Messages API, including tool use, and the
//! Anthropic-specific message structure where system content goes in a
//! separate top-level `system` field rather than as a message.

use std::sync::Arc;

use ab_domain::config::ProviderConfig;
use ab_domain::conversation::{ConversationMessage, ToolCall, ToolDefinition};
use ab_domain::error::{Error, Result};
use serde_json::Value;

use crate::traits::{ChatRequest, CompletionResult, LlmProvider, Usage};
use crate::util::from_reqwest;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    id: String,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    client: Arc<reqwest::Client>,
}

impl AnthropicProvider {
    pub fn new(cfg: &ProviderConfig, api_key: Option<String>, client: Arc<reqwest::Client>) -> Self {
        Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg
                .default_model
                .clone()
                .unwrap_or_else(|| "claude-sonnet-4-20250514".into()),
            client,
        }
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        req
    }

    fn build_messages_body(&self, req: &ChatRequest) -> Value {
        let model = req.model.clone().unwrap_or_else(|| self.default_model.clone());

        let mut system_parts: Vec<String> = Vec::new();
        let mut api_messages: Vec<Value> = Vec::new();

        for msg in &req.messages {
            match msg {
                ConversationMessage::System { content } => system_parts.push(content.clone()),
                ConversationMessage::User { content, .. } => {
                    api_messages.push(serde_json::json!({ "role": "user", "content": content }));
                }
                ConversationMessage::Assistant { content, tool_calls } => {
                    api_messages.push(assistant_to_anthropic(content, tool_calls));
                }
                ConversationMessage::Tool { tool_call_id, content } => {
                    // Anthropic expects tool results as user messages with
                    // tool_result content blocks.
                    api_messages.push(serde_json::json!({
                        "role": "user",
                        "content": [{
                            "type": "tool_result",
                            "tool_use_id": tool_call_id,
                            "content": content,
                        }],
                    }));
                }
            }
        }

        let mut body = serde_json::json!({
            "model": model,
            "messages": api_messages,
            "temperature": req.temperature,
            "max_tokens": req.max_tokens.unwrap_or(4096),
        });

        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_anthropic).collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }
}

fn assistant_to_anthropic(content: &str, tool_calls: &[ToolCall]) -> Value {
    let mut blocks: Vec<Value> = Vec::new();
    if !content.is_empty() {
        blocks.push(serde_json::json!({ "type": "text", "text": content }));
    }
    for tc in tool_calls {
        blocks.push(serde_json::json!({
            "type": "tool_use",
            "id": tc.id,
            "name": tc.name,
            "input": tc.arguments_json,
        }));
    }
    serde_json::json!({ "role": "assistant", "content": blocks })
}

fn tool_to_anthropic(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters,
    })
}

fn parse_anthropic_response(body: &Value, provider_id: &str, model: &str) -> Result<CompletionResult> {
    let content_arr = body.get("content").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    let mut text_parts: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    for block in &content_arr {
        match block.get("type").and_then(|v| v.as_str()).unwrap_or("") {
            "text" => {
                if let Some(t) = block.get("text").and_then(|v| v.as_str()) {
                    text_parts.push(t.to_string());
                }
            }
            "tool_use" => {
                let id = block.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let name = block.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let arguments_json =
                    block.get("input").cloned().unwrap_or(Value::Object(Default::default()));
                tool_calls.push(ToolCall { id, name, arguments_json });
            }
            _ => {}
        }
    }

    let finish_reason = body.get("stop_reason").and_then(|v| v.as_str()).map(|s| match s {
        "end_turn" => "stop".to_string(),
        "tool_use" => "tool_calls".to_string(),
        other => other.to_string(),
    });

    let usage = body.get("usage").and_then(parse_anthropic_usage);

    Ok(CompletionResult {
        content: text_parts.join(""),
        tool_calls,
        finish_reason,
        usage,
        provider_id: provider_id.to_string(),
        model_id: model.to_string(),
    })
}

fn parse_anthropic_usage(v: &Value) -> Option<Usage> {
    let input = v.get("input_tokens")?.as_u64()? as u32;
    let output = v.get("output_tokens")?.as_u64()? as u32;
    Some(Usage { prompt_tokens: input, completion_tokens: output, total_tokens: input + output })
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<CompletionResult> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_messages_body(req);
        let model = req.model.clone().unwrap_or_else(|| self.default_model.clone());

        tracing::debug!(provider = %self.id, url = %url, "anthropic chat request");

        let resp = self.authed_post(&url).json(&body).send().await.map_err(from_reqwest)?;
        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::ProviderError {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_anthropic_response(&resp_json, &self.id, &model)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
