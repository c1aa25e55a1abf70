//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent` API. Auth is an API key passed as
//! a query parameter (`key={api_key}`), not a header.

use std::sync::Arc;

use ab_domain::config::ProviderConfig;
use ab_domain::conversation::{ConversationMessage, ToolCall, ToolDefinition};
use ab_domain::error::{Error, Result};
use serde_json::Value;

use crate::traits::{ChatRequest, CompletionResult, LlmProvider, Usage};
use crate::util::from_reqwest;

pub struct GoogleProvider {
    id: String,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    client: Arc<reqwest::Client>,
}

impl GoogleProvider {
    pub fn new(cfg: &ProviderConfig, api_key: Option<String>, client: Arc<reqwest::Client>) -> Self {
        Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg.default_model.clone().unwrap_or_else(|| "gemini-2.0-flash".into()),
            client,
        }
    }

    fn generate_url(&self, model: &str) -> String {
        let key = self.api_key.as_deref().unwrap_or("");
        format!("{}/v1beta/models/{}:generateContent?key={}", self.base_url, model, key)
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let mut contents: Vec<Value> = Vec::new();
        let mut system_instruction: Option<Value> = None;

        for msg in &req.messages {
            match msg {
                ConversationMessage::System { content } => {
                    system_instruction = Some(serde_json::json!({ "parts": [{"text": content}] }));
                }
                ConversationMessage::User { content, .. } => {
                    contents.push(serde_json::json!({
                        "role": "user",
                        "parts": [{"text": content}],
                    }));
                }
                ConversationMessage::Assistant { content, tool_calls } => {
                    contents.push(assistant_to_gemini(content, tool_calls));
                }
                ConversationMessage::Tool { tool_call_id, content } => {
                    // Gemini keys function responses by function name, which
                    // we don't retain on the tool message; the call id is
                    // the best correlation we can forward.
                    contents.push(serde_json::json!({
                        "role": "user",
                        "parts": [{
                            "functionResponse": {
                                "name": tool_call_id,
                                "response": { "content": content },
                            }
                        }],
                    }));
                }
            }
        }

        let mut body = serde_json::json!({ "contents": contents });
        if let Some(si) = system_instruction {
            body["systemInstruction"] = si;
        }
        if !req.tools.is_empty() {
            let decls: Vec<Value> = req.tools.iter().map(tool_to_gemini).collect();
            body["tools"] = serde_json::json!([{ "functionDeclarations": decls }]);
        }

        let mut gen_config = serde_json::json!({ "temperature": req.temperature });
        if let Some(max) = req.max_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(max);
        }
        body["generationConfig"] = gen_config;

        body
    }
}

fn assistant_to_gemini(content: &str, tool_calls: &[ToolCall]) -> Value {
    let mut parts: Vec<Value> = Vec::new();
    if !content.is_empty() {
        parts.push(serde_json::json!({ "text": content }));
    }
    for tc in tool_calls {
        parts.push(serde_json::json!({
            "functionCall": { "name": tc.name, "args": tc.arguments_json },
        }));
    }
    serde_json::json!({ "role": "model", "parts": parts })
}

fn tool_to_gemini(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

fn parse_gemini_response(body: &Value, provider_id: &str, model: &str) -> Result<CompletionResult> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::ProviderError {
            provider: provider_id.to_string(),
            message: "no candidates in response".into(),
        })?;

    let parts = candidate.get("content").and_then(|c| c.get("parts")).and_then(|p| p.as_array());

    let mut text_content = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    if let Some(parts) = parts {
        for part in parts {
            if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                text_content.push_str(text);
            }
            if let Some(fc) = part.get("functionCall") {
                let name = fc.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let arguments_json = fc.get("args").cloned().unwrap_or(Value::Object(Default::default()));
                tool_calls.push(ToolCall { id: format!("call_{}", uuid::Uuid::new_v4()), name, arguments_json });
            }
        }
    }

    let finish_reason = candidate.get("finishReason").and_then(|v| v.as_str()).map(|s| match s {
        "STOP" => "stop".to_string(),
        "MAX_TOKENS" => "length".to_string(),
        other => other.to_lowercase(),
    });

    let usage = body.get("usageMetadata").and_then(parse_gemini_usage);

    Ok(CompletionResult {
        content: text_content,
        tool_calls,
        finish_reason,
        usage,
        provider_id: provider_id.to_string(),
        model_id: model.to_string(),
    })
}

fn parse_gemini_usage(v: &Value) -> Option<Usage> {
    let prompt = v.get("promptTokenCount")?.as_u64()? as u32;
    let completion = v.get("candidatesTokenCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let total = v
        .get("totalTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or((prompt + completion) as u64) as u32;
    Some(Usage { prompt_tokens: prompt, completion_tokens: completion, total_tokens: total })
}

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<CompletionResult> {
        let model = req.model.clone().unwrap_or_else(|| self.default_model.clone());
        let url = self.generate_url(&model);
        let body = self.build_body(req);

        tracing::debug!(provider = %self.id, model = %model, "google chat request");

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::ProviderError {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_gemini_response(&resp_json, &self.id, &model)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
