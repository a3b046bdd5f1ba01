//! Inference endpoint seam and its OpenAI-compatible implementation.

use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateChatCompletionResponse, FinishReason};
use async_openai::Client;
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::config::Config;

use super::request::build_chat_request;
use super::types::{CompletionRequest, CompletionResponse, ContentBlock, StopReason, ToolUseBlock};

/// Anything that can answer a [`CompletionRequest`].
///
/// Transport failures are returned as `Err` and are not retried here.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Chat-completions client (OpenAI or any compatible base URL).
/// The API key is read from `OPENAI_API_KEY`.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiClient {
    pub fn new(config: Config) -> Self {
        let mut sdk_config = OpenAIConfig::new();
        if let Some(base) = &config.api_base {
            sdk_config = sdk_config.with_api_base(base);
        }
        Self { client: Client::with_config(sdk_config), config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Map the first choice of a chat-completions response onto content blocks.
pub(crate) fn from_chat_response(resp: CreateChatCompletionResponse) -> Result<CompletionResponse> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| eyre!("completion response contained no choices"))?;

    let mut content = Vec::new();
    if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
        content.push(ContentBlock::Text { text });
    }
    let calls = choice.message.tool_calls.unwrap_or_default();
    let has_calls = !calls.is_empty();
    for call in calls {
        content.push(ContentBlock::ToolUse(ToolUseBlock {
            id: call.id,
            input: parse_arguments(&call.function.arguments),
            name: call.function.name,
        }));
    }

    let stop_reason = match choice.finish_reason {
        _ if has_calls => StopReason::ToolUse,
        Some(FinishReason::ToolCalls) => StopReason::ToolUse,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        Some(FinishReason::Stop) | None => StopReason::EndTurn,
        Some(other) => StopReason::Other(format!("{other:?}")),
    };
    Ok(CompletionResponse { stop_reason, content })
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    #[instrument(name = "openai_complete", skip(self, request), fields(messages = request.messages.len(), tools = request.offers_tools()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let req = build_chat_request(request, &self.config)?;
        info!(target: "openai", model = %self.config.model, tools_offered = request.offers_tools(), "chat_request");
        let resp = self.client.chat().create(req).await?;
        debug!(target: "openai", choices = resp.choices.len(), "chat_response");
        from_chat_response(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_arguments_survive_as_string() {
        assert_eq!(parse_arguments(r#"{"query":"a"}"#), json!({"query": "a"}));
        assert_eq!(parse_arguments("{oops"), Value::String("{oops".into()));
        assert_eq!(parse_arguments(""), json!({}));
    }

    #[test]
    fn tool_call_response_maps_to_tool_use() -> Result<()> {
        let resp: CreateChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "search_course_content", "arguments": "{\"query\":\"MCP\"}"}
                    }]
                }
            }]
        }))?;
        let mapped = from_chat_response(resp)?;
        assert!(mapped.wants_tools());
        let uses = mapped.tool_uses();
        assert_eq!(uses[0].id, "call_1");
        assert_eq!(uses[0].input, json!({"query": "MCP"}));
        Ok(())
    }
}
