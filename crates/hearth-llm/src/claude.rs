//! Anthropic-compatible streaming wire client.
//!
//! Grounded on `astrid-llm::claude::ClaudeProvider`: request construction,
//! SSE framing, and tool-use JSON reassembly all follow the teacher's
//! shape, generalized to the `hearth-core` message model, the spec's
//! thinking-block and cache-control requirements, and error classification
//! through [`HearthError`] instead of a provider-local error enum.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use hearth_core::{ContentBlock, HearthError, HearthResult, Message, Role, Usage};

use crate::provider::{LlmProvider, ProviderConfig, RequestSpec, StreamBox};
use crate::stream_event::StreamEvent;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude (Anthropic) streaming provider.
pub struct ClaudeProvider {
    client: Client,
    config: ProviderConfig,
}

impl ClaudeProvider {
    /// Build a provider from `config`.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_request(&self, messages: &[Message], spec: &RequestSpec) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .enumerate()
            .map(|(i, m)| Self::convert_message(m, i >= messages.len().saturating_sub(2)))
            .collect();

        let mut request = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": api_messages,
            "stream": true,
        });

        if !spec.system.is_empty() {
            request["system"] = serde_json::json!([{
                "type": "text",
                "text": spec.system,
                "cache_control": {"type": "ephemeral"},
            }]);
        }

        if !spec.tools.is_empty() {
            let api_tools: Vec<Value> = spec
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema,
                    })
                })
                .collect();
            request["tools"] = Value::Array(api_tools);
        }

        request
    }

    /// Convert one message to wire format. `cacheable` marks the last two
    /// stable messages so prompt caching covers the bulk of the history
    /// without invalidating on every turn.
    fn convert_message(message: &Message, cacheable: bool) -> Value {
        let role = match message.role {
            Role::Assistant => "assistant",
            Role::User | Role::System => "user",
        };

        let content: Vec<Value> = message
            .content
            .iter()
            .map(|block| Self::convert_block(block))
            .collect();

        let mut value = serde_json::json!({ "role": role, "content": content });
        if cacheable {
            if let Some(last) = value["content"].as_array_mut().and_then(|a| a.last_mut()) {
                last["cache_control"] = serde_json::json!({"type": "ephemeral"});
            }
        }
        value
    }

    fn convert_block(block: &ContentBlock) -> Value {
        match block {
            ContentBlock::Text { text } => serde_json::json!({"type": "text", "text": text}),
            ContentBlock::Thinking { text } => {
                serde_json::json!({"type": "thinking", "thinking": text})
            },
            ContentBlock::Image { media_type, data } => serde_json::json!({
                "type": "image",
                "source": {"type": "base64", "media_type": media_type, "data": data},
            }),
            ContentBlock::Document { media_type, data } => serde_json::json!({
                "type": "document",
                "source": {"type": "base64", "media_type": media_type, "data": data},
            }),
            ContentBlock::ToolUse { id, name, input } => serde_json::json!({
                "type": "tool_use", "id": id, "name": name, "input": input,
            }),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => serde_json::json!({
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": content,
                "is_error": is_error,
            }),
        }
    }

    fn classify_status(status: reqwest::StatusCode, body: &str, headers: &reqwest::header::HeaderMap) -> HearthError {
        let code = status.as_u16();
        match code {
            401 | 403 => HearthError::Authentication {
                message: format!("status {code}: {body}"),
                details: std::collections::HashMap::new(),
            },
            400 | 422 => HearthError::Validation {
                message: format!("status {code}: {body}"),
                details: std::collections::HashMap::new(),
            },
            429 => {
                let retry_after_ms = headers
                    .get("retry-after-ms")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .or_else(|| {
                        headers
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(|secs| secs * 1000)
                    });
                HearthError::RateLimit {
                    message: format!("status 429: {body}"),
                    retry_after_ms,
                    details: std::collections::HashMap::new(),
                }
            },
            408 | 409 | 500 | 502 | 503 | 504 => HearthError::ServerError {
                message: format!("status {code}: {body}"),
                code: Some(code),
                details: std::collections::HashMap::new(),
            },
            _ if status.is_client_error() => HearthError::ClientError {
                message: format!("status {code}: {body}"),
                code: Some(code),
                details: std::collections::HashMap::new(),
            },
            _ => HearthError::Unknown {
                message: format!("status {code}: {body}"),
                details: std::collections::HashMap::new(),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[allow(clippy::too_many_lines)]
    async fn stream(&self, messages: &[Message], spec: &RequestSpec) -> HearthResult<StreamBox> {
        if self.config.api_key.is_empty() {
            return Err(HearthError::Authentication {
                message: "no API key configured".to_string(),
                details: std::collections::HashMap::new(),
            });
        }

        let request_body = self.build_request(messages, spec);
        let url = self.config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL);

        debug!(model = self.config.model, "starting Claude stream");

        let mut api_key_header = reqwest::header::HeaderValue::try_from(&self.config.api_key)
            .map_err(|e| HearthError::Validation {
                message: format!("invalid API key characters: {e}"),
                details: std::collections::HashMap::new(),
            })?;
        api_key_header.set_sensitive(true);

        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key_header)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Claude API error");
            return Err(Self::classify_status(status, &body, &headers));
        }

        let stream = try_stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut current_tool_id = String::new();
            let mut current_tool_json = String::new();

            while let Some(chunk) = bytes_stream.next().await {
                let chunk = chunk.map_err(classify_reqwest_error)?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(event_end) = buffer.find("\n\n") {
                    let event_data = buffer[..event_end].to_string();
                    let rest_start = event_end.checked_add(2).unwrap_or(buffer.len());
                    buffer = buffer[rest_start..].to_string();

                    for line in event_data.lines() {
                        let Some(data) = line.strip_prefix("data: ") else { continue };
                        if data == "[DONE]" {
                            yield StreamEvent::Done;
                            continue;
                        }

                        let Ok(event) = serde_json::from_str::<WireEvent>(data) else { continue };
                        match event {
                            WireEvent::ContentBlockStart { content_block, .. } => match content_block {
                                WireContentBlock::Text { .. } => yield StreamEvent::TextBlockStart,
                                WireContentBlock::Thinking { .. } => yield StreamEvent::ThinkingBlockStart,
                                WireContentBlock::ToolUse { id, name, .. } => {
                                    current_tool_id = id.clone();
                                    current_tool_json.clear();
                                    yield StreamEvent::ToolUseBlockStart { id, name };
                                },
                            },
                            WireEvent::ContentBlockDelta { delta, .. } => match delta {
                                WireDelta::TextDelta { text } => yield StreamEvent::TextDelta(text),
                                WireDelta::ThinkingDelta { thinking } => {
                                    yield StreamEvent::ThinkingDelta(thinking);
                                },
                                WireDelta::InputJsonDelta { partial_json } => {
                                    current_tool_json.push_str(&partial_json);
                                    yield StreamEvent::ToolUseJsonDelta {
                                        id: current_tool_id.clone(),
                                        partial_json,
                                    };
                                },
                            },
                            WireEvent::ContentBlockStop { .. } => {
                                let tool_input = if current_tool_id.is_empty() {
                                    None
                                } else {
                                    let parsed = serde_json::from_str::<Value>(&current_tool_json)
                                        .unwrap_or_else(|_| Value::String(current_tool_json.clone()));
                                    current_tool_id.clear();
                                    current_tool_json.clear();
                                    Some(parsed)
                                };
                                yield StreamEvent::BlockStop { tool_input };
                            },
                            WireEvent::MessageDelta { usage, .. } => {
                                if let Some(usage) = usage {
                                    yield StreamEvent::UsageDelta(Usage {
                                        input_tokens: 0,
                                        output_tokens: usage.output_tokens,
                                        cache_creation_tokens: usage.cache_creation_input_tokens.unwrap_or(0),
                                        cache_read_tokens: usage.cache_read_input_tokens.unwrap_or(0),
                                    });
                                }
                            },
                            WireEvent::MessageStop => yield StreamEvent::MessageStop,
                            WireEvent::Error { error } => {
                                yield StreamEvent::Error(HearthError::Unknown {
                                    message: error.to_string(),
                                    details: std::collections::HashMap::new(),
                                });
                            },
                            WireEvent::MessageStart { .. } | WireEvent::Ping => {},
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn max_context_length(&self) -> usize {
        self.config.context_window.unwrap_or(200_000)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> HearthError {
    if err.is_timeout() {
        HearthError::timeout(err.to_string())
    } else {
        HearthError::network(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    MessageStart { message: Value },
    ContentBlockStart { index: usize, content_block: WireContentBlock },
    ContentBlockDelta { index: usize, delta: WireDelta },
    ContentBlockStop { index: usize },
    MessageDelta { delta: Value, usage: Option<WireDeltaUsage> },
    MessageStop,
    Ping,
    Error { error: Value },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContentBlock {
    Text { text: String },
    Thinking { thinking: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct WireDeltaUsage {
    output_tokens: u64,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolDefinition;

    #[test]
    fn build_request_attaches_system_cache_control() {
        let config = ProviderConfig::new("test-key", "claude-test");
        let provider = ClaudeProvider::new(config);
        let spec = RequestSpec {
            system: "You are helpful".to_string(),
            tools: vec![],
        };
        let request = provider.build_request(&[Message::user("hi")], &spec);
        assert_eq!(request["system"][0]["cache_control"]["type"], "ephemeral");
    }

    #[test]
    fn build_request_includes_declared_tools() {
        let config = ProviderConfig::new("test-key", "claude-test");
        let provider = ClaudeProvider::new(config);
        let spec = RequestSpec {
            system: String::new(),
            tools: vec![ToolDefinition {
                name: "Bash".to_string(),
                description: "run a shell command".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            }],
        };
        let request = provider.build_request(&[Message::user("hi")], &spec);
        assert_eq!(request["tools"][0]["name"], "Bash");
    }

    #[test]
    fn classify_status_maps_429_to_rate_limit_with_hint() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after-ms", "2000".parse().unwrap());
        let err = ClaudeProvider::classify_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down",
            &headers,
        );
        assert_eq!(err.retry_after_ms(), Some(2000));
        assert!(err.is_retryable());
    }

    #[test]
    fn classify_status_maps_401_to_non_retryable_authentication() {
        let headers = reqwest::header::HeaderMap::new();
        let err = ClaudeProvider::classify_status(reqwest::StatusCode::UNAUTHORIZED, "nope", &headers);
        assert!(!err.is_retryable());
        assert!(matches!(err, HearthError::Authentication { .. }));
    }

    #[tokio::test]
    async fn stream_without_api_key_fails_fast() {
        let config = ProviderConfig::new("", "claude-test");
        let provider = ClaudeProvider::new(config);
        let err = provider.stream(&[], &RequestSpec::default()).await.unwrap_err();
        assert!(matches!(err, HearthError::Authentication { .. }));
    }
}
