//! LLM provider trait and request configuration.
//!
//! Grounded on `astrid-llm::provider::{LlmProvider, ProviderConfig}`,
//! generalized to the `hearth-core` conversation data model and the
//! spec's streaming event vocabulary.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use hearth_core::{HearthResult, Message};

use crate::stream_event::StreamEvent;

/// Boxed stream of parsed streaming events.
pub type StreamBox = Pin<Box<dyn Stream<Item = HearthResult<StreamEvent>> + Send>>;

/// A tool schema declared to the LLM so it can emit `tool_use` blocks
/// against it.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Tool name, matched against `ContentBlock::ToolUse.name`.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON Schema describing the tool's input shape.
    pub input_schema: serde_json::Value,
}

/// Everything one streaming request needs beyond the message history:
/// the system prompt and the declared tool set.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    /// System prompt text (agent base text + cwd/platform/runtime
    /// identity, composed by the caller).
    pub system: String,
    /// Tool schemas to attach, if tools are enabled for this turn.
    pub tools: Vec<ToolDefinition>,
}

/// Implementors provide streaming access to a language model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, for logging and telemetry.
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;

    /// Stream a completion over the given message history.
    async fn stream(&self, messages: &[Message], spec: &RequestSpec) -> HearthResult<StreamBox>;

    /// The model's context window, in tokens, used by the token
    /// accountant's pressure thresholds.
    fn max_context_length(&self) -> usize;
}

/// Configuration shared by all providers.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key. Never logged or serialized (see [`std::fmt::Debug`] impl).
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
    /// Sampling temperature, clamped to `[0.0, 1.0]`.
    pub temperature: f64,
    /// Override API base URL (for proxies / compatible endpoints).
    pub base_url: Option<String>,
    /// Context window override; falls back to the provider's built-in
    /// default for the model when unset.
    pub context_window: Option<usize>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("has_api_key", &!self.api_key.is_empty())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("has_base_url", &self.base_url.is_some())
            .field("context_window", &self.context_window)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a config with an API key and model, other fields defaulted.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.7,
            base_url: None,
            context_window: None,
        }
    }

    /// Set the max-tokens field.
    #[must_use]
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    /// Set the temperature field, clamped to `[0.0, 1.0]`.
    #[must_use]
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp.clamp(0.0, 1.0);
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the context window size.
    #[must_use]
    pub fn with_context_window(mut self, size: usize) -> Self {
        self.context_window = Some(size);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_api_key() {
        let config = ProviderConfig::new("sk-super-secret", "claude-test");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-super-secret"));
        assert!(debug.contains("has_api_key: true"));
    }

    #[test]
    fn temperature_is_clamped() {
        let config = ProviderConfig::new("k", "m").with_temperature(5.0);
        assert_eq!(config.temperature, 1.0);
    }
}
