#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Streaming LLM client, error classification, and retry policy.
//!
//! [`provider::LlmProvider`] is the seam the conversation engine drives;
//! [`claude::ClaudeProvider`] is the Anthropic-compatible implementation.
//! [`retry::retry_with_policy`] and [`circuit::CircuitBreaker`] wrap every
//! call per the error-classifier/retry-policy design.

mod circuit;
mod claude;
mod provider;
mod retry;
mod stream_event;

pub use circuit::CircuitBreaker;
pub use claude::ClaudeProvider;
pub use provider::{LlmProvider, ProviderConfig, RequestSpec, StreamBox, ToolDefinition};
pub use retry::{compute_backoff, retry_with_policy, RetryConfig};
pub use stream_event::StreamEvent;
