//! Unified error taxonomy shared by the LLM client, tool executor, hook
//! runner, and config resolver.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// The error taxonomy named in the error-handling design: every LLM call
/// and every tool call is wrapped and classified into one of these kinds.
#[derive(Debug, Error)]
pub enum HearthError {
    /// Connection failures, DNS resolution failures. Retryable.
    #[error("network error: {message}")]
    Network {
        /// Human-readable description.
        message: String,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// Request exceeded its deadline. Retryable.
    #[error("timeout: {message}")]
    Timeout {
        /// Human-readable description.
        message: String,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// HTTP 429 or provider-signalled rate limiting. Retryable; backoff
    /// honors a server-provided `retry-after`/`retry-after-ms` hint when
    /// present.
    #[error("rate limited: {message}")]
    RateLimit {
        /// Human-readable description.
        message: String,
        /// Milliseconds the server asked us to wait, if it said so.
        retry_after_ms: Option<u64>,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// HTTP 401/403 or equivalent. Not retryable.
    #[error("authentication error: {message}")]
    Authentication {
        /// Human-readable description.
        message: String,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// HTTP 400 or equivalent malformed-request error. Not retryable.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description.
        message: String,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// HTTP 5xx, 408, 409. Retryable.
    #[error("server error: {message}")]
    ServerError {
        /// Human-readable description.
        message: String,
        /// HTTP-like status code, if known.
        code: Option<u16>,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// Any other 4xx-class failure. Not retryable.
    #[error("client error: {message}")]
    ClientError {
        /// Human-readable description.
        message: String,
        /// HTTP-like status code, if known.
        code: Option<u16>,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// Work was cancelled. Not retried; propagated so the caller can
    /// terminate the turn cleanly.
    #[error("cancelled")]
    Cancelled,
    /// A tool's own execution failure. Becomes a `tool_result` with
    /// `is_error=true`; the conversation continues.
    #[error("tool error: {message}")]
    ToolError {
        /// Human-readable description.
        message: String,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// A hook subprocess or callback failure. Logged; the conversation
    /// continues unless the hook had mandatory-gate semantics.
    #[error("hook error: {message}")]
    HookError {
        /// Human-readable description.
        message: String,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// Configuration load, parse, or validation failure.
    #[error("config error: {message}")]
    ConfigError {
        /// Human-readable description.
        message: String,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
    /// Anything that doesn't fit the above. Not retried.
    #[error("unknown error: {message}")]
    Unknown {
        /// Human-readable description.
        message: String,
        /// Structured detail.
        details: HashMap<String, Value>,
    },
}

impl HearthError {
    /// Build a simple variant with no structured details, for the common
    /// case of a plain message.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Build a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Build a tool error.
    #[must_use]
    pub fn tool(message: impl Into<String>) -> Self {
        Self::ToolError {
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Build a hook error.
    #[must_use]
    pub fn hook(message: impl Into<String>) -> Self {
        Self::HookError {
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Build a config error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Classify per §4.2: whether the retry policy should attempt this
    /// error again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimit { .. } | Self::ServerError { .. }
        )
    }

    /// The `retry-after` hint in milliseconds, if this is a rate-limit
    /// error carrying one.
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

/// Result type used throughout the workspace wherever a `HearthError` can
/// occur.
pub type HearthResult<T> = Result<T, HearthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(HearthError::network("x").is_retryable());
        assert!(HearthError::timeout("x").is_retryable());
        assert!(HearthError::ServerError {
            message: "x".into(),
            code: Some(503),
            details: HashMap::new()
        }
        .is_retryable());
        assert!(!HearthError::Authentication {
            message: "x".into(),
            details: HashMap::new()
        }
        .is_retryable());
        assert!(!HearthError::Cancelled.is_retryable());
    }

    #[test]
    fn retry_after_ms_only_on_rate_limit() {
        let err = HearthError::RateLimit {
            message: "slow down".into(),
            retry_after_ms: Some(2000),
            details: HashMap::new(),
        };
        assert_eq!(err.retry_after_ms(), Some(2000));
        assert_eq!(HearthError::network("x").retry_after_ms(), None);
    }
}
