//! Request correlation context: a named, timestamped span wrapper used to
//! tie log lines from one logical operation together.

use chrono::{DateTime, Utc};
use tracing::Span;
use uuid::Uuid;

/// Correlates log lines emitted while handling one logical operation
/// (a conversation turn, a tool call, a hook run).
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    component: String,
    operation: Option<String>,
    started_at: DateTime<Utc>,
}

impl RequestContext {
    /// Start a new context for `component` (e.g. `"tool_executor"`).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            component: component.into(),
            operation: None,
            started_at: Utc::now(),
        }
    }

    /// Name the specific operation within `component`.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// The correlation id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When this context was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// A `tracing::Span` carrying this context's fields. Entering it
    /// attaches `request_id`/`component`/`operation` to every event logged
    /// within.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.id,
            component = %self.component,
            operation = self.operation.as_deref().unwrap_or(""),
        )
    }

    /// Enter the span and hold the guard for the returned value's lifetime.
    #[must_use]
    pub fn enter(&self) -> RequestGuard<'_> {
        RequestGuard {
            _span: self.span(),
            context: self,
        }
    }
}

/// RAII guard keeping a [`RequestContext`]'s span entered.
pub struct RequestGuard<'a> {
    _span: Span,
    context: &'a RequestContext,
}

impl RequestGuard<'_> {
    /// The context this guard is holding open.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_carries_operation() {
        let ctx = RequestContext::new("tool_executor").with_operation("execute_tool_call");
        assert_eq!(ctx.operation.as_deref(), Some("execute_tool_call"));
    }
}
