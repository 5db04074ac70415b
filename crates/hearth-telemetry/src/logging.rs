//! Logging setup: builds a `tracing-subscriber` subscriber from a small
//! configuration struct, following the env-filter + format-layer shape
//! used throughout the runtime.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::{TelemetryError, TelemetryResult};

/// Output formatting for emitted log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-readable (development default).
    #[default]
    Pretty,
    /// Single-line, human-readable.
    Compact,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    /// Standard error (default — keeps stdout free for program output).
    #[default]
    Stderr,
    /// Standard output.
    Stdout,
}

/// Logging configuration: base level plus per-module directive overrides.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    target: LogTarget,
    directives: Vec<String>,
}

impl LogConfig {
    /// Start from a base level (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`, or a full `EnvFilter` directive string).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            directives: Vec::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add an extra per-module directive, e.g. `"hearth_hooks=trace"`.
    /// Applied after the base level, so more specific directives win.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::ConfigError(format!("invalid level {:?}: {e}", self.level)))?;
        for directive in &self.directives {
            let parsed = directive
                .parse()
                .map_err(|e| TelemetryError::ConfigError(format!("invalid directive {directive:?}: {e}")))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

/// Install a global subscriber built from `config`. Idempotent only in the
/// sense that a second call returns `InitError` rather than panicking —
/// `tracing`'s global subscriber can only be set once per process.
///
/// # Errors
///
/// Returns [`TelemetryError::ConfigError`] if the level or a directive
/// fails to parse, or [`TelemetryError::InitError`] if a subscriber is
/// already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let writer_is_stdout = matches!(config.target, LogTarget::Stdout);

    macro_rules! install {
        ($layer:expr) => {{
            let registry = tracing_subscriber::registry().with(filter).with($layer);
            registry
                .try_init()
                .map_err(|e| TelemetryError::InitError(e.to_string()))
        }};
    }

    match (config.format, writer_is_stdout) {
        (LogFormat::Pretty, true) => install!(fmt::layer().pretty().with_writer(std::io::stdout)),
        (LogFormat::Pretty, false) => install!(fmt::layer().pretty().with_writer(std::io::stderr)),
        (LogFormat::Compact, true) => install!(fmt::layer().compact().with_writer(std::io::stdout)),
        (LogFormat::Compact, false) => install!(fmt::layer().compact().with_writer(std::io::stderr)),
        (LogFormat::Json, true) => install!(fmt::layer().json().with_writer(std::io::stdout)),
        (LogFormat::Json, false) => install!(fmt::layer().json().with_writer(std::io::stderr)),
    }
}

/// Install a subscriber with sensible defaults (`info` level, pretty
/// format, stderr) — used by tests and quick-start code paths.
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_filter_accepts_base_level_and_directives() {
        let config = LogConfig::new("info").with_directive("hearth_hooks=trace");
        assert!(config.build_filter().is_ok());
    }

    #[test]
    fn build_filter_rejects_garbage_directive() {
        let config = LogConfig::new("info").with_directive("!!!not a directive!!!");
        assert!(config.build_filter().is_err());
    }
}
