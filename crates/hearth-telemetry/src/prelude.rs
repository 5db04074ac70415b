//! Commonly used types for convenient import: `use hearth_telemetry::prelude::*;`

pub use crate::{LogConfig, LogFormat, LogTarget, RequestContext, RequestGuard, TelemetryError, TelemetryResult};
pub use crate::{setup_default_logging, setup_logging};
