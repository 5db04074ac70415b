//! Config-resolver-local error type, converted into `HearthError` at the
//! boundary.

use hearth_core::HearthError;
use thiserror::Error;

/// Errors specific to loading, parsing, or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read (permissions, not-a-file, etc. — note
    /// that a merely *missing* file is not an error, see
    /// [`crate::resolver::ConfigResolver::get_merged`]).
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file exceeded the configured size limit.
    #[error("{path} exceeds the maximum configuration file size ({size} bytes)")]
    TooLarge {
        /// The path that failed.
        path: String,
        /// The file's size in bytes.
        size: u64,
    },

    /// The file's contents were not valid JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The path that failed.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// `save()` was called on a read-only source (`policySettings` or
    /// `flagSettings`).
    #[error("{0:?} is read-only and cannot be saved")]
    ReadOnlySource(crate::source::ConfigSource),

    /// No filesystem location is available for a source in the current
    /// environment (e.g. `flagSettings` with no `CLAUDE_FLAGS_DIR`).
    #[error("no location available for {0:?}")]
    NoLocation(crate::source::ConfigSource),
}

impl From<ConfigError> for HearthError {
    fn from(err: ConfigError) -> Self {
        HearthError::config(err.to_string())
    }
}
