#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration resolution for the hearth agent runtime.
//!
//! Five JSON sources (`userSettings`, `projectSettings`, `localSettings`,
//! `policySettings`, `flagSettings`) are deep-merged in fixed precedence
//! order and passed through a small set of key migrations. See
//! [`ConfigResolver`] for the entry point.

mod error;
mod merge;
mod migrate;
mod resolver;
mod source;
mod watch;

pub use error::ConfigError;
pub use resolver::ConfigResolver;
pub use source::ConfigSource;
pub use watch::{watch, WatchHandle};
