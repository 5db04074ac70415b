#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Lifecycle hooks: matching, command/callback execution, async-hook
//! tracking, and the registry tying them together.

mod async_hook;
mod command;
mod definition;
mod error;
mod event;
mod matcher;
mod registry;
mod response;
mod runner;

pub use async_hook::{AsyncHook, AsyncHookRegistry};
pub use command::{apply_shell_prefix, run as run_command, CommandOutcome};
pub use definition::{CallbackHook, HookDefinition, HookType, DEFAULT_TIMEOUT_SECONDS};
pub use error::HookError;
pub use event::HookEvent;
pub use matcher::matches;
pub use registry::HookRegistry;
pub use response::{Decision, HookResponse, PermissionDecision};
pub use runner::{run_event, HookEffect};
