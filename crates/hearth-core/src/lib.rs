#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Shared conversation data model and error taxonomy for the hearth agent
//! runtime — the types every other crate builds on.

mod conversation;
mod error;
mod message;

pub use conversation::Conversation;
pub use error::{HearthError, HearthResult};
pub use message::{ContentBlock, Message, Role, Usage};
