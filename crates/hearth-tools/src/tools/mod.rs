//! Built-in tool bodies: minimal, real implementations of the six tools
//! C4 needs something concrete to dispatch to (spec.md §1 scope note).

pub mod bash;
pub mod edit_file;
pub mod glob;
pub mod grep;
pub mod read_file;
pub mod write_file;
