//! These models represent the objects passed between the caller, the relay and the provider
//!
//! Requests arrive as plain prompts, conversation history is kept as role-tagged
//! messages, and the provider speaks the openai chat format. We convert into the
//! internal structs as soon as data crosses one of those boundaries.
pub mod message;
pub mod recipe;
pub mod role;
