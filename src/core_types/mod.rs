//! Core types shared across the assistant
//!
//! ## Organization
//! - `messages` - transcript entries and roles
//! - `provider` - the `ModelBackend` trait and its request/response types

pub mod messages;
pub mod provider;

pub use messages::{Message, MessageRole};
pub use provider::{GenerationRequest, GenerationResponse, ModelBackend, ModelInfo, TokenUsage};

#[cfg(test)]
pub use provider::MockModelBackend;
