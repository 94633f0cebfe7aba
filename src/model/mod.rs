//! Model client module for AI inference.

mod client;
mod inference;
mod messages;

pub use client::{ModelClient, ModelConfig};
pub use inference::{ModelError, ModelInference, ModelResponse};
pub use messages::MessageBuilder;
