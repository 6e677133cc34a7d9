//! Reasoning engine boundary
//!
//! The loop controller talks to the reasoning engine through the `LLM`
//! trait: it hands over the rendered conversation plus the registry's
//! function declarations and receives back either a function-call decision
//! or final free-text content. Implementations own their wire format; the
//! loop never sees provider-specific shapes.

pub use crate::core_types::{LLMResponse, Message};
use crate::errors::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod openai;

pub use openai::OpenAiClient;

/// A function declaration advertised to the reasoning engine:
/// name, description, and a JSON-schema parameter object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait LLM: Send + Sync {
    async fn generate(
        &self,
        messages: Vec<Message>,
        functions: &[FunctionDecl],
    ) -> Result<LLMResponse, AgentError>;
}
