//! Core type definitions for the agent-engine communication protocol
//!
//! This module defines the fundamental data structures exchanged between the
//! loop controller, the reasoning engine, and the payment adapter. The design
//! prioritizes compatibility with OpenAI's function calling format while
//! remaining provider-agnostic. These types are the lingua franca of a
//! request: every reasoning decision, action call, and observation is
//! expressed in terms of them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallRequest>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
            function_call: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            function_call: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
            function_call: None,
        }
    }
}

/// A function-call decision returned by the reasoning engine.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FunctionCallRequest {
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

/// What the reasoning engine produced for one iteration: free-text content,
/// a function-call decision, or both (content read as a reasoning note).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub function_call: Option<FunctionCallRequest>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// The normalized outcome of one action call, success or error. The adapter
/// guarantees every dispatched call yields exactly one of these; `sandbox`
/// is true for every call this system performs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActionResult {
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub sandbox: bool,
}

impl ActionResult {
    pub fn success(payload: Value) -> Self {
        Self {
            status: ActionStatus::Success,
            payload: Some(payload),
            error_detail: None,
            sandbox: true,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            payload: None,
            error_detail: Some(detail.into()),
            sandbox: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

/// A provider transaction normalized into the stable shape surfaced to
/// callers. `amount` is signed: positive for funds received, negative for
/// funds sent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NormalizedTransaction {
    pub description: String,
    pub date: String,
    pub status: String,
    pub amount: f64,
}

/// One immutable entry in a request's transcript. Ordering is significant
/// and append-only; a request's transcript always ends with `FinalAnswer`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Turn {
    UserMessage(String),
    ReasoningNote(String),
    ActionCall {
        name: String,
        arguments: Value,
        call_index: u32,
    },
    Observation {
        name: String,
        result: ActionResult,
        call_index: u32,
    },
    FinalAnswer(String),
}
