//! Core library for a bounded, auditable payment-agent loop.
//!
//! This crate implements the control plane of a conversational payment
//! assistant: a Reason-Act-Observe loop that converts one user message
//! into at most a few calls against a closed set of sandbox payment
//! operations and synthesizes a final reply. The design emphasizes three
//! invariants: the loop never exceeds its call budget, every call is
//! restricted to the payment provider's sandbox, and every step leaves a
//! deterministic, inspectable trace.
//!
//! # Architecture Overview
//!
//! - **Loop controller**: the state machine alternating reasoning and
//!   acting, with termination and top-level failure recovery
//! - **Function registry**: the closed, enum-dispatched set of callable
//!   payment operations with typed argument validation
//! - **Conversation state**: the append-only transcript replayed to the
//!   reasoning engine each iteration
//! - **Action adapter**: sandbox-guarded, timeout-bounded execution with
//!   result normalization
//! - **Audit trail**: a two-tier (debug/user-visible) session log
//! - **External boundaries**: reasoning-engine and payment-provider
//!   traits with OpenAI-compatible and PayPal-sandbox implementations

pub mod adapter;
pub mod agent;
pub mod audit;
pub mod config;
pub mod conversation;
pub mod core_types;
pub mod errors;
pub mod factory;
pub mod llm;
pub mod payments;
pub mod registry;

pub use adapter::ActionAdapter;
pub use agent::{Agent, AgentConfig, AgentReply, ReplyStatus};
pub use audit::{AuditLog, LogEntry, LogKind, LogTier};
pub use config::{ConfigLoader, PaymateConfig};
pub use conversation::ConversationState;
pub use errors::AgentError;
pub use factory::AgentFactory;
pub use llm::LLM;
pub use payments::PaymentProvider;
pub use registry::FunctionRegistry;
