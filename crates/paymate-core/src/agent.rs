//! ReAct loop controller
//!
//! One user message drives one complete loop execution: the controller
//! alternates reasoning and acting, enforces the action-call budget,
//! decides termination, and assembles the final user-facing reply. The
//! loop is single-request and sequential: each iteration awaits one
//! reasoning decision and then at most one action, never both
//! concurrently, since the action's arguments depend on the decision.
//!
//! Failure policy: registry, validation, and adapter failures become
//! error observations fed back to the engine (local recovery, consuming
//! one call slot). A sandbox mode violation aborts the call and finalizes
//! with an error reply. A reasoning-engine failure is caught at the top
//! level and converted into a generic apology; the caller never sees an
//! unhandled fault.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use crate::adapter::ActionAdapter;
use crate::audit::{AuditLog, LogKind, SANDBOX_MARKER};
use crate::conversation::ConversationState;
use crate::core_types::{ActionResult, FunctionCallRequest, LLMResponse, Message, Turn};
use crate::errors::AgentError;
use crate::llm::{FunctionDecl, LLM};
use crate::registry::FunctionRegistry;

pub const APOLOGY_MESSAGE: &str =
    "I'm sorry - I ran into a problem while processing your request in sandbox mode. \
     Please try again.";

pub const BUDGET_NOTICE_MESSAGE: &str =
    "I've reached the maximum number of sandbox payment calls I can make for this \
     request, so I stopped before making another one. The results above reflect the \
     calls that completed.";

pub const MODE_VIOLATION_MESSAGE: &str =
    "I can't complete this request: the payment connection is not configured for the \
     sandbox environment, so no call was made.";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Hard ceiling on action calls per request.
    pub max_action_calls: u32,
    pub system_prompt: Option<String>,
    pub reasoning_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_action_calls: 3,
            system_prompt: None,
            reasoning_timeout: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// The final user-facing outcome of one request. `details.transactions`,
/// when present, carries the normalized signed transaction sequence.
#[derive(Debug, Serialize, Clone)]
pub struct AgentReply {
    pub status: ReplyStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub struct Agent {
    llm: Arc<dyn LLM>,
    registry: Arc<FunctionRegistry>,
    adapter: ActionAdapter,
    state: ConversationState,
    config: AgentConfig,
    audit: AuditLog,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LLM>,
        registry: Arc<FunctionRegistry>,
        adapter: ActionAdapter,
        config: AgentConfig,
        audit: AuditLog,
    ) -> Self {
        Self {
            llm,
            registry,
            adapter,
            state: ConversationState::new(),
            config,
            audit,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Reset the transcript. Never called mid-request.
    pub fn clear_conversation(&mut self) {
        self.state.clear();
        log::info!("Cleared conversation history");
    }

    /// Drive one user message to a terminal state. Always returns a reply;
    /// every internal failure is converted here.
    pub async fn handle_message(&mut self, text: &str) -> AgentReply {
        match self.run_request(text).await {
            Ok(reply) => reply,
            Err(err) => self.finalize_failure(err),
        }
    }

    async fn run_request(&mut self, text: &str) -> Result<AgentReply, AgentError> {
        self.state.append(Turn::UserMessage(text.to_string()));
        self.audit.info(
            LogKind::Info,
            format!("{} Processing request against the payment sandbox", SANDBOX_MARKER),
        );

        let functions = self.registry.metadata_for_llm();
        let mut transactions: Option<Value> = None;

        // One initial decision, one per budgeted call, and one closing
        // decision after the last call.
        let max_rounds = self.config.max_action_calls + 2;
        for _ in 0..max_rounds {
            let decision = self.next_decision(&functions).await?;

            let Some(call) = decision.function_call else {
                let content = decision.content.unwrap_or_default();
                if content.trim().is_empty() {
                    return Err(AgentError::ReasoningEngine(
                        "decision had neither content nor a function call".to_string(),
                    ));
                }
                self.audit.info(
                    LogKind::Info,
                    format!("{} Request processed successfully", SANDBOX_MARKER),
                );
                return Ok(self.finalize(content, transactions, ReplyStatus::Success));
            };

            if let Some(note) = decision.content.as_deref().filter(|c| !c.trim().is_empty()) {
                self.audit.reasoning(note.to_string());
                self.state.append(Turn::ReasoningNote(note.to_string()));
            }

            if self.state.count_action_calls() >= self.config.max_action_calls {
                // Ceiling reached and the engine still wants to act: the
                // call is never dispatched. Soft failure, never surfaced
                // as an error to the caller.
                log::warn!("{}", AgentError::IterationBudgetExceeded);
                self.audit.info(
                    LogKind::Info,
                    format!(
                        "{} Call budget of {} exhausted; finishing without another call",
                        SANDBOX_MARKER, self.config.max_action_calls
                    ),
                );
                return Ok(self.finalize(
                    BUDGET_NOTICE_MESSAGE.to_string(),
                    transactions,
                    ReplyStatus::Success,
                ));
            }

            let result = self.perform_call(call).await?;
            if result.is_success() {
                if let Some(txns) = result
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("transactions"))
                {
                    transactions = Some(txns.clone());
                }
            }
        }

        // The engine alternated content-free decisions to the round bound;
        // treat it like an exhausted budget rather than looping further.
        Ok(self.finalize(
            BUDGET_NOTICE_MESSAGE.to_string(),
            transactions,
            ReplyStatus::Success,
        ))
    }

    async fn next_decision(
        &mut self,
        functions: &[FunctionDecl],
    ) -> Result<LLMResponse, AgentError> {
        let mut messages = Vec::new();
        if let Some(prompt) = self.config.system_prompt.as_deref() {
            if !prompt.is_empty() {
                messages.push(Message::system(prompt));
            }
        }
        messages.extend(self.state.render_for_reasoning());

        self.audit.debug(
            LogKind::Reasoning,
            format!(
                "Requesting decision ({} messages, {} functions)",
                messages.len(),
                functions.len()
            ),
            serde_json::to_value(&messages).ok(),
        );

        let response = tokio::time::timeout(
            self.config.reasoning_timeout,
            self.llm.generate(messages, functions),
        )
        .await
        .map_err(|_| {
            AgentError::ExternalCallTimeout(format!(
                "reasoning engine did not answer within {} seconds",
                self.config.reasoning_timeout.as_secs()
            ))
        })??;

        self.audit.debug(
            LogKind::Reasoning,
            "Decision received",
            serde_json::to_value(&response).ok(),
        );
        Ok(response)
    }

    /// Record and execute one requested call. Unknown names and invalid
    /// arguments consume a call slot and come back as error observations;
    /// only a mode violation propagates.
    async fn perform_call(
        &mut self,
        call: FunctionCallRequest,
    ) -> Result<ActionResult, AgentError> {
        let call_index = self.state.next_call_index();
        self.state.append(Turn::ActionCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            call_index,
        });

        let result = match self.registry.resolve(&call.name) {
            Err(err) => {
                self.audit
                    .error(format!("Requested action is not available: {}", call.name));
                ActionResult::error(err.to_string())
            }
            Ok(spec) => {
                let spec = spec.clone();
                match self.registry.validate(&call.name, &call.arguments) {
                    Err(err) => {
                        self.audit.error(err.to_string());
                        ActionResult::error(err.to_string())
                    }
                    Ok(valid) => self.adapter.execute(&spec, &valid).await?,
                }
            }
        };

        self.state.append(Turn::Observation {
            name: call.name,
            result: result.clone(),
            call_index,
        });
        Ok(result)
    }

    fn finalize(
        &mut self,
        message: String,
        transactions: Option<Value>,
        status: ReplyStatus,
    ) -> AgentReply {
        self.state.append(Turn::FinalAnswer(message.clone()));
        AgentReply {
            status,
            message,
            details: transactions.map(|t| json!({ "transactions": t })),
        }
    }

    fn finalize_failure(&mut self, err: AgentError) -> AgentReply {
        let message = match &err {
            AgentError::ModeViolation(_) => MODE_VIOLATION_MESSAGE,
            _ => APOLOGY_MESSAGE,
        };
        self.audit.error(format!("Request failed: {}", err));
        self.finalize(message.to_string(), None, ReplyStatus::Error)
    }
}
