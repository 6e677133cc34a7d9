use serde::{Deserialize, Serialize};

use crate::errors::AgentError;
use crate::payments::is_sandbox_endpoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymateConfig {
    #[serde(default)]
    pub agent: AgentSettings,
    pub llm: LlmSettings,
    #[serde(default)]
    pub paypal: PayPalSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// Hard ceiling on action calls per request.
    #[serde(default = "default_max_action_calls")]
    pub max_action_calls: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_action_calls: default_max_action_calls(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: LlmProvider,
    pub model: String,
    #[serde(default)]
    pub auth: LlmAuth,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Custom {
        base_url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

impl Default for LlmAuth {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayPalSettings {
    /// Always the sandbox; validation rejects anything else.
    #[serde(default = "default_sandbox_url")]
    pub base_url: String,
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PayPalSettings {
    fn default() -> Self {
        Self {
            base_url: default_sandbox_url(),
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PaymateConfig {
    /// Reject configurations that must never serve a request.
    pub fn validate(&self) -> Result<(), AgentError> {
        if !is_sandbox_endpoint(&self.paypal.base_url) {
            return Err(AgentError::ModeViolation(format!(
                "paypal.base_url '{}' is not the sandbox endpoint",
                self.paypal.base_url
            )));
        }
        if self.agent.max_action_calls == 0 {
            return Err(AgentError::ConfigError(
                "agent.max_action_calls must be at least 1".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "llm.model must not be empty".to_string(),
            ));
        }
        if self.llm.request_timeout_secs == 0 || self.paypal.request_timeout_secs == 0 {
            return Err(AgentError::ConfigError(
                "request timeouts must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_agent_name() -> String {
    "paymate".to_string()
}

fn default_max_action_calls() -> u32 {
    3
}

fn default_system_prompt() -> String {
    "You are a payment assistant that operates exclusively against the payment \
     provider's sandbox environment. Only offer the operations exposed through the \
     registered functions and never attempt a real transaction."
        .to_string()
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_sandbox_url() -> String {
    "https://api-m.sandbox.paypal.com".to_string()
}

fn default_client_id_env() -> String {
    "PAYPAL_CLIENT_ID".to_string()
}

fn default_client_secret_env() -> String {
    "PAYPAL_CLIENT_SECRET".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
