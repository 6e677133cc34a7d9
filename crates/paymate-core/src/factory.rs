//! Wiring from configuration to runnable agent sessions
//!
//! The factory builds the process-wide pieces once (reasoning engine
//! client, payment provider, function registry) and stamps out one agent
//! per session, each with its own conversation state and audit log. The
//! shared pieces are read-only after construction, so sessions can run
//! their loops concurrently.

use std::sync::Arc;
use std::time::Duration;

use crate::adapter::ActionAdapter;
use crate::agent::{Agent, AgentConfig};
use crate::audit::AuditLog;
use crate::config::{LlmProvider, PaymateConfig};
use crate::errors::AgentError;
use crate::llm::{OpenAiClient, LLM};
use crate::payments::{PayPalClient, PaymentProvider};
use crate::registry::FunctionRegistry;

pub struct AgentFactory {
    config: PaymateConfig,
    llm: Arc<dyn LLM>,
    registry: Arc<FunctionRegistry>,
    provider: Arc<dyn PaymentProvider>,
}

impl std::fmt::Debug for AgentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AgentFactory {
    /// Build the factory from validated configuration, resolving
    /// credentials from the environment variables the config names.
    pub fn from_config(config: PaymateConfig) -> Result<Self, AgentError> {
        config.validate()?;
        let llm = build_llm(&config)?;
        let provider = build_provider(&config)?;
        Ok(Self::with_components(config, llm, provider))
    }

    /// Assemble a factory from pre-built collaborators. Useful when the
    /// engine or provider is substituted, e.g. in tests.
    pub fn with_components(
        config: PaymateConfig,
        llm: Arc<dyn LLM>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            config,
            llm,
            registry: Arc::new(FunctionRegistry::with_builtin_functions()),
            provider,
        }
    }

    pub fn config(&self) -> &PaymateConfig {
        &self.config
    }

    pub fn provider(&self) -> Arc<dyn PaymentProvider> {
        self.provider.clone()
    }

    /// Create an agent for a new session: fresh conversation state and
    /// audit log over the shared engine, registry, and provider.
    pub fn new_session(&self) -> Agent {
        let audit = AuditLog::new();
        let adapter = ActionAdapter::new(
            self.provider.clone(),
            Duration::from_secs(self.config.paypal.request_timeout_secs),
            audit.clone(),
        );
        let agent_config = AgentConfig {
            max_action_calls: self.config.agent.max_action_calls,
            system_prompt: Some(self.config.agent.system_prompt.clone()),
            reasoning_timeout: Duration::from_secs(self.config.llm.request_timeout_secs),
        };
        Agent::new(
            self.llm.clone(),
            self.registry.clone(),
            adapter,
            agent_config,
            audit,
        )
    }
}

fn build_llm(config: &PaymateConfig) -> Result<Arc<dyn LLM>, AgentError> {
    let settings = &config.llm;
    let api_key = settings
        .auth
        .api_key
        .clone()
        .or_else(|| {
            settings
                .auth
                .api_key_env
                .as_ref()
                .and_then(|var| std::env::var(var).ok())
        })
        .ok_or_else(|| {
            AgentError::ConfigError(
                "No API key found for the reasoning engine. Set llm.auth.api_key or the \
                 configured api_key_env variable"
                    .to_string(),
            )
        })?;

    let mut client = OpenAiClient::new(api_key, settings.model.clone())
        .with_request_timeout(Duration::from_secs(settings.request_timeout_secs));
    if let LlmProvider::Custom { base_url } = &settings.provider {
        client = client.with_api_base(base_url.clone());
    }
    if settings.parameters.temperature > 0.0 {
        client = client.with_temperature(settings.parameters.temperature);
    }
    if settings.parameters.max_tokens > 0 {
        client = client.with_max_tokens(settings.parameters.max_tokens);
    }
    Ok(Arc::new(client))
}

fn build_provider(config: &PaymateConfig) -> Result<Arc<dyn PaymentProvider>, AgentError> {
    let settings = &config.paypal;
    let client_id = std::env::var(&settings.client_id_env).map_err(|_| {
        AgentError::ConfigError(format!(
            "Payment credentials missing: set {}",
            settings.client_id_env
        ))
    })?;
    let client_secret = std::env::var(&settings.client_secret_env).map_err(|_| {
        AgentError::ConfigError(format!(
            "Payment credentials missing: set {}",
            settings.client_secret_env
        ))
    })?;

    let client = PayPalClient::new(&settings.base_url, client_id, client_secret)?
        .with_request_timeout(Duration::from_secs(settings.request_timeout_secs));
    Ok(Arc::new(client))
}
