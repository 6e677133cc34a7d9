//! Configuration loader for YAML files
//!
//! Loads a `PaymateConfig` from disk or an in-memory string and runs the
//! validation pass before handing it to the factory. Credentials are never
//! stored in the file; the config names the environment variables they
//! live in.

use std::path::Path;

use tokio::fs;

use crate::config::types::PaymateConfig;
use crate::errors::AgentError;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<PaymateConfig, AgentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            AgentError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_str(content: &str) -> Result<PaymateConfig, AgentError> {
        let config: PaymateConfig = serde_yaml::from_str(content)
            .map_err(|e| AgentError::ConfigError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = ConfigLoader::from_str("llm:\n  model: gpt-4o-mini\n").unwrap();
        assert_eq!(config.agent.name, "paymate");
        assert_eq!(config.agent.max_action_calls, 3);
        assert_eq!(config.paypal.base_url, "https://api-m.sandbox.paypal.com");
        assert_eq!(config.paypal.client_id_env, "PAYPAL_CLIENT_ID");
        assert_eq!(config.llm.request_timeout_secs, 8);
        assert!(config.agent.system_prompt.contains("sandbox"));
    }

    #[test]
    fn live_endpoint_is_a_mode_violation_at_load_time() {
        let yaml = "llm:\n  model: gpt-4o-mini\npaypal:\n  base_url: https://api-m.paypal.com\n";
        assert!(matches!(
            ConfigLoader::from_str(yaml),
            Err(AgentError::ModeViolation(_))
        ));
    }

    #[test]
    fn zero_call_budget_is_rejected() {
        let yaml = "llm:\n  model: gpt-4o-mini\nagent:\n  max_action_calls: 0\n";
        assert!(matches!(
            ConfigLoader::from_str(yaml),
            Err(AgentError::ConfigError(_))
        ));
    }

    #[test]
    fn missing_model_is_rejected() {
        let yaml = "llm:\n  model: \"\"\n";
        assert!(matches!(
            ConfigLoader::from_str(yaml),
            Err(AgentError::ConfigError(_))
        ));
    }

    #[test]
    fn overrides_are_honored() {
        let yaml = r#"
agent:
  name: treasurer
  max_action_calls: 2
llm:
  model: gpt-4o-mini
  parameters:
    temperature: 0.5
    max_tokens: 256
  request_timeout_secs: 5
paypal:
  request_timeout_secs: 4
"#;
        let config = ConfigLoader::from_str(yaml).unwrap();
        assert_eq!(config.agent.name, "treasurer");
        assert_eq!(config.agent.max_action_calls, 2);
        assert_eq!(config.llm.parameters.max_tokens, 256);
        assert_eq!(config.paypal.request_timeout_secs, 4);
    }
}
