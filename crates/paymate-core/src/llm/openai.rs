use crate::core_types::{FunctionCallRequest, LLMResponse, Message, Role};
use crate::errors::AgentError;
use crate::llm::{FunctionDecl, LLM};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// OpenAI-compatible chat-completions client with function calling.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: "https://api.openai.com/v1".to_string(),
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    fn build_request_body(&self, messages: &[Message], functions: &[FunctionDecl]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.format_messages(messages),
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = temp.into();
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }

        if !functions.is_empty() {
            let formatted: Vec<Value> = functions
                .iter()
                .map(|decl| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": decl.name,
                            "description": decl.description,
                            "parameters": decl.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = formatted.into();
            body["tool_choice"] = "auto".into();
        }

        body
    }

    fn format_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let mut message = json!({
                    "role": self.format_role(&msg.role),
                    "content": msg.content,
                });

                if let Role::Tool = msg.role {
                    if let Some(tool_call_id) = &msg.tool_call_id {
                        message["tool_call_id"] = json!(tool_call_id);
                    }
                }

                if let Role::Assistant = msg.role {
                    if let Some(call) = &msg.function_call {
                        message["tool_calls"] = json!([{
                            "id": call.id.clone().unwrap_or_else(|| {
                                format!("call_{}", uuid::Uuid::new_v4().simple())
                            }),
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        }]);
                    }
                }

                message
            })
            .collect()
    }

    fn format_role(&self, role: &Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn parse_response(&self, response: Value) -> Result<LLMResponse, AgentError> {
        let choices = response["choices"]
            .as_array()
            .ok_or_else(|| AgentError::ParsingError("No choices in response".to_string()))?;

        if choices.is_empty() {
            return Err(AgentError::ParsingError("Empty choices array".to_string()));
        }

        let message = &choices[0]["message"];
        let content = message["content"].as_str().map(|s| s.to_string());

        // The registry offers one action per iteration, so only the first
        // tool call of a response is honored.
        let function_call = message["tool_calls"]
            .as_array()
            .and_then(|calls| calls.first())
            .map(|call| {
                let function = &call["function"];
                let name = function["name"]
                    .as_str()
                    .ok_or_else(|| {
                        AgentError::ParsingError("Tool call without a function name".to_string())
                    })?
                    .to_string();
                let arguments_str = function["arguments"].as_str().unwrap_or("{}");
                let arguments: Value = serde_json::from_str(arguments_str).map_err(|e| {
                    AgentError::ParsingError(format!("Invalid tool call arguments JSON: {}", e))
                })?;
                Ok::<FunctionCallRequest, AgentError>(FunctionCallRequest {
                    id: call["id"].as_str().map(|s| s.to_string()),
                    name,
                    arguments,
                })
            })
            .transpose()?;

        if content.is_none() && function_call.is_none() {
            return Err(AgentError::ParsingError(
                "Response has neither content nor a tool call".to_string(),
            ));
        }

        Ok(LLMResponse {
            content,
            function_call,
        })
    }
}

#[async_trait]
impl LLM for OpenAiClient {
    async fn generate(
        &self,
        messages: Vec<Message>,
        functions: &[FunctionDecl],
    ) -> Result<LLMResponse, AgentError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request_body(&messages, functions);

        log::debug!("Reasoning request to {} ({} messages)", url, messages.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::ReasoningEngine(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| AgentError::ReasoningEngine(format!("Failed to read response: {}", e)))?;

        log::debug!("Reasoning response ({}): {}", status, response_text);

        if !status.is_success() {
            return Err(AgentError::ReasoningEngine(format!(
                "API request failed with status {}: {}",
                status, response_text
            )));
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|e| AgentError::ParsingError(format!("Invalid JSON response: {}", e)))?;

        self.parse_response(response_json)
    }
}
