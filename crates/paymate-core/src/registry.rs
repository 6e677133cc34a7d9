//! Closed registry of payment operations callable by the reasoning engine
//!
//! The registry is the only path from a reasoning decision to an executable
//! operation. Each entry pairs a name and parameter schema with a
//! `PaymentAction` variant, so dispatch is enum-keyed and checked at
//! compile time rather than routed through name-to-closure lookups.
//! Registration happens once at startup; afterwards the registry is
//! read-only and safe to share across sessions.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::errors::AgentError;
use crate::llm::FunctionDecl;

/// The closed set of operations the adapter knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    SendMoney,
    CheckBalance,
    ListTransactions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            required: false,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// Parameter order is preserved for schema rendering.
    pub params: Vec<(String, ParamSpec)>,
    pub action: PaymentAction,
}

#[derive(Debug, Default)]
pub struct FunctionRegistry {
    specs: HashMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the three sandbox payment operations.
    pub fn with_builtin_functions() -> Self {
        let mut registry = Self::new();
        for spec in builtin_functions() {
            registry
                .register(spec)
                .expect("builtin function names are unique");
        }
        registry
    }

    pub fn register(&mut self, spec: FunctionSpec) -> Result<(), AgentError> {
        if self.specs.contains_key(&spec.name) {
            return Err(AgentError::DuplicateFunction(spec.name));
        }
        log::info!("Registering function: {}", spec.name);
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&FunctionSpec, AgentError> {
        self.specs
            .get(name)
            .ok_or_else(|| AgentError::UnknownFunction(name.to_string()))
    }

    /// Check `arguments` against the declared schema and return a coerced
    /// copy. Every missing or malformed field is reported in one error so
    /// the reasoning engine can self-correct in a single iteration.
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<Value, AgentError> {
        let spec = self.resolve(name)?;

        let supplied: Map<String, Value> = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(AgentError::InvalidArguments {
                    function: name.to_string(),
                    problems: vec![format!("expected an argument object, got {}", other)],
                })
            }
        };

        let mut coerced = supplied.clone();
        let mut problems = Vec::new();

        for (param, param_spec) in &spec.params {
            match supplied.get(param) {
                None | Some(Value::Null) => {
                    if param_spec.required {
                        problems.push(format!("missing required field '{}'", param));
                    }
                    coerced.remove(param);
                }
                Some(value) => match coerce(value, param_spec.kind) {
                    Some(value) => {
                        coerced.insert(param.clone(), value);
                    }
                    None => problems.push(format!(
                        "field '{}' is not a valid {}",
                        param,
                        param_spec.kind.json_type()
                    )),
                },
            }
        }

        if problems.is_empty() {
            Ok(Value::Object(coerced))
        } else {
            Err(AgentError::InvalidArguments {
                function: name.to_string(),
                problems,
            })
        }
    }

    /// Render the closed set as function declarations for the reasoning
    /// engine, sorted by name for a deterministic view.
    pub fn metadata_for_llm(&self) -> Vec<FunctionDecl> {
        let mut decls: Vec<FunctionDecl> = self.specs.values().map(declaration).collect();
        decls.sort_by(|a, b| a.name.cmp(&b.name));
        decls
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn coerce(value: &Value, kind: ParamKind) -> Option<Value> {
    match kind {
        ParamKind::String => value.is_string().then(|| value.clone()),
        ParamKind::Number => match value {
            Value::Number(_) => Some(value.clone()),
            // Engines occasionally quote numeric arguments.
            Value::String(s) => s.trim().parse::<f64>().ok().and_then(|n| {
                serde_json::Number::from_f64(n).map(Value::Number)
            }),
            _ => None,
        },
        ParamKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
    }
}

fn declaration(spec: &FunctionSpec) -> FunctionDecl {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (param, param_spec) in &spec.params {
        properties.insert(
            param.clone(),
            json!({
                "type": param_spec.kind.json_type(),
                "description": param_spec.description,
            }),
        );
        if param_spec.required {
            required.push(Value::String(param.clone()));
        }
    }
    FunctionDecl {
        name: spec.name.clone(),
        description: spec.description.clone(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

fn builtin_functions() -> Vec<FunctionSpec> {
    vec![
        FunctionSpec {
            name: "send_money".into(),
            description: "Send money to a recipient (sandbox mode)".into(),
            params: vec![
                (
                    "recipient".into(),
                    ParamSpec::required(ParamKind::String, "Recipient's email address"),
                ),
                (
                    "amount".into(),
                    ParamSpec::required(ParamKind::Number, "Amount to send"),
                ),
                (
                    "currency".into(),
                    ParamSpec::optional(ParamKind::String, "Currency code (e.g., USD)"),
                ),
                (
                    "note".into(),
                    ParamSpec::optional(ParamKind::String, "Optional note to include with the payment"),
                ),
            ],
            action: PaymentAction::SendMoney,
        },
        FunctionSpec {
            name: "check_balance".into(),
            description: "Check account balance (sandbox mode)".into(),
            params: vec![(
                "currency".into(),
                ParamSpec::optional(ParamKind::String, "Currency code to filter results (e.g., USD)"),
            )],
            action: PaymentAction::CheckBalance,
        },
        FunctionSpec {
            name: "get_transactions".into(),
            description: "Get transaction history (sandbox mode)".into(),
            params: vec![
                (
                    "start_date".into(),
                    ParamSpec::optional(
                        ParamKind::String,
                        "Start date in ISO format (e.g., 2023-01-01T00:00:00-0000)",
                    ),
                ),
                (
                    "end_date".into(),
                    ParamSpec::optional(
                        ParamKind::String,
                        "End date in ISO format (e.g., 2023-01-31T23:59:59-0000)",
                    ),
                ),
            ],
            action: PaymentAction::ListTransactions,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_the_three_operations() {
        let registry = FunctionRegistry::with_builtin_functions();
        assert_eq!(registry.len(), 3);
        assert!(registry.resolve("send_money").is_ok());
        assert!(registry.resolve("check_balance").is_ok());
        assert!(registry.resolve("get_transactions").is_ok());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = FunctionRegistry::with_builtin_functions();
        let dup = FunctionSpec {
            name: "send_money".into(),
            description: "duplicate".into(),
            params: vec![],
            action: PaymentAction::SendMoney,
        };
        assert!(matches!(
            registry.register(dup),
            Err(AgentError::DuplicateFunction(name)) if name == "send_money"
        ));
    }

    #[test]
    fn unknown_function_resolves_to_typed_error() {
        let registry = FunctionRegistry::with_builtin_functions();
        assert!(matches!(
            registry.resolve("refund_money"),
            Err(AgentError::UnknownFunction(name)) if name == "refund_money"
        ));
    }

    #[test]
    fn validate_reports_all_problems_at_once() {
        let registry = FunctionRegistry::with_builtin_functions();
        let err = registry
            .validate("send_money", &json!({"amount": "not-a-number"}))
            .unwrap_err();
        match err {
            AgentError::InvalidArguments { function, problems } => {
                assert_eq!(function, "send_money");
                assert_eq!(problems.len(), 2);
                assert!(problems[0].contains("recipient"));
                assert!(problems[1].contains("amount"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validate_coerces_numeric_strings() {
        let registry = FunctionRegistry::with_builtin_functions();
        let coerced = registry
            .validate(
                "send_money",
                &json!({"recipient": "alex@example.com", "amount": "20"}),
            )
            .unwrap();
        assert_eq!(coerced["amount"], json!(20.0));
        assert_eq!(coerced["recipient"], "alex@example.com");
    }

    #[test]
    fn validate_accepts_missing_optional_fields() {
        let registry = FunctionRegistry::with_builtin_functions();
        assert!(registry.validate("check_balance", &json!({})).is_ok());
        assert!(registry.validate("check_balance", &Value::Null).is_ok());
    }

    #[test]
    fn validate_rejects_non_object_arguments() {
        let registry = FunctionRegistry::with_builtin_functions();
        assert!(matches!(
            registry.validate("check_balance", &json!("USD")),
            Err(AgentError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn metadata_is_sorted_and_schema_shaped() {
        let registry = FunctionRegistry::with_builtin_functions();
        let decls = registry.metadata_for_llm();
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["check_balance", "get_transactions", "send_money"]);

        let send = decls.iter().find(|d| d.name == "send_money").unwrap();
        assert_eq!(send.parameters["type"], "object");
        assert_eq!(
            send.parameters["required"],
            json!(["recipient", "amount"])
        );
        assert_eq!(
            send.parameters["properties"]["amount"]["type"],
            "number"
        );
    }
}
