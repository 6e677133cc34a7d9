//! Action adapter: executes one registry entry against the payment sandbox
//!
//! The adapter is the only component that touches the payment capability.
//! It re-checks the sandbox invariant before every dispatch, bounds each
//! call with a timeout, and normalizes every outcome (success, provider
//! error, timeout) into an `ActionResult`. No failure other than a mode
//! violation crosses this boundary as an error: the loop always gets an
//! observation it can feed back to the reasoning engine.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::audit::{AuditLog, LogKind};
use crate::core_types::{ActionResult, NormalizedTransaction};
use crate::errors::AgentError;
use crate::payments::{is_sandbox_endpoint, PaymentProvider};
use crate::registry::{FunctionSpec, PaymentAction};

pub struct ActionAdapter {
    provider: Arc<dyn PaymentProvider>,
    timeout: Duration,
    audit: AuditLog,
}

impl ActionAdapter {
    pub fn new(provider: Arc<dyn PaymentProvider>, timeout: Duration, audit: AuditLog) -> Self {
        Self {
            provider,
            timeout,
            audit,
        }
    }

    /// Execute one validated call. The only `Err` this returns is
    /// `ModeViolation`; every other failure comes back as an
    /// `ActionResult` with `status = error`.
    pub async fn execute(
        &self,
        spec: &FunctionSpec,
        arguments: &Value,
    ) -> Result<ActionResult, AgentError> {
        let endpoint = self.provider.endpoint();
        if !is_sandbox_endpoint(endpoint) {
            let msg = format!(
                "refusing to execute '{}': endpoint '{}' is not the payment sandbox",
                spec.name, endpoint
            );
            self.audit.error(msg.clone());
            return Err(AgentError::ModeViolation(msg));
        }

        self.audit.action(format!("Executing action: {}", spec.name));
        self.audit.debug(
            LogKind::Action,
            format!("{} arguments", spec.name),
            Some(arguments.clone()),
        );

        let outcome = tokio::time::timeout(self.timeout, self.dispatch(spec.action, arguments)).await;

        let result = match outcome {
            Err(_) => {
                self.audit.debug(
                    LogKind::Error,
                    format!("{} exceeded the {:?} call timeout", spec.name, self.timeout),
                    None,
                );
                ActionResult::error(format!(
                    "{} timed out after {} seconds",
                    spec.name,
                    self.timeout.as_secs()
                ))
            }
            Ok(Err(cause)) => {
                // Raw cause stays in the debug tier; the observation gets a
                // readable summary.
                self.audit.debug(
                    LogKind::Error,
                    format!("{} failed", spec.name),
                    Some(json!({"cause": cause.to_string()})),
                );
                ActionResult::error(failure_detail(&spec.name, &cause))
            }
            Ok(Ok(raw)) => {
                self.audit.debug(
                    LogKind::Api,
                    format!("{} raw response", spec.name),
                    Some(raw.clone()),
                );
                match normalize(spec.action, &raw) {
                    Some(payload) => ActionResult::success(payload),
                    None => {
                        self.audit.debug(
                            LogKind::Error,
                            format!("{} response had an unexpected shape", spec.name),
                            Some(raw),
                        );
                        ActionResult::error(format!(
                            "{} returned an unexpected response shape",
                            spec.name
                        ))
                    }
                }
            }
        };

        if result.is_success() {
            self.audit.api(format!("Completed action: {}", spec.name));
        } else {
            self.audit.api(format!("Action returned an error: {}", spec.name));
        }
        Ok(result)
    }

    async fn dispatch(&self, action: PaymentAction, args: &Value) -> Result<Value, AgentError> {
        match action {
            PaymentAction::SendMoney => {
                let recipient = args["recipient"].as_str().unwrap_or_default();
                let amount = args["amount"].as_f64().unwrap_or_default();
                let currency = args["currency"].as_str().unwrap_or("USD");
                let note = args["note"].as_str();
                self.provider
                    .send_money(recipient, amount, currency, note)
                    .await
            }
            PaymentAction::CheckBalance => {
                self.provider.check_balance(args["currency"].as_str()).await
            }
            PaymentAction::ListTransactions => {
                self.provider
                    .get_transactions(args["start_date"].as_str(), args["end_date"].as_str())
                    .await
            }
        }
    }
}

fn failure_detail(name: &str, cause: &AgentError) -> String {
    match cause {
        AgentError::ExternalCallTimeout(_) => {
            format!("{} timed out while waiting on the payment provider", name)
        }
        AgentError::ExternalCallFailure(_) => {
            format!("the payment provider rejected the {} request", name)
        }
        _ => format!("{} could not be completed", name),
    }
}

fn normalize(action: PaymentAction, raw: &Value) -> Option<Value> {
    match action {
        PaymentAction::SendMoney => normalize_payout(raw),
        PaymentAction::CheckBalance => normalize_balance(raw),
        PaymentAction::ListTransactions => normalize_transactions(raw),
    }
}

fn normalize_payout(raw: &Value) -> Option<Value> {
    let batch_id = raw["batch_header"]["payout_batch_id"].as_str()?;
    Some(json!({
        "payout_batch_id": batch_id,
        "message": "Payment initiated successfully",
    }))
}

fn normalize_balance(raw: &Value) -> Option<Value> {
    let balance = raw["balances"].as_array()?.first()?;
    let money = if balance["available_balance"].is_object() {
        &balance["available_balance"]
    } else {
        &balance["total_balance"]
    };
    let amount: f64 = money["value"].as_str()?.parse().ok()?;
    let currency = money["currency_code"]
        .as_str()
        .or_else(|| balance["currency"].as_str())?;
    Some(json!({"amount": amount, "currency": currency}))
}

fn normalize_transactions(raw: &Value) -> Option<Value> {
    let details = raw["transaction_details"].as_array()?;
    let transactions: Vec<NormalizedTransaction> = details
        .iter()
        .filter_map(normalize_transaction)
        .collect();
    Some(json!({ "transactions": transactions }))
}

fn normalize_transaction(detail: &Value) -> Option<NormalizedTransaction> {
    let info = &detail["transaction_info"];
    // The provider signs amounts already: negative for funds sent,
    // positive for funds received.
    let amount: f64 = info["transaction_amount"]["value"].as_str()?.parse().ok()?;
    let description = info["transaction_subject"]
        .as_str()
        .or_else(|| info["transaction_note"].as_str())
        .or_else(|| detail["payer_info"]["email_address"].as_str())
        .unwrap_or("Transaction")
        .to_string();
    let date = info["transaction_initiation_date"]
        .as_str()
        .unwrap_or_default()
        .split('T')
        .next()
        .unwrap_or_default()
        .to_string();
    let status = match info["transaction_status"].as_str().unwrap_or_default() {
        "S" => "Completed".to_string(),
        "P" => "Pending".to_string(),
        "D" => "Denied".to_string(),
        "V" => "Reversed".to_string(),
        "F" => "Failed".to_string(),
        other => other.to_string(),
    };
    Some(NormalizedTransaction {
        description,
        date,
        status,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LogTier;
    use crate::registry::FunctionRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        endpoint: String,
        calls: AtomicUsize,
        response: Value,
        fail_with: Option<AgentError>,
        delay: Option<Duration>,
    }

    impl StubProvider {
        fn new(response: Value) -> Self {
            Self {
                endpoint: "https://api-m.sandbox.paypal.com".into(),
                calls: AtomicUsize::new(0),
                response,
                fail_with: None,
                delay: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn respond(&self) -> Result<Value, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(self.response.clone())
        }
    }

    #[async_trait]
    impl PaymentProvider for StubProvider {
        fn endpoint(&self) -> &str {
            &self.endpoint
        }

        async fn authenticate(&self) -> Result<(), AgentError> {
            Ok(())
        }

        async fn send_money(
            &self,
            _recipient: &str,
            _amount: f64,
            _currency: &str,
            _note: Option<&str>,
        ) -> Result<Value, AgentError> {
            self.respond().await
        }

        async fn check_balance(&self, _currency: Option<&str>) -> Result<Value, AgentError> {
            self.respond().await
        }

        async fn get_transactions(
            &self,
            _start_date: Option<&str>,
            _end_date: Option<&str>,
        ) -> Result<Value, AgentError> {
            self.respond().await
        }
    }

    fn spec(name: &str) -> FunctionSpec {
        FunctionRegistry::with_builtin_functions()
            .resolve(name)
            .unwrap()
            .clone()
    }

    fn adapter(provider: Arc<StubProvider>) -> (ActionAdapter, AuditLog) {
        let audit = AuditLog::new();
        (
            ActionAdapter::new(provider, Duration::from_millis(100), audit.clone()),
            audit,
        )
    }

    #[tokio::test]
    async fn non_sandbox_endpoint_is_fatal_and_never_called() {
        let mut provider = StubProvider::new(json!({}));
        provider.endpoint = "https://api-m.paypal.com".into();
        let provider = Arc::new(provider);
        let (adapter, _audit) = adapter(provider.clone());

        let result = adapter
            .execute(&spec("check_balance"), &json!({}))
            .await;

        assert!(matches!(result, Err(AgentError::ModeViolation(_))));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn balance_response_is_normalized() {
        let provider = Arc::new(StubProvider::new(json!({
            "balances": [{
                "currency": "USD",
                "available_balance": {"currency_code": "USD", "value": "123.45"},
            }]
        })));
        let (adapter, audit) = adapter(provider.clone());

        let result = adapter
            .execute(&spec("check_balance"), &json!({"currency": "USD"}))
            .await
            .unwrap();

        assert!(result.is_success());
        assert!(result.sandbox);
        let payload = result.payload.unwrap();
        assert_eq!(payload["amount"], 123.45);
        assert_eq!(payload["currency"], "USD");
        assert_eq!(provider.calls(), 1);

        let visible = audit.user_visible();
        assert!(visible
            .iter()
            .any(|e| e.kind == LogKind::Api && e.message.contains("Completed action")));
    }

    #[tokio::test]
    async fn transactions_keep_signed_amounts() {
        let provider = Arc::new(StubProvider::new(json!({
            "transaction_details": [
                {
                    "transaction_info": {
                        "transaction_subject": "Dinner split",
                        "transaction_initiation_date": "2026-07-01T10:00:00-0000",
                        "transaction_status": "S",
                        "transaction_amount": {"currency_code": "USD", "value": "45.00"},
                    }
                },
                {
                    "transaction_info": {
                        "transaction_initiation_date": "2026-07-03T12:30:00-0000",
                        "transaction_status": "P",
                        "transaction_amount": {"currency_code": "USD", "value": "-20.00"},
                    },
                    "payer_info": {"email_address": "alex@example.com"},
                },
            ]
        })));
        let (adapter, _audit) = adapter(provider);

        let result = adapter
            .execute(&spec("get_transactions"), &json!({}))
            .await
            .unwrap();

        let payload = result.payload.unwrap();
        let transactions = payload["transactions"].as_array().unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0]["description"], "Dinner split");
        assert_eq!(transactions[0]["date"], "2026-07-01");
        assert_eq!(transactions[0]["status"], "Completed");
        assert_eq!(transactions[0]["amount"], 45.0);
        assert_eq!(transactions[1]["description"], "alex@example.com");
        assert_eq!(transactions[1]["status"], "Pending");
        assert_eq!(transactions[1]["amount"], -20.0);
    }

    #[tokio::test]
    async fn provider_timeout_becomes_an_error_observation() {
        let mut provider = StubProvider::new(json!({}));
        provider.delay = Some(Duration::from_millis(300));
        let (adapter, _audit) = adapter(Arc::new(provider));

        let result = adapter
            .execute(&spec("check_balance"), &json!({}))
            .await
            .unwrap();

        assert!(!result.is_success());
        assert!(result.error_detail.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn provider_failure_keeps_raw_cause_in_debug_tier() {
        let mut provider = StubProvider::new(json!({}));
        provider.fail_with = Some(AgentError::ExternalCallFailure(
            "provider rejected /v1/reporting/balances (500): secret internals".into(),
        ));
        let (adapter, audit) = adapter(Arc::new(provider));

        let result = adapter
            .execute(&spec("check_balance"), &json!({}))
            .await
            .unwrap();

        assert!(!result.is_success());
        let detail = result.error_detail.unwrap();
        assert!(!detail.contains("secret internals"));

        // Raw cause is recorded, but only at the debug tier.
        let entries = audit.entries();
        assert!(entries.iter().any(|e| {
            e.tier == LogTier::Debug
                && e.details
                    .as_ref()
                    .is_some_and(|d| d["cause"].as_str().unwrap_or("").contains("secret internals"))
        }));
        assert!(audit
            .user_visible()
            .iter()
            .all(|e| !e.message.contains("secret internals")));
    }

    #[tokio::test]
    async fn unexpected_shape_becomes_an_error_observation() {
        let provider = Arc::new(StubProvider::new(json!({"unexpected": true})));
        let (adapter, _audit) = adapter(provider);

        let result = adapter
            .execute(&spec("check_balance"), &json!({}))
            .await
            .unwrap();

        assert!(!result.is_success());
        assert!(result
            .error_detail
            .unwrap()
            .contains("unexpected response shape"));
    }
}
