use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::errors::AgentError;
use crate::payments::{is_sandbox_endpoint, PaymentProvider};

const OAUTH_SCOPES: &str = "https://uri.paypal.com/services/payments/payment \
https://uri.paypal.com/services/payments/refund \
https://uri.paypal.com/services/reporting/search/read \
https://uri.paypal.com/services/wallet/balance/read";

/// Window used for transaction queries when the caller gives no range.
const DEFAULT_HISTORY_DAYS: i64 = 30;

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// PayPal REST client bound to the sandbox environment. The constructor
/// rejects any non-sandbox base URL, so an instance of this type cannot
/// reach the live API.
pub struct PayPalClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl PayPalClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, AgentError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !is_sandbox_endpoint(&base_url) {
            return Err(AgentError::ModeViolation(format!(
                "'{}' is not a sandbox endpoint",
                base_url
            )));
        }
        log::info!("PayPal client initialized against sandbox: {}", base_url);
        Ok(Self {
            client: Client::new(),
            base_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: Mutex::new(None),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    /// Fetch or reuse the OAuth access token. Tokens are cached until one
    /// minute before expiry.
    async fn access_token(&self) -> Result<String, AgentError> {
        let mut cache = self.token.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let url = format!("{}/v1/oauth2/token", self.base_url);
        log::debug!("Requesting OAuth token from {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("Accept", "application/json")
            .form(&[("grant_type", "client_credentials"), ("scope", OAUTH_SCOPES)])
            .send()
            .await
            .map_err(|e| AgentError::ExternalCallFailure(format!("OAuth request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            AgentError::ExternalCallFailure(format!("OAuth response unreadable: {}", e))
        })?;

        if !status.is_success() {
            return Err(AgentError::ExternalCallFailure(format!(
                "OAuth handshake rejected ({}): {}",
                status,
                body["error_description"].as_str().unwrap_or("unknown error")
            )));
        }

        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| {
                AgentError::ParsingError("OAuth response missing access_token".to_string())
            })?
            .to_string();
        let expires_in = body["expires_in"].as_u64().unwrap_or(300);

        log::debug!("Obtained sandbox access token (expires in {}s)", expires_in);
        *cache = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in.saturating_sub(60)),
        });
        Ok(access_token)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, AgentError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| AgentError::ExternalCallFailure(format!("GET {} failed: {}", path, e)))?;

        read_provider_response(path, response).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, AgentError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(|e| AgentError::ExternalCallFailure(format!("POST {} failed: {}", path, e)))?;

        read_provider_response(path, response).await
    }
}

async fn read_provider_response(
    path: &str,
    response: reqwest::Response,
) -> Result<Value, AgentError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AgentError::ExternalCallFailure(format!("{} response unreadable: {}", path, e)))?;

    log::debug!("Provider response for {} ({}): {}", path, status, text);

    if !status.is_success() {
        return Err(AgentError::ExternalCallFailure(format!(
            "provider rejected {} ({}): {}",
            path, status, text
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| AgentError::ParsingError(format!("{} returned invalid JSON: {}", path, e)))
}

fn payout_payload(recipient: &str, amount: f64, currency: &str, note: Option<&str>) -> Value {
    let batch_id = format!("batch_{}", uuid::Uuid::new_v4().simple());
    json!({
        "sender_batch_header": {
            "sender_batch_id": batch_id,
            "email_subject": "You received a payment",
        },
        "items": [{
            "recipient_type": "EMAIL",
            "amount": {
                "value": format!("{:.2}", amount),
                "currency": currency,
            },
            "receiver": recipient,
            "note": note.unwrap_or("Payment from the sandbox payment agent"),
            "sender_item_id": format!("item_{}", uuid::Uuid::new_v4().simple()),
        }],
    })
}

fn default_history_window() -> (String, String) {
    let end = Utc::now();
    let start = end - ChronoDuration::days(DEFAULT_HISTORY_DAYS);
    let fmt = "%Y-%m-%dT%H:%M:%S-0000";
    (start.format(fmt).to_string(), end.format(fmt).to_string())
}

#[async_trait]
impl PaymentProvider for PayPalClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn authenticate(&self) -> Result<(), AgentError> {
        self.access_token().await.map(|_| ())
    }

    async fn send_money(
        &self,
        recipient: &str,
        amount: f64,
        currency: &str,
        note: Option<&str>,
    ) -> Result<Value, AgentError> {
        log::info!("Sending {} {} to {} via sandbox payouts", amount, currency, recipient);
        let payload = payout_payload(recipient, amount, currency, note);
        self.post_json("/v2/payments/payouts", &payload).await
    }

    async fn check_balance(&self, currency: Option<&str>) -> Result<Value, AgentError> {
        let mut query = Vec::new();
        if let Some(currency) = currency {
            query.push(("currency_code", currency.to_string()));
        }
        self.get_json("/v1/reporting/balances", &query).await
    }

    async fn get_transactions(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Value, AgentError> {
        let (default_start, default_end) = default_history_window();
        let query = vec![
            (
                "start_date",
                start_date.unwrap_or(&default_start).to_string(),
            ),
            ("end_date", end_date.unwrap_or(&default_end).to_string()),
            ("fields", "transaction_info,payer_info".to_string()),
        ];
        self.get_json("/v1/reporting/transactions", &query).await
    }
}
