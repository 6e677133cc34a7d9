//! Payment capability boundary
//!
//! The adapter reaches the external payment provider exclusively through
//! the `PaymentProvider` trait. Implementations return provider-shaped
//! JSON; normalization into the stable observation shapes is the action
//! adapter's job. Every implementation in this system is restricted to the
//! provider's sandbox environment; `is_sandbox_endpoint` is the single
//! predicate both the provider constructor and the adapter enforce.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AgentError;

pub mod paypal;

pub use paypal::PayPalClient;

pub const SANDBOX_HOST: &str = "api-m.sandbox.paypal.com";

/// True when `url` targets the payment sandbox. Anything else is a mode
/// violation and must never receive a call.
pub fn is_sandbox_endpoint(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split('/').next().unwrap_or("");
    host == SANDBOX_HOST || host.ends_with(".sandbox.paypal.com")
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Base URL the provider will issue calls against.
    fn endpoint(&self) -> &str;

    /// Perform the credential handshake. A successful handshake gates the
    /// adapter's ability to execute; it is not part of the loop itself.
    async fn authenticate(&self) -> Result<(), AgentError>;

    async fn send_money(
        &self,
        recipient: &str,
        amount: f64,
        currency: &str,
        note: Option<&str>,
    ) -> Result<Value, AgentError>;

    async fn check_balance(&self, currency: Option<&str>) -> Result<Value, AgentError>;

    async fn get_transactions(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Value, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_hosts_are_recognized() {
        assert!(is_sandbox_endpoint("https://api-m.sandbox.paypal.com"));
        assert!(is_sandbox_endpoint("https://api-m.sandbox.paypal.com/v1/oauth2/token"));
        assert!(is_sandbox_endpoint("api-m.sandbox.paypal.com"));
    }

    #[test]
    fn live_hosts_are_rejected() {
        assert!(!is_sandbox_endpoint("https://api-m.paypal.com"));
        assert!(!is_sandbox_endpoint("https://api.paypal.com/v2/payments"));
        assert!(!is_sandbox_endpoint("https://sandbox.paypal.com.evil.example"));
        assert!(!is_sandbox_endpoint(""));
    }
}
