//! Razorpay Integration
//!
//! The checkout widget runs entirely in the browser and only reports a
//! payment id back. Before any subscription time is granted the server looks
//! that payment up with the Razorpay API and checks it against the plan.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::plan::{CURRENCY, Plan};

pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

/// Razorpay credentials
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Public key id, safe to embed in pages
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RazorpayConfig {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: None,
            api_base: DEFAULT_API_BASE.into(),
            timeout_secs: 10,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Create from any `RAZORPAY_*` variable source
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key_id = var("RAZORPAY_KEY_ID")
            .ok_or_else(|| PaymentError::Config("RAZORPAY_KEY_ID not set".into()))?;
        let key_secret = var("RAZORPAY_KEY_SECRET")
            .ok_or_else(|| PaymentError::Config("RAZORPAY_KEY_SECRET not set".into()))?;

        let mut config = Self::new(key_id, key_secret);
        config.webhook_secret = var("RAZORPAY_WEBHOOK_SECRET");
        if let Some(api_base) = var("RAZORPAY_API_BASE") {
            config.api_base = api_base;
        }
        if let Some(secs) = var("RAZORPAY_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.timeout_secs = secs;
        }

        Ok(config)
    }
}

/// What the caller claims to have paid for
#[derive(Clone, Debug)]
pub struct ExpectedPayment<'a> {
    pub phone: &'a str,
    pub plan: Plan,
}

/// A payment the gateway has confirmed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub payment_id: String,
    pub amount: i64,
    pub status: String,
}

/// Server-side payment confirmation
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// Confirm that `payment_id` is a completed payment for `expected`
    async fn verify(&self, payment_id: &str, expected: &ExpectedPayment<'_>)
    -> Result<VerifiedPayment>;
}

/// Payment entity as returned by `GET /v1/payments/{id}`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,

    /// Object of string notes, or an empty array when there are none
    #[serde(default)]
    pub notes: serde_json::Value,
}

impl RazorpayPayment {
    pub fn note(&self, key: &str) -> Option<&str> {
        self.notes.get(key).and_then(serde_json::Value::as_str)
    }

    /// Captured or at least authorized
    pub fn is_paid(&self) -> bool {
        matches!(self.status.as_str(), "authorized" | "captured")
    }
}

/// Razorpay client wrapper
pub struct RazorpayClient {
    client: reqwest::Client,
    config: RazorpayConfig,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(RazorpayConfig::from_env()?)
    }

    /// Public key id for the checkout widget
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.config.webhook_secret.as_deref()
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment> {
        let url = format!(
            "{}/v1/payments/{}",
            self.config.api_base.trim_end_matches('/'),
            payment_id
        );

        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            return Err(PaymentError::NotVerified(format!(
                "payment {payment_id} not found"
            )));
        }
        if !status.is_success() {
            return Err(PaymentError::Gateway(format!("payments API returned {status}")));
        }

        response
            .json::<RazorpayPayment>()
            .await
            .map_err(|e| PaymentError::Gateway(format!("unexpected payment payload: {e}")))
    }
}

/// Razorpay payment ids look like `pay_XXXXXXXXXXXXXX`
pub fn is_valid_payment_id(payment_id: &str) -> bool {
    payment_id
        .strip_prefix("pay_")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Check a gateway payment against what the caller says it bought
pub(crate) fn check_payment(
    payment: &RazorpayPayment,
    expected: &ExpectedPayment<'_>,
) -> Result<()> {
    if !payment.is_paid() {
        return Err(PaymentError::NotVerified(format!(
            "payment status is {}",
            payment.status
        )));
    }

    if payment.currency != CURRENCY || payment.amount != expected.plan.amount() {
        return Err(PaymentError::NotVerified(format!(
            "paid {} {} but {} plan costs {} {CURRENCY}",
            payment.amount,
            payment.currency,
            expected.plan,
            expected.plan.amount()
        )));
    }

    if let Some(noted_phone) = payment.note("phone") {
        if noted_phone != expected.phone {
            return Err(PaymentError::NotVerified(
                "payment was made for a different phone".into(),
            ));
        }
    }

    Ok(())
}

#[async_trait]
impl PaymentVerifier for RazorpayClient {
    async fn verify(
        &self,
        payment_id: &str,
        expected: &ExpectedPayment<'_>,
    ) -> Result<VerifiedPayment> {
        if !is_valid_payment_id(payment_id) {
            return Err(PaymentError::NotVerified(format!(
                "malformed payment id {payment_id:?}"
            )));
        }

        let payment = self.fetch_payment(payment_id).await?;
        check_payment(&payment, expected)?;

        tracing::info!(
            payment_id = %payment.id,
            amount = payment.amount,
            status = %payment.status,
            "Razorpay payment verified"
        );

        Ok(VerifiedPayment {
            payment_id: payment.id,
            amount: payment.amount,
            status: payment.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> RazorpayClient {
        RazorpayClient::new(RazorpayConfig {
            api_base: server.base_url(),
            ..RazorpayConfig::new("rzp_test_key", "rzp_test_secret")
        })
        .unwrap()
    }

    fn weekly_for(phone: &str) -> ExpectedPayment<'_> {
        ExpectedPayment {
            phone,
            plan: Plan::Weekly,
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_reads_optional_vars() {
        let config = RazorpayConfig::from_vars(vars(&[
            ("RAZORPAY_KEY_ID", "rzp_live_key"),
            ("RAZORPAY_KEY_SECRET", "shh"),
            ("RAZORPAY_WEBHOOK_SECRET", "whsec"),
            ("RAZORPAY_API_BASE", "http://localhost:9000"),
            ("RAZORPAY_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.key_id, "rzp_live_key");
        assert_eq!(config.webhook_secret.as_deref(), Some("whsec"));
        assert_eq!(config.api_base, "http://localhost:9000");
        assert_eq!(config.timeout_secs, 3);
        assert!(!format!("{config:?}").contains("shh"));
    }

    #[test]
    fn test_config_defaults_and_required_keys() {
        let config = RazorpayConfig::from_vars(vars(&[
            ("RAZORPAY_KEY_ID", "rzp_test_key"),
            ("RAZORPAY_KEY_SECRET", "shh"),
            ("RAZORPAY_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.webhook_secret, None);

        let missing = RazorpayConfig::from_vars(vars(&[("RAZORPAY_KEY_ID", "rzp_test_key")]));
        assert!(matches!(missing, Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_payment_id_format() {
        assert!(is_valid_payment_id("pay_29QQoUBi66xm2f"));
        assert!(!is_valid_payment_id("pay_"));
        assert!(!is_valid_payment_id("order_29QQoUBi66xm2f"));
        assert!(!is_valid_payment_id("pay_../../orders"));
    }

    #[tokio::test]
    async fn test_captured_payment_is_verified() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/payments/pay_ABC123")
                    .header_exists("authorization");
                then.status(200).json_body(serde_json::json!({
                    "id": "pay_ABC123",
                    "entity": "payment",
                    "amount": 14900,
                    "currency": "INR",
                    "status": "captured",
                    "notes": {"phone": "9999999999", "plan": "weekly"}
                }));
            })
            .await;

        let verified = client_for(&server)
            .verify("pay_ABC123", &weekly_for("9999999999"))
            .await
            .unwrap();

        assert_eq!(verified.amount, 14900);
        assert_eq!(verified.status, "captured");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_payment_without_notes_is_verified() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payments/pay_ABC123");
                then.status(200).json_body(serde_json::json!({
                    "id": "pay_ABC123",
                    "amount": 14900,
                    "currency": "INR",
                    "status": "authorized",
                    "notes": []
                }));
            })
            .await;

        let result = client_for(&server)
            .verify("pay_ABC123", &weekly_for("9999999999"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_underpaid_payment_is_rejected() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payments/pay_ABC123");
                then.status(200).json_body(serde_json::json!({
                    "id": "pay_ABC123",
                    "amount": 7900,
                    "currency": "INR",
                    "status": "captured",
                    "notes": {}
                }));
            })
            .await;

        let err = client_for(&server)
            .verify("pay_ABC123", &weekly_for("9999999999"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotVerified(_)));
    }

    #[tokio::test]
    async fn test_failed_payment_is_rejected() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payments/pay_ABC123");
                then.status(200).json_body(serde_json::json!({
                    "id": "pay_ABC123",
                    "amount": 14900,
                    "currency": "INR",
                    "status": "failed"
                }));
            })
            .await;

        let err = client_for(&server)
            .verify("pay_ABC123", &weekly_for("9999999999"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotVerified(_)));
    }

    #[tokio::test]
    async fn test_payment_for_other_phone_is_rejected() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payments/pay_ABC123");
                then.status(200).json_body(serde_json::json!({
                    "id": "pay_ABC123",
                    "amount": 14900,
                    "currency": "INR",
                    "status": "captured",
                    "notes": {"phone": "1111111111"}
                }));
            })
            .await;

        let err = client_for(&server)
            .verify("pay_ABC123", &weekly_for("9999999999"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotVerified(_)));
    }

    #[tokio::test]
    async fn test_unknown_payment_is_not_verified() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payments/pay_MISSING");
                then.status(404);
            })
            .await;

        let err = client_for(&server)
            .verify("pay_MISSING", &weekly_for("9999999999"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotVerified(_)));
    }

    #[tokio::test]
    async fn test_gateway_outage_is_retryable() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payments/pay_ABC123");
                then.status(502);
            })
            .await;

        let err = client_for(&server)
            .verify("pay_ABC123", &weekly_for("9999999999"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Gateway(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = RazorpayConfig::new("rzp_test_key", "very-secret");
        config.webhook_secret = Some("hook-secret".into());
        let rendered = format!("{config:?}");
        assert!(rendered.contains("rzp_test_key"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("hook-secret"));
    }
}
