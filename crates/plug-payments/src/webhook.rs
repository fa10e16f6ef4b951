//! Razorpay Webhook Handling
//!
//! Captured payments reported by Razorpay are credited through the same
//! payment ledger as the checkout callback, so each payment grants time once
//! no matter which path sees it first.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use plug_core::{PaymentApplication, Store};

use crate::error::{PaymentError, Result};
use crate::payment::record_payment;
use crate::plan::Plan;
use crate::razorpay::{ExpectedPayment, RazorpayPayment, check_payment};

type HmacSha256 = Hmac<Sha256>;

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Payment authorized or captured - extend the subscription
    PaymentCaptured(RazorpayPayment),

    /// Payment failed
    PaymentFailed { payment_id: String },

    /// Unhandled event type
    Other { event_type: String },
}

#[derive(Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    payload: RawPayload,
}

#[derive(Default, Deserialize)]
struct RawPayload {
    payment: Option<RawPaymentWrapper>,
}

#[derive(Deserialize)]
struct RawPaymentWrapper {
    entity: RazorpayPayment,
}

impl RawEvent {
    fn into_payment(self) -> Result<RazorpayPayment> {
        self.payload
            .payment
            .map(|p| p.entity)
            .ok_or_else(|| PaymentError::WebhookParse("missing payment entity".into()))
    }
}

/// Check the `X-Razorpay-Signature` header: hex HMAC-SHA256 of the raw body
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> Result<()> {
    let expected = hex::decode(signature.trim())
        .map_err(|_| PaymentError::WebhookSignature("signature is not hex".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::WebhookSignature("signature mismatch".into()))
}

/// Parse a Razorpay webhook body into our event type
pub fn parse_event(payload: &str) -> Result<WebhookEvent> {
    let raw: RawEvent =
        serde_json::from_str(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

    match raw.event.as_str() {
        "payment.captured" | "payment.authorized" => {
            Ok(WebhookEvent::PaymentCaptured(raw.into_payment()?))
        }
        "payment.failed" => match raw.payload.payment {
            Some(p) => Ok(WebhookEvent::PaymentFailed {
                payment_id: p.entity.id,
            }),
            None => Ok(WebhookEvent::Other { event_type: raw.event }),
        },
        _ => Ok(WebhookEvent::Other { event_type: raw.event }),
    }
}

/// Webhook handler
pub struct WebhookHandler {
    store: Store,
}

impl WebhookHandler {
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &str, signature: &str, secret: &str) -> Result<WebhookEvent> {
        verify_webhook_signature(payload.as_bytes(), signature, secret)?;
        parse_event(payload)
    }

    /// Process a webhook event
    ///
    /// Payments that cannot be tied to a phone and plan are logged and
    /// acknowledged, never retried.
    pub async fn handle(&self, event: WebhookEvent) -> Result<Option<PaymentApplication>> {
        match event {
            WebhookEvent::PaymentCaptured(payment) => {
                tracing::info!(payment_id = %payment.id, "Processing captured payment webhook");

                let (Some(phone), Some(plan)) = (payment.note("phone"), payment.note("plan")) else {
                    tracing::warn!(payment_id = %payment.id, "Captured payment without phone/plan notes");
                    return Ok(None);
                };

                let Ok(plan) = plan.parse::<Plan>() else {
                    tracing::warn!(payment_id = %payment.id, plan = %plan, "Captured payment for unknown plan");
                    return Ok(None);
                };

                if let Err(e) = check_payment(&payment, &ExpectedPayment { phone, plan }) {
                    tracing::warn!(payment_id = %payment.id, error = %e, "Captured payment does not match plan");
                    return Ok(None);
                }

                let applied = record_payment(&self.store, &payment.id, phone, plan).await?;
                Ok(Some(applied))
            }

            WebhookEvent::PaymentFailed { payment_id } => {
                tracing::warn!(payment_id = %payment_id, "Payment failed");
                Ok(None)
            }

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(None)
            }
        }
    }
}
