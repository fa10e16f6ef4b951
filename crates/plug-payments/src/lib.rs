//! # plug-payments
//!
//! Plans, orders and Razorpay payment confirmation for plugpass.
//!
//! ## Payment flow
//!
//! ```text
//! ┌──────────┐ create_order ┌──────────┐  widget   ┌──────────┐
//! │  Page    │─────────────▶│  Server  │──────────▶│ Razorpay │
//! │          │◀─────────────│          │           │ Checkout │
//! └────┬─────┘ amount/plan  └────▲─────┘           └────┬─────┘
//!      │ handle_payment(payment_id)   │ GET /v1/payments/{id}  │
//!      └──────────────────────────────┘◀───────────────────────┘
//! ```
//!
//! The browser only ever reports a payment id. Subscription time is granted
//! after the server has fetched that payment from Razorpay and checked status,
//! amount and currency against the plan. Captured-payment webhooks feed the
//! same ledger, so a payment is credited once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plug_payments::{PaymentService, Plan, RazorpayClient};
//!
//! let client = RazorpayClient::from_env()?;
//! let payments = PaymentService::new(store, Arc::new(client));
//!
//! payments.confirm("9999999999", Plan::Weekly, "pay_29QQoUBi66xm2f").await?;
//! ```

mod error;
mod order;
mod payment;
mod plan;
mod razorpay;
mod webhook;

pub use error::{PaymentError, Result};
pub use order::{Order, create_order};
pub use payment::PaymentService;
pub use plan::{CURRENCY, Plan};
pub use razorpay::{
    ExpectedPayment, PaymentVerifier, RazorpayClient, RazorpayConfig, RazorpayPayment,
    VerifiedPayment, is_valid_payment_id,
};
pub use webhook::{WebhookEvent, WebhookHandler, parse_event, verify_webhook_signature};
