//! Payment Recording
//!
//! Turns a confirmed payment into subscription time.

use std::sync::Arc;

use chrono::Local;

use plug_core::{NewPayment, PaymentApplication, Store};

use crate::error::Result;
use crate::plan::Plan;
use crate::razorpay::{ExpectedPayment, PaymentVerifier};

/// Credit a confirmed gateway payment once
///
/// The subscription is extended by `plan`'s validity from the stored expiry,
/// or from today for a new subscriber. A payment id seen before changes
/// nothing.
pub(crate) async fn record_payment(
    store: &Store,
    payment_id: &str,
    phone: &str,
    plan: Plan,
) -> Result<PaymentApplication> {
    let payment = NewPayment {
        payment_id,
        phone,
        plan: plan.as_str(),
        amount: plan.amount(),
    };

    let applied = store
        .apply_payment(&payment, plan.validity_days(), Local::now().naive_local())
        .await?;

    match applied {
        PaymentApplication::Applied { expiry_date } => {
            tracing::info!(
                payment_id = %payment_id,
                phone = %phone,
                plan = %plan,
                expiry = %expiry_date,
                "Payment credited"
            );
        }
        PaymentApplication::AlreadyApplied => {
            tracing::debug!(payment_id = %payment_id, "Payment already credited");
        }
    }

    Ok(applied)
}

/// Confirms checkout callbacks with the gateway before granting time
pub struct PaymentService {
    store: Store,
    verifier: Arc<dyn PaymentVerifier>,
}

impl PaymentService {
    pub fn new(store: Store, verifier: Arc<dyn PaymentVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Verify `payment_id` pays for `plan` on `phone`, then credit it
    ///
    /// Repeating a confirmation for the same payment id is harmless.
    pub async fn confirm(
        &self,
        phone: &str,
        plan: Plan,
        payment_id: &str,
    ) -> Result<PaymentApplication> {
        self.verifier
            .verify(payment_id, &ExpectedPayment { phone, plan })
            .await?;

        record_payment(&self.store, payment_id, phone, plan).await
    }
}
