//! Application State

use std::sync::Arc;

use minijinja::Environment;

use plug_core::{ActivationService, PlugTrigger, Store, SubscriptionService};
use plug_payments::{PaymentService, PaymentVerifier};

use crate::page;

/// Payment gateway wiring, present only when Razorpay is configured
#[derive(Clone)]
pub struct Payments {
    pub service: Arc<PaymentService>,

    /// Public key id embedded in the landing page
    pub key_id: String,

    pub webhook_secret: Option<String>,
}

impl Payments {
    pub fn new(
        store: Store,
        verifier: Arc<dyn PaymentVerifier>,
        key_id: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            service: Arc::new(PaymentService::new(store, verifier)),
            key_id: key_id.into(),
            webhook_secret,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,

    pub subscriptions: SubscriptionService,

    /// Serializes plug activations
    pub activation: Arc<ActivationService>,

    /// Razorpay (optional - None if not configured)
    pub payments: Option<Payments>,

    pub templates: Arc<Environment<'static>>,
}

impl AppState {
    pub fn new(
        store: Store,
        activation: ActivationService,
        payments: Option<Payments>,
    ) -> Result<Self, minijinja::Error> {
        Ok(Self {
            subscriptions: SubscriptionService::new(store.clone()),
            store,
            activation: Arc::new(activation),
            payments,
            templates: Arc::new(page::templates()?),
        })
    }

    /// Wire state with the real plug trigger
    pub fn with_trigger(
        store: Store,
        trigger: Arc<dyn PlugTrigger>,
        payments: Option<Payments>,
    ) -> Result<Self, minijinja::Error> {
        let activation = ActivationService::new(store.clone(), trigger);
        Self::new(store, activation, payments)
    }
}
