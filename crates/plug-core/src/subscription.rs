//! Subscription status

use chrono::{Local, NaiveDate};

use crate::error::Result;
use crate::store::Store;

/// Answers "is this phone currently subscribed?"
#[derive(Clone, Debug)]
pub struct SubscriptionService {
    store: Store,
}

impl SubscriptionService {
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Unknown phones are simply not subscribed
    pub async fn is_active(&self, phone: &str) -> Result<bool> {
        self.is_active_at(phone, Local::now().date_naive()).await
    }

    pub async fn is_active_at(&self, phone: &str, today: NaiveDate) -> Result<bool> {
        let active = self
            .store
            .subscriber(phone)
            .await?
            .is_some_and(|sub| sub.is_active_on(today));
        Ok(active)
    }
}
