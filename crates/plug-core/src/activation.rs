//! Plug Activation
//!
//! Runs "check quota and window, fire the plug, stamp the lock" as one step.
//! A process-wide gate is held for the whole sequence so two requests can
//! never both see an idle plug, and the two writes of a successful activation
//! share one transaction.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::ACTIVATION_WINDOW_MINUTES;
use crate::store::Store;
use crate::trigger::PlugTrigger;
use crate::usage::{Denial, check_and_reserve};

/// Source of "now" for activation decisions
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Result of an activation request, as reported to the caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationOutcome {
    pub success: bool,
    pub message: String,
}

impl ActivationOutcome {
    pub fn activated() -> Self {
        Self {
            success: true,
            message: format!("Smart Plug Activated for {ACTIVATION_WINDOW_MINUTES} minutes!"),
        }
    }

    pub fn denied(denial: Denial) -> Self {
        Self {
            success: false,
            message: denial.message(),
        }
    }
}

pub struct ActivationService {
    store: Store,
    trigger: Arc<dyn PlugTrigger>,
    clock: Clock,
    gate: Mutex<()>,
}

impl ActivationService {
    pub fn new(store: Store, trigger: Arc<dyn PlugTrigger>) -> Self {
        Self::with_clock(store, trigger, Arc::new(|| Local::now().naive_local()))
    }

    pub fn with_clock(store: Store, trigger: Arc<dyn PlugTrigger>, clock: Clock) -> Self {
        Self {
            store,
            trigger,
            clock,
            gate: Mutex::new(()),
        }
    }

    /// Try to switch the plug on for `phone`
    ///
    /// Refusals come back as an unsuccessful outcome. Errors are reserved for
    /// storage and trigger failures; a failed trigger leaves no usage or lock
    /// stamp behind.
    pub async fn activate(&self, phone: &str) -> Result<ActivationOutcome> {
        let _guard = self.gate.lock().await;
        let now = (self.clock)();
        let today = now.date();

        let Some(subscriber) = self
            .store
            .subscriber(phone)
            .await?
            .filter(|sub| sub.is_active_on(today))
        else {
            tracing::info!(phone = %phone, "Activation refused: no active subscription");
            return Ok(ActivationOutcome::denied(Denial::SubscriptionExpired));
        };

        if subscriber.needs_daily_reset(today) {
            self.store.reset_daily_usage(phone, today).await?;
        }

        let lock = self.store.plug_lock().await?;
        let reservation = match check_and_reserve(&subscriber, &lock, now) {
            Ok(reservation) => reservation,
            Err(denial) => {
                tracing::info!(phone = %phone, reason = ?denial, "Activation refused");
                return Ok(ActivationOutcome::denied(denial));
            }
        };

        self.trigger.activate().await?;

        if let Err(e) = self
            .store
            .commit_activation(phone, reservation.today, reservation.now)
            .await
        {
            tracing::error!(phone = %phone, error = %e, "Plug fired but activation was not recorded");
            return Err(e);
        }

        tracing::info!(
            phone = %phone,
            usage_today = reservation.usage_after,
            "Plug activated"
        );

        Ok(ActivationOutcome::activated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeDelta};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingTrigger {
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl PlugTrigger for CountingTrigger {
        async fn activate(&self) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingTrigger;

    #[async_trait]
    impl PlugTrigger for FailingTrigger {
        async fn activate(&self) -> Result<()> {
            Err(CoreError::Trigger("vendor returned 500".into()))
        }
    }

    /// Clock the test can move forward
    #[derive(Clone)]
    struct TestClock(Arc<std::sync::Mutex<NaiveDateTime>>);

    impl TestClock {
        fn starting(at: NaiveDateTime) -> Self {
            Self(Arc::new(std::sync::Mutex::new(at)))
        }

        fn advance(&self, by: TimeDelta) {
            *self.0.lock().unwrap() += by;
        }

        fn clock(&self) -> Clock {
            let inner = self.0.clone();
            Arc::new(move || *inner.lock().unwrap())
        }
    }

    fn morning() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    async fn setup(
        trigger: Arc<dyn PlugTrigger>,
        phones: &[&str],
    ) -> (ActivationService, Store, TestClock) {
        let store = Store::in_memory().await.unwrap();
        for phone in phones {
            store.extend_subscription(phone, 30, morning()).await.unwrap();
        }
        let clock = TestClock::starting(morning());
        let service = ActivationService::with_clock(store.clone(), trigger, clock.clock());
        (service, store, clock)
    }

    #[tokio::test]
    async fn test_unknown_phone_is_refused() {
        let trigger = Arc::new(CountingTrigger::default());
        let (service, _, _) = setup(trigger.clone(), &[]).await;

        let outcome = service.activate("404").await.unwrap();
        assert_eq!(outcome, ActivationOutcome::denied(Denial::SubscriptionExpired));
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_subscription_is_refused() {
        let trigger = Arc::new(CountingTrigger::default());
        let (service, _, clock) = setup(trigger.clone(), &["100"]).await;

        clock.advance(TimeDelta::days(31));
        let outcome = service.activate("100").await.unwrap();
        assert_eq!(outcome.message, "Subscription expired");
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_activation_fires_and_stamps() {
        let trigger = Arc::new(CountingTrigger::default());
        let (service, store, _) = setup(trigger.clone(), &["100"]).await;

        let outcome = service.activate("100").await.unwrap();
        assert_eq!(outcome, ActivationOutcome::activated());
        assert_eq!(outcome.message, "Smart Plug Activated for 30 minutes!");
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 1);

        let sub = store.subscriber("100").await.unwrap().unwrap();
        assert_eq!(sub.daily_usage, 1);
        assert_eq!(store.plug_lock().await.unwrap().last_activation_time, morning());
    }

    #[tokio::test]
    async fn test_window_blocks_other_subscribers() {
        let trigger = Arc::new(CountingTrigger::default());
        let (service, _, clock) = setup(trigger.clone(), &["100", "200"]).await;

        assert!(service.activate("100").await.unwrap().success);

        clock.advance(TimeDelta::minutes(12));
        let outcome = service.activate("200").await.unwrap();
        assert_eq!(outcome.message, "Plug in use. Time left: 18 minutes");

        clock.advance(TimeDelta::minutes(18));
        assert!(service.activate("200").await.unwrap().success);
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_third_activation_in_a_day_is_refused() {
        let trigger = Arc::new(CountingTrigger::default());
        let (service, store, clock) = setup(trigger.clone(), &["100"]).await;

        assert!(service.activate("100").await.unwrap().success);
        clock.advance(TimeDelta::minutes(31));
        assert!(service.activate("100").await.unwrap().success);
        clock.advance(TimeDelta::minutes(31));

        let outcome = service.activate("100").await.unwrap();
        assert_eq!(outcome.message, "Daily limit reached (2 uses per day)");
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.subscriber("100").await.unwrap().unwrap().daily_usage, 2);
    }

    #[tokio::test]
    async fn test_counter_resets_on_next_day() {
        let trigger = Arc::new(CountingTrigger::default());
        let (service, store, clock) = setup(trigger.clone(), &["100"]).await;

        assert!(service.activate("100").await.unwrap().success);
        clock.advance(TimeDelta::minutes(31));
        assert!(service.activate("100").await.unwrap().success);

        clock.advance(TimeDelta::days(1));
        assert!(service.activate("100").await.unwrap().success);

        let sub = store.subscriber("100").await.unwrap().unwrap();
        assert_eq!(sub.daily_usage, 1);
        assert_eq!(sub.last_used_date, Some(morning().date() + TimeDelta::days(1)));
    }

    #[tokio::test]
    async fn test_refused_on_new_day_still_resets_counter() {
        let trigger = Arc::new(CountingTrigger::default());
        let (service, store, clock) = setup(trigger.clone(), &["100", "200"]).await;

        assert!(service.activate("100").await.unwrap().success);
        clock.advance(TimeDelta::minutes(31));
        assert!(service.activate("100").await.unwrap().success);

        // Next day, plug busy with someone else
        clock.advance(TimeDelta::days(1));
        assert!(service.activate("200").await.unwrap().success);
        assert!(!service.activate("100").await.unwrap().success);

        let sub = store.subscriber("100").await.unwrap().unwrap();
        assert_eq!(sub.daily_usage, 0);
    }

    #[tokio::test]
    async fn test_failed_trigger_leaves_no_stamp() {
        let (service, store, _) = setup(Arc::new(FailingTrigger), &["100"]).await;

        let err = service.activate("100").await.unwrap_err();
        assert!(matches!(err, CoreError::Trigger(_)));

        let sub = store.subscriber("100").await.unwrap().unwrap();
        assert_eq!(sub.usage_on(morning().date()), 0);
        assert!(!store.plug_lock().await.unwrap().is_in_use(morning()));
    }

    #[tokio::test]
    async fn test_concurrent_requests_fire_once() {
        let trigger = Arc::new(CountingTrigger {
            calls: AtomicUsize::new(0),
            delay: Some(Duration::from_millis(50)),
        });
        let (service, _, _) = setup(trigger.clone(), &["100", "200"]).await;

        let (a, b) = tokio::join!(service.activate("100"), service.activate("200"));
        let successes = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|outcome| outcome.success)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 1);
    }
}
