//! Daily quota and activation window rules

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::{DAILY_ACTIVATION_LIMIT, PlugLock, Subscriber};

/// Permission to fire the plug once, valid for the instant it was issued
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reservation {
    pub today: NaiveDate,
    pub now: NaiveDateTime,

    /// Subscriber's usage for `today` once this activation is committed
    pub usage_after: u32,
}

/// Why an activation was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    SubscriptionExpired,
    DailyLimitReached,
    PlugInUse { minutes_left: i64 },
}

impl Denial {
    pub fn message(&self) -> String {
        match self {
            Self::SubscriptionExpired => "Subscription expired".into(),
            Self::DailyLimitReached => {
                format!("Daily limit reached ({DAILY_ACTIVATION_LIMIT} uses per day)")
            }
            Self::PlugInUse { minutes_left } => {
                format!("Plug in use. Time left: {minutes_left} minutes")
            }
        }
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Decide whether `subscriber` may activate the plug at `now`
///
/// The daily quota is checked before the shared activation window. Counters
/// from an earlier day are treated as zero.
pub fn check_and_reserve(
    subscriber: &Subscriber,
    lock: &PlugLock,
    now: NaiveDateTime,
) -> Result<Reservation, Denial> {
    let today = now.date();
    let used = subscriber.usage_on(today);

    if used >= DAILY_ACTIVATION_LIMIT {
        return Err(Denial::DailyLimitReached);
    }

    if lock.is_in_use(now) {
        return Err(Denial::PlugInUse {
            minutes_left: lock.minutes_left(now),
        });
    }

    Ok(Reservation {
        today,
        now,
        usage_after: used + 1,
    })
}
