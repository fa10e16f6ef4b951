//! Persisted records
//!
//! A subscriber row per phone number and the singleton plug lock.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Successful activations allowed per subscriber per calendar day
pub const DAILY_ACTIVATION_LIMIT: u32 = 2;

/// Minutes a single activation keeps the plug busy
pub const ACTIVATION_WINDOW_MINUTES: i64 = 30;

pub fn activation_window() -> TimeDelta {
    TimeDelta::minutes(ACTIVATION_WINDOW_MINUTES)
}

/// Seed value of the plug lock, far enough in the past to never block
pub fn lock_sentinel() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// A paying customer, keyed by phone number
#[derive(Clone, Debug, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Subscriber {
    pub phone: String,

    /// Last day (inclusive) the subscription is valid
    pub expiry_date: NaiveDate,

    /// Activations used on `last_used_date`
    pub daily_usage: u32,

    pub last_used_date: Option<NaiveDate>,
}

impl Subscriber {
    /// Active through the whole expiry day
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.expiry_date >= today
    }

    /// Usage counted against `today`; stale counters read as zero
    pub fn usage_on(&self, today: NaiveDate) -> u32 {
        if self.last_used_date == Some(today) {
            self.daily_usage
        } else {
            0
        }
    }

    /// Whether the stored counter belongs to a previous day
    pub fn needs_daily_reset(&self, today: NaiveDate) -> bool {
        self.last_used_date != Some(today)
    }
}

/// Singleton record of the most recent plug activation
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PlugLock {
    pub last_activation_time: NaiveDateTime,
}

impl PlugLock {
    /// Time since the last activation, clamped at zero for stamps in the future
    pub fn elapsed(&self, now: NaiveDateTime) -> TimeDelta {
        (now - self.last_activation_time).max(TimeDelta::zero())
    }

    /// The plug is busy while the activation window is still open
    pub fn is_in_use(&self, now: NaiveDateTime) -> bool {
        self.elapsed(now) < activation_window()
    }

    /// Whole minutes left in the window: `max(0, 30 - floor(elapsed / 60s))`
    pub fn minutes_left(&self, now: NaiveDateTime) -> i64 {
        (ACTIVATION_WINDOW_MINUTES - self.elapsed(now).num_minutes()).max(0)
    }
}

impl Default for PlugLock {
    fn default() -> Self {
        Self {
            last_activation_time: lock_sentinel(),
        }
    }
}
