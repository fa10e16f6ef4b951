//! Subscription Plans
//!
//! Fixed price table in paise and the validity each plan buys.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// Currency every plan is charged in
pub const CURRENCY: &str = "INR";

/// Subscription plan tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Daily,
    Weekly,
    Monthly,
}

impl Plan {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Price in paise
    pub const fn amount(&self) -> i64 {
        match self {
            Self::Daily => 7900,
            Self::Weekly => 14900,
            Self::Monthly => 19900,
        }
    }

    /// Days added to the subscriber's expiry date
    pub const fn validity_days(&self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Daily => "1 Day",
            Self::Weekly => "1 Week",
            Self::Monthly => "1 Month",
        }
    }
}

impl FromStr for Plan {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(PaymentError::UnknownPlan(s.to_string())),
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
