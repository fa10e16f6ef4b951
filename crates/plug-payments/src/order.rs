//! Checkout Orders
//!
//! Orders are prepared locally for the Razorpay checkout widget; no gateway
//! call is made until the payment is confirmed.

use serde::{Deserialize, Serialize};

use crate::plan::Plan;

/// Data the page hands to the checkout widget
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Amount in paise
    pub amount: i64,
    pub plan: Plan,
    pub phone: String,
}

/// Price `plan` for `phone`
pub fn create_order(plan: Plan, phone: impl Into<String>) -> Order {
    Order {
        amount: plan.amount(),
        plan,
        phone: phone.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekly_order() {
        let order = create_order(Plan::Weekly, "9999999999");
        assert_eq!(
            serde_json::to_value(&order).unwrap(),
            serde_json::json!({"amount": 14900, "plan": "weekly", "phone": "9999999999"})
        );
    }
}
