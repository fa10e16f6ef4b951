//! Landing Page

use minijinja::{Environment, context};
use serde::Serialize;

use plug_core::{ACTIVATION_WINDOW_MINUTES, DAILY_ACTIVATION_LIMIT};
use plug_payments::Plan;

const INDEX: &str = "index.html";

/// One row of the pricing table
#[derive(Serialize)]
struct PlanView {
    name: &'static str,
    label: &'static str,
    amount: i64,
    price: String,
}

impl From<Plan> for PlanView {
    fn from(plan: Plan) -> Self {
        Self {
            name: plan.as_str(),
            label: plan.label(),
            amount: plan.amount(),
            price: format!("₹{}", plan.amount() / 100),
        }
    }
}

pub fn templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(INDEX, include_str!("../templates/index.html"))?;
    Ok(env)
}

/// Render the landing page; `razorpay_key` is the public key id, if any
pub fn render_index(
    env: &Environment<'_>,
    razorpay_key: Option<&str>,
) -> Result<String, minijinja::Error> {
    let plans: Vec<PlanView> = Plan::ALL.into_iter().map(PlanView::from).collect();

    env.get_template(INDEX)?.render(context! {
        razorpay_key => razorpay_key,
        plans => plans,
        daily_limit => DAILY_ACTIVATION_LIMIT,
        window_minutes => ACTIVATION_WINDOW_MINUTES,
    })
}
