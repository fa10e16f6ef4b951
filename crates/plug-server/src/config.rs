//! Server Configuration
//!
//! Everything is read from the environment (after `.env` is loaded).

use plug_core::TriggerConfig;
use plug_payments::RazorpayConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// `BIND_ADDR`
    pub bind_addr: String,

    /// `DATABASE_URL`
    pub database_url: String,

    pub trigger: TriggerConfig,

    /// None when Razorpay keys are absent; payment endpoints then answer 503
    pub razorpay: Option<RazorpayConfig>,
}

impl AppConfig {
    /// Plug trigger credentials are required; Razorpay keys are optional
    pub fn from_env() -> anyhow::Result<Self> {
        let razorpay = match RazorpayConfig::from_env() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::debug!("Razorpay config unavailable: {}", e);
                None
            }
        };

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://database.db".into()),
            trigger: TriggerConfig::from_env()?,
            razorpay,
        })
    }
}
