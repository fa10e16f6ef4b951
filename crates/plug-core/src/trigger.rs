//! Smart Plug Trigger Client
//!
//! Fires the vendor's URL routine trigger that switches the plug on.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CoreError, Result};

/// Vendor endpoint used when `PLUG_TRIGGER_BASE_URL` is not set
pub const DEFAULT_TRIGGER_BASE_URL: &str =
    "https://www.virtualsmarthome.xyz/url_routine_trigger/activate.php";

/// Plug trigger trait
///
/// Implemented by the HTTP client below and by fakes in tests.
#[async_trait]
pub trait PlugTrigger: Send + Sync {
    /// Switch the plug on
    async fn activate(&self) -> Result<()>;
}

/// Trigger credentials and endpoint
#[derive(Clone)]
pub struct TriggerConfig {
    pub trigger_id: String,
    pub token: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for TriggerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerConfig")
            .field("trigger_id", &self.trigger_id)
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TriggerConfig {
    pub fn new(trigger_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            trigger_id: trigger_id.into(),
            token: token.into(),
            base_url: DEFAULT_TRIGGER_BASE_URL.into(),
            timeout_secs: 10,
        }
    }

    /// Read `PLUG_TRIGGER_*` variables; id and token are required
    pub fn from_env() -> Result<Self> {
        let trigger_id = std::env::var("PLUG_TRIGGER_ID")
            .map_err(|_| CoreError::Config("PLUG_TRIGGER_ID not set".into()))?;
        let token = std::env::var("PLUG_TRIGGER_TOKEN")
            .map_err(|_| CoreError::Config("PLUG_TRIGGER_TOKEN not set".into()))?;

        let mut config = Self::new(trigger_id, token);
        if let Ok(base_url) = std::env::var("PLUG_TRIGGER_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(secs) = std::env::var("PLUG_TRIGGER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout_secs = secs;
        }

        Ok(config)
    }
}

/// Plug trigger backed by a single HTTP GET
pub struct HttpPlugTrigger {
    client: reqwest::Client,
    config: TriggerConfig,
}

impl HttpPlugTrigger {
    pub fn new(config: TriggerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TriggerConfig::from_env()?)
    }
}

#[async_trait]
impl PlugTrigger for HttpPlugTrigger {
    async fn activate(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("trigger", self.config.trigger_id.as_str()),
                ("token", self.config.token.as_str()),
                ("response", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Trigger(format!("vendor returned {status}")));
        }

        tracing::info!(trigger_id = %self.config.trigger_id, "Plug trigger fired");
        Ok(())
    }
}
