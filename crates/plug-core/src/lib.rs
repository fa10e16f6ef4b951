//! # plug-core
//!
//! Subscriber storage, daily usage limits and smart plug triggering.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ Subscription │   │    Activation    │──▶│  PlugTrigger  │──▶ vendor API
//! │   Service    │   │ (gate + quota +  │   └───────────────┘
//! └──────┬───────┘   │  30 min window)  │
//!        │           └────────┬─────────┘
//!        └──────────┬─────────┘
//!             ┌─────▼─────┐
//!             │   Store   │  SQLite: customers, plug_status, payments
//!             └───────────┘
//! ```

pub mod activation;
pub mod error;
pub mod model;
pub mod store;
pub mod subscription;
pub mod trigger;
pub mod usage;

pub use activation::{ActivationOutcome, ActivationService, Clock};
pub use error::{CoreError, Result};
pub use model::{ACTIVATION_WINDOW_MINUTES, DAILY_ACTIVATION_LIMIT, PlugLock, Subscriber};
pub use store::{NewPayment, PaymentApplication, Store};
pub use subscription::SubscriptionService;
pub use trigger::{HttpPlugTrigger, PlugTrigger, TriggerConfig};
pub use usage::{Denial, Reservation, check_and_reserve};
