//! plugpass HTTP Server
//!
//! Sells time on a shared smart plug: subscription checks, Razorpay
//! checkout, and plug activation with a daily quota.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plug_core::{HttpPlugTrigger, Store};
use plug_payments::RazorpayClient;
use plug_server::{AppState, Payments, config::AppConfig, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Storage
    let store = Store::connect(&config.database_url).await?;
    tracing::info!("✓ Database ready at {}", config.database_url);

    // Plug trigger
    tracing::info!(trigger = ?config.trigger, "✓ Plug trigger configured");
    let trigger = Arc::new(HttpPlugTrigger::new(config.trigger.clone())?);

    // Payments
    let payments = match config.razorpay.clone() {
        Some(razorpay) => {
            let key_id = razorpay.key_id.clone();
            let webhook_secret = razorpay.webhook_secret.clone();
            if webhook_secret.is_none() {
                tracing::warn!("⚠ RAZORPAY_WEBHOOK_SECRET not set - webhook disabled");
            }
            let client = RazorpayClient::new(razorpay)?;
            tracing::info!("✓ Razorpay configured");
            Some(Payments::new(store.clone(), Arc::new(client), key_id, webhook_secret))
        }
        None => {
            tracing::warn!("⚠ Razorpay not configured - payments disabled");
            tracing::warn!("  Set RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET in .env");
            None
        }
    };

    // Build application state
    let state = AppState::with_trigger(store, trigger, payments)?;
    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🔌 plugpass server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /                    - Landing page");
    tracing::info!("  GET  /health              - Health check");
    tracing::info!("  POST /check_subscription  - Subscription status");
    tracing::info!("  POST /activate_plug       - Switch the plug on");
    tracing::info!("  POST /create_order        - Price a plan");
    tracing::info!("  POST /handle_payment      - Confirm a checkout payment");
    tracing::info!("  POST /webhook/razorpay    - Razorpay webhook");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
