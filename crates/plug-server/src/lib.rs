//! plugpass HTTP server
//!
//! Axum router over the subscription, activation and payment services.

pub mod config;
pub mod handlers;
pub mod page;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    activate_plug, check_subscription, create_order_handler, handle_payment, health_check, home,
    razorpay_webhook,
};
pub use crate::state::{AppState, Payments};

/// Build the application router
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Page & info
        .route("/", get(home))
        .route("/health", get(health_check))

        // Subscriber API
        .route("/check_subscription", post(check_subscription))
        .route("/activate_plug", post(activate_plug))

        // Payments
        .route("/create_order", post(create_order_handler))
        .route("/handle_payment", post(handle_payment))
        .route("/webhook/razorpay", post(razorpay_webhook))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
