//! HTTP Handlers

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Html,
};
use serde::{Deserialize, Serialize};

use plug_core::{ActivationOutcome, CoreError};
use plug_payments::{Order, PaymentError, Plan, WebhookHandler, create_order};

use crate::page;
use crate::state::{AppState, Payments};

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payments_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn core_error(e: &CoreError) -> ApiError {
    match e {
        CoreError::Trigger(_) | CoreError::Network(_) => {
            tracing::error!("Plug trigger error: {}", e);
            api_error(StatusCode::BAD_GATEWAY, "TRIGGER_ERROR", e.user_message())
        }
        _ => {
            tracing::error!("Storage error: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.user_message())
        }
    }
}

fn payment_error(e: &PaymentError) -> ApiError {
    let (status, code) = match e {
        PaymentError::UnknownPlan(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_PLAN"),
        PaymentError::NotVerified(_) => (StatusCode::PAYMENT_REQUIRED, "PAYMENT_NOT_VERIFIED"),
        PaymentError::Gateway(_) | PaymentError::Network(_) => {
            (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR")
        }
        PaymentError::WebhookSignature(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
        PaymentError::WebhookParse(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
        PaymentError::Config(_) | PaymentError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "PAYMENT_ERROR")
        }
    };

    if status.is_server_error() {
        tracing::error!("Payment error: {}", e);
    } else {
        tracing::warn!("Payment rejected: {}", e);
    }

    api_error(status, code, e.user_message())
}

fn payments(state: &AppState) -> Result<&Payments, ApiError> {
    state.payments.as_ref().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "PAYMENTS_DISABLED",
            "Payments not configured",
        )
    })
}

#[derive(Debug, Deserialize)]
pub struct PhoneForm {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderForm {
    pub plan: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub phone: String,
    pub plan: String,
    #[serde(alias = "payment_id")]
    pub razorpay_payment_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Landing page with the public Razorpay key
pub async fn home(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let key_id = state.payments.as_ref().map(|p| p.key_id.as_str());

    page::render_index(&state.templates, key_id)
        .map(Html)
        .map_err(|e| {
            tracing::error!("Template error: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TEMPLATE_ERROR",
                "Page unavailable",
            )
        })
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payments_configured: state.payments.is_some(),
    })
}

pub async fn check_subscription(
    State(state): State<AppState>,
    Form(form): Form<PhoneForm>,
) -> Result<Json<SubscriptionStatus>, ApiError> {
    let active = state
        .subscriptions
        .is_active(&form.phone)
        .await
        .map_err(|e| core_error(&e))?;

    Ok(Json(SubscriptionStatus { active }))
}

/// Switch the plug on; refusals are `{success: false, message}` with 200
pub async fn activate_plug(
    State(state): State<AppState>,
    Form(form): Form<PhoneForm>,
) -> Result<Json<ActivationOutcome>, ApiError> {
    let outcome = state
        .activation
        .activate(&form.phone)
        .await
        .map_err(|e| core_error(&e))?;

    Ok(Json(outcome))
}

/// Price lookup for the checkout widget; no side effects
pub async fn create_order_handler(Form(form): Form<OrderForm>) -> Result<Json<Order>, ApiError> {
    let plan: Plan = form.plan.parse().map_err(|e| payment_error(&e))?;
    Ok(Json(create_order(plan, form.phone)))
}

/// Checkout success callback
///
/// The payment id is confirmed with Razorpay before any time is granted.
pub async fn handle_payment(
    State(state): State<AppState>,
    Form(form): Form<PaymentForm>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payments = payments(&state)?;
    let plan: Plan = form.plan.parse().map_err(|e| payment_error(&e))?;

    payments
        .service
        .confirm(&form.phone, plan, &form.razorpay_payment_id)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(PaymentResponse { success: true }))
}

/// Razorpay webhook handler
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError> {
    let secret = payments(&state)?
        .webhook_secret
        .as_deref()
        .ok_or_else(|| {
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "WEBHOOK_DISABLED",
                "Webhook secret not configured",
            )
        })?;

    let signature = headers
        .get("x-razorpay-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                "MISSING_SIGNATURE",
                "Missing Razorpay signature",
            )
        })?;

    let handler = WebhookHandler::new(state.store.clone());

    let event = handler
        .parse_event(&body, signature, secret)
        .map_err(|e| payment_error(&e))?;

    handler.handle(event).await.map_err(|e| payment_error(&e))?;

    Ok(StatusCode::OK)
}
