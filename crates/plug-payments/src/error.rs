//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Plan name not in the price table
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    /// Razorpay API error
    #[error("Razorpay error: {0}")]
    Gateway(String),

    /// The gateway does not confirm a matching payment
    #[error("Payment not verified: {0}")]
    NotVerified(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error talking to the gateway
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] plug_core::CoreError),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway(_) | Self::Network(_) | Self::Storage(_)
        )
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::UnknownPlan(_) => "Unknown plan. Choose daily, weekly or monthly.",
            Self::Gateway(_) | Self::Network(_) => {
                "Payment gateway unavailable. Please try again."
            }
            Self::NotVerified(_) => "We could not confirm this payment.",
            Self::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}
