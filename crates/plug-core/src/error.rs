//! Error Types

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored data violates an invariant (e.g. missing plug lock row)
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    /// Plug trigger API returned an error status
    #[error("Plug trigger failed: {0}")]
    Trigger(String),

    /// Network error talking to the plug trigger API
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Trigger(_) | Self::Network(_))
    }

    /// Convert to a user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Trigger(_) | Self::Network(_) => {
                "The smart plug could not be reached. Please try again."
            }
            Self::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}
