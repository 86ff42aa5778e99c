//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Request rejected before reaching Stripe
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Email provider error
    #[error("Email error: {0}")]
    Email(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] poster_store::StoreError),
}

impl PaymentError {
    /// Whether the caller sent something unusable (as opposed to an upstream failure)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::WebhookSignature(_) | Self::WebhookParse(_) | Self::InvalidRequest(_)
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            Self::Stripe(_) => "Payment processing failed. Please try again.",
            Self::WebhookSignature(_) => "Invalid signature",
            Self::WebhookParse(_) => "Invalid webhook payload",
            Self::InvalidRequest(_) => "Invalid request",
            Self::Email(_) => "Failed to send email",
            Self::Config(_) => "Service configuration error.",
            Self::Storage(_) => "Database error",
        }
    }
}
