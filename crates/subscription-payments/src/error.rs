//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Gateway could not be reached (DNS, connect, TLS, timeout)
    #[error("Gateway unreachable: {0}")]
    GatewayUnreachable(String),

    /// Gateway answered with a body we cannot interpret
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    /// Transaction reference cannot be sent to the gateway
    #[error("Invalid transaction reference: {0:?}")]
    InvalidReference(String),

    /// Persisting or loading a payment record failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::GatewayUnreachable(_) | Self::Storage(_))
    }

    /// Stable identifier used as a log field and API error code
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GatewayUnreachable(_) => "gateway_unreachable",
            Self::MalformedResponse(_) => "malformed_response",
            Self::InvalidReference(_) => "invalid_reference",
            Self::Storage(_) => "persistence",
            Self::Config(_) => "config",
        }
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::GatewayUnreachable(_) => "The payment provider is unavailable. Please try again.",
            Self::MalformedResponse(_) => "The payment provider returned an unexpected response.",
            Self::InvalidReference(_) => "The transaction reference is not valid.",
            Self::Storage(_) => "Your payment could not be recorded.",
            Self::Config(_) => "Service configuration error.",
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::GatewayUnreachable(err.to_string())
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for PaymentError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::migrate::MigrateError> for PaymentError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(err.to_string())
    }
}
