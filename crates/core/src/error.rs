//! Error types for the phone verification service.
//!
//! This module defines the `OtpError` enum which represents all possible
//! errors that can occur while issuing, delivering, or verifying codes.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The main error type for verification operations.
///
/// Every failure carries enough structure (a kind, not just a string) to
/// drive user-facing messaging and operational alerting. The service never
/// retries internally; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum OtpError {
    // ==================== Issuance Errors ====================
    /// Issuance blocked by the anti-abuse window.
    ///
    /// Recoverable by waiting until `reset_at`.
    #[error("Too many codes requested. Try again after {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Every configured delivery channel failed.
    ///
    /// The persisted record remains valid; the caller may re-issue or
    /// retry delivery.
    #[error("Code delivery failed: {message}")]
    DeliveryFailed { message: String },

    // ==================== Verification Errors ====================
    /// No active record matched the user and code.
    #[error("Invalid or expired verification code")]
    InvalidOrExpired,

    /// The matching record has exhausted its attempt budget.
    ///
    /// Recoverable only via a fresh issuance.
    #[error("Too many verification attempts. Request a new code")]
    TooManyAttempts,

    // ==================== Infrastructure Errors ====================
    /// A persistence operation failed for infrastructural reasons.
    ///
    /// Always fatal for the current call, never silently swallowed.
    #[error("Verification store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// The service configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl OtpError {
    /// Creates a new store unavailability error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new delivery failure error.
    pub fn delivery_failed(message: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns a stable error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::DeliveryFailed { .. } => "DELIVERY_FAILED",
            Self::InvalidOrExpired => "INVALID_OR_EXPIRED",
            Self::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }

    /// Returns true if this is a user-facing error (vs infrastructural).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::InvalidOrExpired | Self::TooManyAttempts
        )
    }

    /// Returns an HTTP status code appropriate for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::InvalidOrExpired | Self::TooManyAttempts => 400,
            Self::DeliveryFailed { .. } => 502,
            Self::StoreUnavailable { .. } | Self::Configuration { .. } => 500,
        }
    }
}

/// A Result type alias using OtpError.
pub type OtpResult<T> = Result<T, OtpError>;

impl From<serde_json::Error> for OtpError {
    fn from(err: serde_json::Error) -> Self {
        Self::StoreUnavailable {
            message: err.to_string(),
        }
    }
}
