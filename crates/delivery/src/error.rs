//! Error types for delivery channels.

use thiserror::Error;

/// Errors surfaced by delivery channels and the gateway.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The provider rejected the message.
    #[error("channel '{channel}' rejected the message: {message}")]
    Provider { channel: String, message: String },

    /// A channel is missing required configuration.
    #[error("channel '{channel}' is not configured: missing {missing}")]
    NotConfigured { channel: String, missing: String },

    /// The configured provider name is not recognized.
    #[error("unknown delivery provider '{provider}' (valid options: \"meta\", \"twilio\")")]
    UnknownProvider { provider: String },

    /// Every configured channel failed; `last` is the final channel's error.
    #[error("all {attempted} delivery channels failed; last error: {last}")]
    Exhausted { attempted: usize, last: String },

    /// The HTTP transport failed before the provider answered.
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DeliveryError {
    /// Creates a provider rejection error.
    pub fn provider(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Creates a missing-configuration error.
    pub fn not_configured(channel: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::NotConfigured {
            channel: channel.into(),
            missing: missing.into(),
        }
    }
}

/// A Result type alias using DeliveryError.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
