//! Configuration for the OTP service.

use std::str::FromStr;

use chrono::Duration;
use phone_verify_core::error::{OtpError, OtpResult};

use crate::rate_limit::RateLimitConfig;

/// Parses an optional environment variable, failing on malformed values.
pub(crate) fn env_parse<T: FromStr>(key: &str) -> OtpResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| OtpError::config(format!("invalid value for {key}: {raw}"))),
        Err(_) => Ok(None),
    }
}

/// Configuration for the OTP service.
#[derive(Debug, Clone)]
pub struct OtpServiceConfig {
    /// Verification record lifetime. Default: 10 minutes.
    pub expiration: Duration,
    /// Per-record verification attempt ceiling. Default: 3.
    pub max_attempts: u32,
    /// Issuance throttling policy.
    pub rate_limit: RateLimitConfig,
}

impl Default for OtpServiceConfig {
    fn default() -> Self {
        Self {
            expiration: Duration::minutes(10),
            max_attempts: 3,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl OtpServiceConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the verification record lifetime.
    pub fn expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Sets the attempt ceiling.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the rate limit policy.
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Overlays `OTP_EXPIRATION_MINUTES`, `OTP_MAX_ATTEMPTS`, and the
    /// rate-limit variables onto the defaults.
    pub fn from_env() -> OtpResult<Self> {
        let mut config = Self::default();
        if let Some(minutes) = env_parse::<i64>("OTP_EXPIRATION_MINUTES")? {
            config.expiration = Duration::minutes(minutes);
        }
        if let Some(max) = env_parse::<u32>("OTP_MAX_ATTEMPTS")? {
            config.max_attempts = max;
        }
        config.rate_limit = RateLimitConfig::from_env()?;
        Ok(config)
    }
}
