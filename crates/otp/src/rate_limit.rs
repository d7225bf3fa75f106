//! Issuance rate limiting.

use std::sync::Arc;

use chrono::{Duration, Utc};
use phone_verify_core::error::OtpResult;
use phone_verify_core::traits::VerificationStore;
use phone_verify_core::types::{RateLimitDecision, RateLimitRecord};

use crate::config::env_parse;

/// Configuration for issuance rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum issuances allowed within the window.
    pub max_issuances: u32,
    /// Window duration.
    pub window: Duration,
    /// Whether rate limiting is enabled.
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_issuances: 5,
            window: Duration::hours(24),
            enabled: true,
        }
    }
}

impl RateLimitConfig {
    /// Creates a new rate limit config.
    pub fn new(max_issuances: u32, window: Duration) -> Self {
        Self {
            max_issuances,
            window,
            enabled: true,
        }
    }

    /// Disables rate limiting (development only).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Overlays `RATE_LIMIT_MAX_ISSUANCES` and
    /// `RATE_LIMIT_WINDOW_MINUTES` onto the defaults.
    pub fn from_env() -> OtpResult<Self> {
        let mut config = Self::default();
        if let Some(max) = env_parse::<u32>("RATE_LIMIT_MAX_ISSUANCES")? {
            config.max_issuances = max;
        }
        if let Some(minutes) = env_parse::<i64>("RATE_LIMIT_WINDOW_MINUTES")? {
            config.window = Duration::minutes(minutes);
        }
        Ok(config)
    }
}

/// Tracks issuance attempts per user identity inside a rolling window.
///
/// The check-and-record itself is a single conditional write in the
/// store, so concurrent issuance requests for the same user never
/// under-count; this type only carries the policy.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn VerificationStore>,
}

impl RateLimiter {
    /// Creates a new rate limiter over the given store.
    pub fn new(store: Arc<dyn VerificationStore>, config: RateLimitConfig) -> Self {
        Self { config, store }
    }

    /// Gets the limiter configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Checks whether `user_id` may be issued a code now, recording the
    /// issuance when allowed.
    pub async fn check_and_record(&self, user_id: &str) -> OtpResult<RateLimitDecision> {
        let now = Utc::now();

        if !self.config.enabled {
            return Ok(RateLimitDecision::Allowed {
                remaining: u32::MAX,
                reset_at: now + self.config.window,
            });
        }

        let decision = self
            .store
            .record_issuance(user_id, self.config.max_issuances, self.config.window, now)
            .await?;

        if let RateLimitDecision::Limited { reset_at, .. } = &decision {
            tracing::warn!(user_id, %reset_at, "issuance blocked by rate limit");
        }
        Ok(decision)
    }

    /// Reads the current window state for `user_id`.
    pub async fn state(&self, user_id: &str) -> OtpResult<Option<RateLimitRecord>> {
        self.store.rate_limit_state(user_id).await
    }

    /// Lifts any block for `user_id` by deleting the window record.
    pub async fn reset(&self, user_id: &str) -> OtpResult<()> {
        self.store.clear_rate_limit(user_id).await?;
        tracing::info!(user_id, "rate limit manually reset");
        Ok(())
    }
}
