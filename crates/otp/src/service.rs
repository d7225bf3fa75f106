//! The OTP service: issuance and verification protocols.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use phone_verify_core::error::{OtpError, OtpResult};
use phone_verify_core::traits::{VerificationStore, MAX_BATCH_SIZE};
use phone_verify_core::types::{
    CodePurpose, NewVerificationCode, Provenance, RateLimitDecision, RateLimitRecord,
    VerificationRecord,
};
use phone_verify_delivery::DeliveryGateway;

use crate::config::OtpServiceConfig;
use crate::generator::CodeGenerator;
use crate::rate_limit::RateLimiter;
use crate::verification::VerifyOutcome;

/// Receipt for a freshly issued code.
///
/// Deliberately carries no code field: the code leaves the service only
/// through the delivery channel.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    /// Id of the persisted verification record.
    pub record_id: String,
    /// When the code stops being matchable.
    pub expires_at: DateTime<Utc>,
    /// Delivery channel that served the code.
    pub channel: &'static str,
}

/// Orchestrates code issuance, delivery, and verification against a
/// shared store.
///
/// The service holds no locks across store or delivery calls; all
/// serialization lives in the store's conditional writes, so multiple
/// instances may run concurrently behind a load balancer.
pub struct OtpService {
    store: Arc<dyn VerificationStore>,
    gateway: Arc<DeliveryGateway>,
    limiter: RateLimiter,
    generator: CodeGenerator,
    config: OtpServiceConfig,
}

impl OtpService {
    /// Creates a new service over the given store and delivery gateway.
    pub fn new(
        store: Arc<dyn VerificationStore>,
        gateway: Arc<DeliveryGateway>,
        config: OtpServiceConfig,
    ) -> Self {
        let limiter = RateLimiter::new(store.clone(), config.rate_limit.clone());
        Self {
            store,
            gateway,
            limiter,
            generator: CodeGenerator::new(),
            config,
        }
    }

    /// Gets the service configuration.
    pub fn config(&self) -> &OtpServiceConfig {
        &self.config
    }

    /// Issues a new verification code for `user_id` and delivers it to
    /// `phone_number`.
    ///
    /// Order matters: the rate-limit gate runs first (a blocked request
    /// generates nothing and invalidates nothing), then every
    /// outstanding code is superseded, then the new record is persisted
    /// and delivered. A delivery failure leaves the record in place so
    /// the caller can retry delivery or re-issue.
    pub async fn request_code(
        &self,
        user_id: &str,
        phone_number: &str,
        purpose: CodePurpose,
        provenance: Provenance,
    ) -> OtpResult<IssuedCode> {
        match self.limiter.check_and_record(user_id).await? {
            RateLimitDecision::Limited { reset_at, .. } => {
                return Err(OtpError::RateLimited { reset_at });
            }
            RateLimitDecision::Allowed { .. } => {}
        }

        let now = Utc::now();
        let superseded = self.invalidate_outstanding(user_id, now).await?;
        if superseded > 0 {
            tracing::debug!(user_id, superseded, "invalidated outstanding codes");
        }

        let code = self.generator.generate();
        let record = self
            .store
            .create_code(
                NewVerificationCode::new(
                    user_id,
                    phone_number,
                    &code,
                    purpose,
                    now,
                    now + self.config.expiration,
                )
                .with_provenance(provenance),
            )
            .await?;

        let receipt = match self
            .gateway
            .send_otp(phone_number, &code, self.config.expiration)
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                // The record must survive: it still holds a deliverable code.
                tracing::error!(
                    user_id,
                    record_id = %record.id,
                    error = %err,
                    "code delivery failed"
                );
                return Err(OtpError::delivery_failed(err.to_string()));
            }
        };

        tracing::info!(
            user_id,
            record_id = %record.id,
            purpose = purpose.as_str(),
            channel = receipt.channel,
            "verification code issued"
        );

        Ok(IssuedCode {
            record_id: record.id,
            expires_at: record.expires_at,
            channel: receipt.channel,
        })
    }

    /// Verifies a code entered by the user.
    ///
    /// A wrong code counts against the user's active record; once the
    /// record's budget is exhausted the counter is left untouched and
    /// even the correct code is rejected. `Err` is reserved for
    /// infrastructure failures.
    pub async fn verify_code(&self, user_id: &str, code: &str) -> OtpResult<VerifyOutcome> {
        let now = Utc::now();

        let Some(record) = self.store.find_active(user_id, code, now).await? else {
            // Wrong code: attribute the attempt to whatever active record
            // the user holds, if any.
            if let Some(active) = self.store.find_active_for_user(user_id, now).await? {
                self.store
                    .register_attempt(&active.id, self.config.max_attempts, now)
                    .await?;
            }
            tracing::debug!(user_id, "no active code matched");
            return Ok(VerifyOutcome::InvalidOrExpired);
        };

        // Evaluated against the pre-existing count.
        if record.attempts >= self.config.max_attempts {
            tracing::warn!(
                user_id,
                record_id = %record.id,
                attempts = record.attempts,
                "attempt budget exhausted"
            );
            return Ok(VerifyOutcome::TooManyAttempts);
        }

        // One conditional write: increment and verify together, or not at
        // all if a concurrent attempt got there first.
        if self
            .store
            .consume_code(&record.id, self.config.max_attempts, now)
            .await?
        {
            tracing::info!(user_id, record_id = %record.id, "code verified");
            Ok(VerifyOutcome::Verified)
        } else {
            Ok(VerifyOutcome::InvalidOrExpired)
        }
    }

    /// Returns the most recently created record for `user_id` regardless
    /// of status. Read-only; used for issuance cooldown display.
    pub async fn last_code(&self, user_id: &str) -> OtpResult<Option<VerificationRecord>> {
        self.store.find_latest(user_id).await
    }

    /// Deletes expired records in bounded batches until drained,
    /// returning the total deleted.
    ///
    /// Idempotent and safe to run concurrently with live traffic; it
    /// only touches records that are already past their expiry.
    pub async fn cleanup_expired(&self) -> OtpResult<usize> {
        let now = Utc::now();
        let mut total = 0;
        loop {
            let deleted = self.store.delete_expired_batch(now, MAX_BATCH_SIZE).await?;
            total += deleted;
            if deleted < MAX_BATCH_SIZE {
                break;
            }
        }
        if total > 0 {
            tracing::info!(deleted = total, "cleaned up expired verification codes");
        }
        Ok(total)
    }

    /// Reads the issuance window state for `user_id`.
    pub async fn rate_limit_state(&self, user_id: &str) -> OtpResult<Option<RateLimitRecord>> {
        self.limiter.state(user_id).await
    }

    /// Lifts an issuance block for `user_id`.
    ///
    /// Operator action, not part of the protocol.
    pub async fn reset_rate_limit(&self, user_id: &str) -> OtpResult<()> {
        self.limiter.reset(user_id).await
    }

    async fn invalidate_outstanding(&self, user_id: &str, now: DateTime<Utc>) -> OtpResult<usize> {
        let mut total = 0;
        loop {
            let invalidated = self
                .store
                .invalidate_batch(user_id, now, MAX_BATCH_SIZE)
                .await?;
            total += invalidated;
            if invalidated < MAX_BATCH_SIZE {
                break;
            }
        }
        Ok(total)
    }
}
