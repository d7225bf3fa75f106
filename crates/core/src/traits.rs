//! Storage trait for the phone verification service.
//!
//! Adapters implement `VerificationStore` to persist verification codes
//! and rate-limit state. The trait is shaped around the primitives a
//! document store provides: create-with-generated-id, equality queries
//! with ordering and a limit, per-document conditional writes, and
//! bounded atomic batches.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::OtpResult;
use crate::types::{NewVerificationCode, RateLimitDecision, RateLimitRecord, VerificationRecord};

/// Maximum number of documents one atomic batch write may touch.
///
/// Bulk invalidation and cleanup must page in batches of at most this
/// size rather than assume any collection stays under the bound.
pub const MAX_BATCH_SIZE: usize = 500;

/// Trait for verification storage backends.
///
/// All mutations to a given record go through a conditional write keyed
/// by the record's current state, never a blind overwrite; multiple
/// service instances may run concurrently behind a load balancer, so
/// serialization lives here rather than in in-process locks. Operations
/// take `now` explicitly so expiry and window arithmetic stays testable.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    // ==================== Verification Code Operations ====================

    /// Persists a new verification record, returning it with a
    /// store-generated id.
    async fn create_code(&self, code: NewVerificationCode) -> OtpResult<VerificationRecord>;

    /// Finds the most recent active record matching `user_id` and `code`
    /// (exact string equality, no normalization).
    ///
    /// A record is active when its status is `Active` and
    /// `expires_at > now`. If several match, the one with the latest
    /// `expires_at` wins.
    async fn find_active(
        &self,
        user_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> OtpResult<Option<VerificationRecord>>;

    /// Finds the user's most recent active record regardless of code.
    ///
    /// Used to attribute failed verification attempts. Same tie-break as
    /// `find_active`.
    async fn find_active_for_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> OtpResult<Option<VerificationRecord>>;

    /// Returns the most recently created record for `user_id` regardless
    /// of status, ordered by `created_at` descending.
    async fn find_latest(&self, user_id: &str) -> OtpResult<Option<VerificationRecord>>;

    /// Atomically increments `attempts` without verifying the record.
    ///
    /// Applies only while the record is `Active`, unexpired at `now`, and
    /// `attempts < max_attempts`; returns whether the increment applied.
    async fn register_attempt(
        &self,
        id: &str,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> OtpResult<bool>;

    /// Atomically increments `attempts` and marks the record verified.
    ///
    /// The write applies only if the record is still `Active`, unexpired
    /// at `now`, and `attempts < max_attempts`; returns `false` when the
    /// precondition no longer holds (e.g. a concurrent attempt won).
    async fn consume_code(
        &self,
        id: &str,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> OtpResult<bool>;

    /// Marks up to `limit` of the user's `Active` records `Invalidated`
    /// in one atomic batch, stamping `verified_at` with `now`.
    ///
    /// Returns the number of records invalidated by this batch.
    async fn invalidate_batch(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> OtpResult<usize>;

    /// Deletes up to `limit` records with `expires_at < now` in one
    /// atomic batch, returning the number deleted.
    async fn delete_expired_batch(&self, now: DateTime<Utc>, limit: usize) -> OtpResult<usize>;

    // ==================== Rate Limit Operations ====================

    /// Atomically checks and records one issuance for `user_id`.
    ///
    /// Absent record or `now > reset_at`: start a fresh window with
    /// `attempts = 1`. Under `max`: increment. At or over `max`: reject
    /// without touching the record, so an administrative delete cleanly
    /// unblocks the user.
    async fn record_issuance(
        &self,
        user_id: &str,
        max: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> OtpResult<RateLimitDecision>;

    /// Reads the current rate-limit state for `user_id`.
    async fn rate_limit_state(&self, user_id: &str) -> OtpResult<Option<RateLimitRecord>>;

    /// Deletes the rate-limit record for `user_id`, lifting any block.
    ///
    /// Operational escape hatch, not part of the issuance protocol.
    async fn clear_rate_limit(&self, user_id: &str) -> OtpResult<()>;
}
