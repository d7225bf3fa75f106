//! # Phone Verify Memory Adapter
//!
//! An in-memory storage adapter for the phone verification service,
//! primarily intended for testing and development purposes.
//!
//! Conditional operations re-check their precondition under the write
//! lock, which gives them the same atomicity a document store's
//! conditional writes provide. Data is lost when the process exits.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use phone_verify_core::error::OtpResult;
use phone_verify_core::traits::VerificationStore;
use phone_verify_core::types::{
    CodeStatus, NewVerificationCode, RateLimitDecision, RateLimitRecord, VerificationRecord,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage for a single entity type.
type Store<T> = Arc<RwLock<HashMap<String, T>>>;

/// In-memory verification store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    codes: Store<VerificationRecord>,
    rate_limits: Store<RateLimitRecord>,
}

impl MemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all stored data.
    pub async fn clear(&self) {
        self.codes.write().await.clear();
        self.rate_limits.write().await.clear();
    }

    /// Returns the number of verification records stored.
    pub async fn code_count(&self) -> usize {
        self.codes.read().await.len()
    }

    /// Returns the number of rate-limit records stored.
    pub async fn rate_limit_count(&self) -> usize {
        self.rate_limits.read().await.len()
    }

    /// Reads one verification record by id.
    pub async fn get_code(&self, id: &str) -> Option<VerificationRecord> {
        self.codes.read().await.get(id).cloned()
    }

    /// Overwrites a rate-limit record wholesale.
    ///
    /// Intended for seeding window states in tests.
    pub async fn put_rate_limit(&self, record: RateLimitRecord) {
        self.rate_limits
            .write()
            .await
            .insert(record.user_id.clone(), record);
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    // ==================== Verification Code Operations ====================

    async fn create_code(&self, code: NewVerificationCode) -> OtpResult<VerificationRecord> {
        let record = code.into_record(uuid::Uuid::new_v4().to_string());
        let mut codes = self.codes.write().await;
        codes.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_active(
        &self,
        user_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> OtpResult<Option<VerificationRecord>> {
        let codes = self.codes.read().await;
        Ok(codes
            .values()
            .filter(|r| r.user_id == user_id && r.code == code && r.is_active(now))
            .max_by_key(|r| r.expires_at)
            .cloned())
    }

    async fn find_active_for_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> OtpResult<Option<VerificationRecord>> {
        let codes = self.codes.read().await;
        Ok(codes
            .values()
            .filter(|r| r.user_id == user_id && r.is_active(now))
            .max_by_key(|r| r.expires_at)
            .cloned())
    }

    async fn find_latest(&self, user_id: &str) -> OtpResult<Option<VerificationRecord>> {
        let codes = self.codes.read().await;
        Ok(codes
            .values()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn consume_code(
        &self,
        id: &str,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> OtpResult<bool> {
        let mut codes = self.codes.write().await;

        let Some(record) = codes.get_mut(id) else {
            return Ok(false);
        };

        if !record.is_active(now) || record.attempts >= max_attempts {
            return Ok(false);
        }

        record.attempts += 1;
        record.status = CodeStatus::Verified;
        record.verified_at = Some(now);
        Ok(true)
    }

    async fn register_attempt(
        &self,
        id: &str,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> OtpResult<bool> {
        let mut codes = self.codes.write().await;

        let Some(record) = codes.get_mut(id) else {
            return Ok(false);
        };

        if !record.is_active(now) || record.attempts >= max_attempts {
            return Ok(false);
        }

        record.attempts += 1;
        Ok(true)
    }

    async fn invalidate_batch(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> OtpResult<usize> {
        let mut codes = self.codes.write().await;

        let mut invalidated = 0;
        for record in codes.values_mut() {
            if invalidated == limit {
                break;
            }
            if record.user_id == user_id && record.status == CodeStatus::Active {
                record.status = CodeStatus::Invalidated;
                record.verified_at = Some(now);
                invalidated += 1;
            }
        }
        Ok(invalidated)
    }

    async fn delete_expired_batch(&self, now: DateTime<Utc>, limit: usize) -> OtpResult<usize> {
        let mut codes = self.codes.write().await;

        let expired: Vec<String> = codes
            .values()
            .filter(|r| r.expires_at < now)
            .take(limit)
            .map(|r| r.id.clone())
            .collect();

        for id in &expired {
            codes.remove(id);
        }
        Ok(expired.len())
    }

    // ==================== Rate Limit Operations ====================

    async fn record_issuance(
        &self,
        user_id: &str,
        max: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> OtpResult<RateLimitDecision> {
        let mut limits = self.rate_limits.write().await;

        match limits.get_mut(user_id) {
            Some(record) if record.in_window(now) => {
                if record.attempts >= max {
                    let retry_after = (record.reset_at - now).num_milliseconds();
                    Ok(RateLimitDecision::Limited {
                        reset_at: record.reset_at,
                        retry_after_ms: retry_after.max(0),
                    })
                } else {
                    record.attempts += 1;
                    record.last_attempt = now;
                    Ok(RateLimitDecision::Allowed {
                        remaining: max.saturating_sub(record.attempts),
                        reset_at: record.reset_at,
                    })
                }
            }
            _ => {
                let record = RateLimitRecord::fresh(user_id, now, window);
                let reset_at = record.reset_at;
                limits.insert(user_id.to_string(), record);
                Ok(RateLimitDecision::Allowed {
                    remaining: max.saturating_sub(1),
                    reset_at,
                })
            }
        }
    }

    async fn rate_limit_state(&self, user_id: &str) -> OtpResult<Option<RateLimitRecord>> {
        let limits = self.rate_limits.read().await;
        Ok(limits.get(user_id).cloned())
    }

    async fn clear_rate_limit(&self, user_id: &str) -> OtpResult<()> {
        let mut limits = self.rate_limits.write().await;
        limits.remove(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phone_verify_core::types::CodePurpose;

    fn new_code(user_id: &str, code: &str, now: DateTime<Utc>) -> NewVerificationCode {
        NewVerificationCode::new(
            user_id,
            "+5215555555555",
            code,
            CodePurpose::Registration,
            now,
            now + Duration::minutes(10),
        )
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let record = store.create_code(new_code("u1", "111111", now)).await.unwrap();
        assert!(!record.id.is_empty());
        assert_eq!(store.code_count().await, 1);
    }

    #[tokio::test]
    async fn test_find_active_requires_exact_code() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.create_code(new_code("u1", "111111", now)).await.unwrap();

        assert!(store.find_active("u1", "111111", now).await.unwrap().is_some());
        assert!(store.find_active("u1", "222222", now).await.unwrap().is_none());
        assert!(store.find_active("u2", "111111", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_active_prefers_latest_expiry() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut early = new_code("u1", "111111", now);
        early.expires_at = now + Duration::minutes(5);
        store.create_code(early).await.unwrap();
        let late = store.create_code(new_code("u1", "111111", now)).await.unwrap();

        let found = store.find_active("u1", "111111", now).await.unwrap().unwrap();
        assert_eq!(found.id, late.id);
    }

    #[tokio::test]
    async fn test_consume_is_one_way() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = store.create_code(new_code("u1", "111111", now)).await.unwrap();

        assert!(store.consume_code(&record.id, 3, now).await.unwrap());
        let stored = store.get_code(&record.id).await.unwrap();
        assert_eq!(stored.status, CodeStatus::Verified);
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.verified_at, Some(now));

        // Already verified: the precondition fails and nothing changes.
        assert!(!store.consume_code(&record.id, 3, now).await.unwrap());
        assert_eq!(store.get_code(&record.id).await.unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_register_attempt_stops_at_ceiling() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = store.create_code(new_code("u1", "111111", now)).await.unwrap();

        assert!(store.register_attempt(&record.id, 2, now).await.unwrap());
        assert!(store.register_attempt(&record.id, 2, now).await.unwrap());
        assert!(!store.register_attempt(&record.id, 2, now).await.unwrap());

        let stored = store.get_code(&record.id).await.unwrap();
        assert_eq!(stored.attempts, 2);
        // Counting attempts does not verify the record.
        assert_eq!(stored.status, CodeStatus::Active);
    }

    #[tokio::test]
    async fn test_find_active_for_user_ignores_code() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = store.create_code(new_code("u1", "111111", now)).await.unwrap();

        let found = store.find_active_for_user("u1", now).await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert!(store.find_active_for_user("u2", now).await.unwrap().is_none());

        store.consume_code(&record.id, 3, now).await.unwrap();
        assert!(store.find_active_for_user("u1", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consume_respects_attempt_ceiling() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = store.create_code(new_code("u1", "111111", now)).await.unwrap();

        assert!(!store.consume_code(&record.id, 0, now).await.unwrap());
        assert_eq!(store.get_code(&record.id).await.unwrap().status, CodeStatus::Active);
    }

    #[tokio::test]
    async fn test_consume_rejects_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut code = new_code("u1", "111111", now);
        code.expires_at = now - Duration::minutes(1);
        let record = store.create_code(code).await.unwrap();

        assert!(!store.consume_code(&record.id, 3, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_batch_honors_limit() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..3 {
            store
                .create_code(new_code("u1", &format!("11111{i}"), now))
                .await
                .unwrap();
        }

        assert_eq!(store.invalidate_batch("u1", now, 2).await.unwrap(), 2);
        assert_eq!(store.invalidate_batch("u1", now, 2).await.unwrap(), 1);
        assert_eq!(store.invalidate_batch("u1", now, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_expired_batch() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut expired = new_code("u1", "111111", now);
        expired.expires_at = now - Duration::minutes(1);
        store.create_code(expired).await.unwrap();
        store.create_code(new_code("u1", "222222", now)).await.unwrap();

        assert_eq!(store.delete_expired_batch(now, 500).await.unwrap(), 1);
        assert_eq!(store.delete_expired_batch(now, 500).await.unwrap(), 0);
        assert_eq!(store.code_count().await, 1);
    }

    #[tokio::test]
    async fn test_record_issuance_window() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let window = Duration::hours(1);

        for remaining in [2, 1, 0] {
            let decision = store.record_issuance("u1", 3, window, now).await.unwrap();
            assert_eq!(
                decision,
                RateLimitDecision::Allowed {
                    remaining,
                    reset_at: now + window,
                }
            );
        }

        let blocked = store.record_issuance("u1", 3, window, now).await.unwrap();
        assert!(blocked.is_limited());
        // The blocked call leaves the record untouched.
        assert_eq!(store.rate_limit_state("u1").await.unwrap().unwrap().attempts, 3);
    }

    #[tokio::test]
    async fn test_record_issuance_resets_after_window() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let window = Duration::hours(1);

        for _ in 0..3 {
            store.record_issuance("u1", 3, window, now).await.unwrap();
        }
        assert!(store.record_issuance("u1", 3, window, now).await.unwrap().is_limited());

        let later = now + Duration::hours(2);
        let decision = store.record_issuance("u1", 3, window, later).await.unwrap();
        assert!(decision.is_allowed());
        assert_eq!(store.rate_limit_state("u1").await.unwrap().unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_clear_rate_limit_unblocks() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let window = Duration::hours(1);

        store.record_issuance("u1", 1, window, now).await.unwrap();
        assert!(store.record_issuance("u1", 1, window, now).await.unwrap().is_limited());

        store.clear_rate_limit("u1").await.unwrap();
        assert!(store.record_issuance("u1", 1, window, now).await.unwrap().is_allowed());
    }
}
