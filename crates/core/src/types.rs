//! Core data types for the phone verification service.
//!
//! These structs mirror the two persisted collections
//! (`verificationCodes`, `rateLimitAttempts`) and the small value types
//! shared between the service, the rate limiter, and storage adapters.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Why a code was issued. Informational only; validation logic never
/// branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodePurpose {
    Registration,
    Login,
    Resend,
}

impl CodePurpose {
    /// Returns the purpose as a stable string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::Registration => "registration",
            CodePurpose::Login => "login",
            CodePurpose::Resend => "resend",
        }
    }
}

/// Lifecycle status of a verification record.
///
/// Expiry is not a stored status; it is derived from `expires_at` at read
/// time. Both `Verified` and `Invalidated` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    /// Issued and matchable until it expires.
    Active,
    /// Successfully matched by a code entry.
    Verified,
    /// Superseded by a newer issuance; no longer matchable.
    Invalidated,
}

/// Optional provenance captured from the issuing request.
///
/// Stored for audit only; never consulted by matching logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    /// Client IP address, if known.
    pub ip_address: Option<String>,
    /// User agent string, if known.
    pub user_agent: Option<String>,
}

impl Provenance {
    /// Creates empty provenance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the IP address.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }
}

/// One issued verification code, as persisted in `verificationCodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    /// Store-generated identifier.
    pub id: String,
    /// Identity the code is bound to.
    pub user_id: String,
    /// E.164-formatted destination, for audit/display.
    pub phone_number: String,
    /// The 6-digit code.
    pub code: String,
    /// Why the code was issued.
    pub purpose: CodePurpose,
    /// Verification attempts made against this record.
    pub attempts: u32,
    /// Lifecycle status.
    pub status: CodeStatus,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record stops being matchable.
    pub expires_at: DateTime<Utc>,
    /// When the record left `Active` (verified or invalidated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    /// IP address of the issuing request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// User agent of the issuing request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl VerificationRecord {
    /// Checks if the record has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Checks if the record is still matchable at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == CodeStatus::Active && !self.is_expired(now)
    }

    /// Returns remaining verification attempts under `max_attempts`.
    pub fn remaining_attempts(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.attempts)
    }
}

/// The insert shape for a new verification record.
///
/// Everything except the store-generated `id`. `expires_at` is explicit so
/// the expiration window stays a caller concern.
#[derive(Debug, Clone)]
pub struct NewVerificationCode {
    pub user_id: String,
    pub phone_number: String,
    pub code: String,
    pub purpose: CodePurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub provenance: Provenance,
}

impl NewVerificationCode {
    /// Creates a new insert shape with empty provenance.
    pub fn new(
        user_id: impl Into<String>,
        phone_number: impl Into<String>,
        code: impl Into<String>,
        purpose: CodePurpose,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            phone_number: phone_number.into(),
            code: code.into(),
            purpose,
            created_at,
            expires_at,
            provenance: Provenance::default(),
        }
    }

    /// Attaches provenance from the issuing request.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Materializes the record with a store-assigned id.
    pub fn into_record(self, id: impl Into<String>) -> VerificationRecord {
        VerificationRecord {
            id: id.into(),
            user_id: self.user_id,
            phone_number: self.phone_number,
            code: self.code,
            purpose: self.purpose,
            attempts: 0,
            status: CodeStatus::Active,
            created_at: self.created_at,
            expires_at: self.expires_at,
            verified_at: None,
            ip_address: self.provenance.ip_address,
            user_agent: self.provenance.user_agent,
        }
    }
}

/// Issuance-throttling state for one user, as persisted in
/// `rateLimitAttempts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    /// Identity the window is tracked for.
    pub user_id: String,
    /// Issuances in the current window.
    pub attempts: u32,
    /// Timestamp of the most recent issuance.
    pub last_attempt: DateTime<Utc>,
    /// When the current window ends.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitRecord {
    /// Starts a fresh window with a single recorded issuance.
    pub fn fresh(user_id: impl Into<String>, now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            user_id: user_id.into(),
            attempts: 1,
            last_attempt: now,
            reset_at: now + window,
        }
    }

    /// Checks if the window is still open at `now`.
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        now <= self.reset_at
    }
}

/// Result of an issuance rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Issuance is allowed.
    Allowed {
        /// Remaining issuances in the current window.
        remaining: u32,
        /// When the current window resets.
        reset_at: DateTime<Utc>,
    },
    /// Issuance is blocked.
    Limited {
        /// When the block lifts.
        reset_at: DateTime<Utc>,
        /// How long to wait before retrying (in milliseconds).
        retry_after_ms: i64,
    },
}

impl RateLimitDecision {
    /// Returns true if issuance is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    /// Returns true if issuance is blocked.
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitDecision::Limited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(now: DateTime<Utc>) -> VerificationRecord {
        NewVerificationCode::new(
            "u1",
            "+5215555555555",
            "482913",
            CodePurpose::Registration,
            now,
            now + Duration::minutes(10),
        )
        .into_record("vc_1")
    }

    #[test]
    fn test_new_record_is_active() {
        let now = Utc::now();
        let rec = record(now);

        assert_eq!(rec.attempts, 0);
        assert_eq!(rec.status, CodeStatus::Active);
        assert!(rec.verified_at.is_none());
        assert!(rec.is_active(now));
        assert!(!rec.is_expired(now));
    }

    #[test]
    fn test_expiry_is_derived_from_timestamp() {
        let now = Utc::now();
        let rec = record(now);

        let later = now + Duration::minutes(11);
        assert!(rec.is_expired(later));
        assert!(!rec.is_active(later));
        // Status is untouched by the passage of time.
        assert_eq!(rec.status, CodeStatus::Active);
    }

    #[test]
    fn test_remaining_attempts_saturates() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.attempts = 5;

        assert_eq!(rec.remaining_attempts(3), 0);
        assert_eq!(rec.remaining_attempts(6), 1);
    }

    #[test]
    fn test_provenance_carried_into_record() {
        let now = Utc::now();
        let rec = NewVerificationCode::new(
            "u1",
            "+5215555555555",
            "123456",
            CodePurpose::Login,
            now,
            now + Duration::minutes(10),
        )
        .with_provenance(Provenance::new().with_ip("203.0.113.9").with_user_agent("test-agent"))
        .into_record("vc_2");

        assert_eq!(rec.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(rec.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn test_rate_limit_window() {
        let now = Utc::now();
        let rec = RateLimitRecord::fresh("u1", now, Duration::hours(1));

        assert_eq!(rec.attempts, 1);
        assert!(rec.in_window(now));
        assert!(!rec.in_window(now + Duration::hours(2)));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let now = Utc::now();
        let json = serde_json::to_value(record(now)).unwrap();

        assert!(json.get("userId").is_some());
        assert!(json.get("phoneNumber").is_some());
        assert!(json.get("expiresAt").is_some());
        assert!(json.get("verifiedAt").is_none());
    }
}
