//! Verification outcomes.

use phone_verify_core::error::OtpError;

/// Result of a verification attempt.
///
/// Infrastructure failures travel separately as `OtpError`; this enum
/// only covers the user-facing answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The code matched and the record is now verified.
    Verified,
    /// No active record matched the user and code.
    InvalidOrExpired,
    /// The matching record has exhausted its attempt budget.
    TooManyAttempts,
}

impl VerifyOutcome {
    /// Returns true if verification succeeded.
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyOutcome::Verified)
    }

    /// Returns a stable error code for API responses.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            VerifyOutcome::Verified => None,
            VerifyOutcome::InvalidOrExpired => Some("INVALID_OR_EXPIRED"),
            VerifyOutcome::TooManyAttempts => Some("TOO_MANY_ATTEMPTS"),
        }
    }

    /// Returns a user-facing message for failed verifications.
    ///
    /// Deliberately does not reveal whether the user or phone number
    /// exists.
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            VerifyOutcome::Verified => None,
            VerifyOutcome::InvalidOrExpired => Some("Invalid or expired verification code"),
            VerifyOutcome::TooManyAttempts => {
                Some("Too many verification attempts. Request a new code")
            }
        }
    }
}

impl From<VerifyOutcome> for Result<(), OtpError> {
    fn from(outcome: VerifyOutcome) -> Self {
        match outcome {
            VerifyOutcome::Verified => Ok(()),
            VerifyOutcome::InvalidOrExpired => Err(OtpError::InvalidOrExpired),
            VerifyOutcome::TooManyAttempts => Err(OtpError::TooManyAttempts),
        }
    }
}
