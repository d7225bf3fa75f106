//! # Phone Verify Core
//!
//! This crate provides the foundational types and traits for the phone
//! verification service. It defines the persisted record shapes
//! (`VerificationRecord`, `RateLimitRecord`), the error taxonomy, and the
//! storage trait adapters must implement.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{OtpError, OtpResult};
pub use traits::{VerificationStore, MAX_BATCH_SIZE};
pub use types::{
    CodePurpose, CodeStatus, NewVerificationCode, Provenance, RateLimitDecision, RateLimitRecord,
    VerificationRecord,
};
