//! # Phone Verify OTP
//!
//! Issuance and verification of short-lived phone verification codes:
//! cryptographically strong 6-digit generation, per-identity issuance
//! rate limiting, delivery with channel fallback, and conditional-write
//! verification against a shared store.

mod config;
mod generator;
mod rate_limit;
mod service;
mod verification;

pub use config::OtpServiceConfig;
pub use generator::CodeGenerator;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use service::{IssuedCode, OtpService};
pub use verification::VerifyOutcome;
