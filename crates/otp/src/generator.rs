//! Verification code generation.

use rand::Rng;

/// Lowest 6-digit code; drawing from here up keeps every code at exactly
/// six digits with no stripped leading zero.
const CODE_MIN: u32 = 100_000;
/// Highest 6-digit code (inclusive).
const CODE_MAX: u32 = 999_999;

/// Generates 6-digit numeric verification codes.
///
/// Codes are drawn uniformly from 100000..=999999 using the thread-local
/// CSPRNG.
#[derive(Debug, Clone, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    /// Creates a new code generator.
    pub fn new() -> Self {
        Self
    }

    /// Generates a new 6-digit code.
    pub fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        rng.gen_range(CODE_MIN..=CODE_MAX).to_string()
    }
}
