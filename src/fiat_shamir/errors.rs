//! Fiat-Shamir transcript errors.

use thiserror::Error;

/// Failure modes of transcript parsing and replay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FiatShamirError {
    /// An absorb or hint would read past the end of the transcript.
    #[error("transcript underflow: needed {needed} byte(s), {available} available")]
    TranscriptUnderflow { needed: usize, available: usize },

    /// An absorbed scalar is not a canonical field element (>= p).
    #[error("non-canonical field element at transcript offset {offset}")]
    NonCanonicalScalar { offset: usize },

    /// The IO pattern string could not be parsed.
    #[error("invalid IO pattern: {0}")]
    InvalidPattern(String),

    /// The verifier's reads diverge from the IO pattern.
    #[error("IO pattern mismatch: expected {expected}, found {found}")]
    PatternMismatch { expected: String, found: String },
}
