//! Main error types for the recursive verifier.

use thiserror::Error;

use crate::{
    circuit::UnsatisfiedConstraint, config::ConfigError, fiat_shamir::errors::FiatShamirError,
    proof::HintError,
};

/// Top-level error type for a verification run.
///
/// Every variant is fatal; the verifier returns immediately without partial
/// state. Failed in-circuit equalities are collected during circuit
/// construction and surface once, as [`VerifierError::ConstraintUnsatisfied`].
#[derive(Error, Debug)]
pub enum VerifierError {
    /// Transcript replay failed: underflow or a non-canonical scalar.
    #[error(transparent)]
    FiatShamir(#[from] FiatShamirError),

    /// A hint payload in the transcript is malformed.
    #[error(transparent)]
    Hint(#[from] HintError),

    /// The configuration disagrees with the parsed proof in arity or shape.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// One or more in-circuit equality assertions failed.
    ///
    /// A prover holding this witness could not produce a Groth16 proof;
    /// soundness violations surface the same way.
    #[error("constraint system unsatisfied: {} failed assertion(s), first: {}", .0.len(), .0[0])]
    ConstraintUnsatisfied(Vec<UnsatisfiedConstraint>),
}
