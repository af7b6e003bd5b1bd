//! WHIR opening verification.
//!
//! [`parameters`] derives per-invocation runtime parameters from the JSON
//! configuration; [`verifier`] runs the round-by-round opening check.

pub mod parameters;
pub mod verifier;

pub use parameters::WhirParams;
pub use verifier::{read_commitment, run_whir, EvaluationClaims, WhirCommitment};
