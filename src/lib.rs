//! Recursive verifier circuit for WHIR-based Spartan proofs.
//!
//! This crate builds, as arithmetic constraints over the BN254 scalar field, a
//! verifier for a Spartan-style polynomial IOP whose commitments use the WHIR
//! multilinear polynomial commitment scheme. Given a proof configuration and a
//! Fiat-Shamir transcript, it replays every challenge, checks the outer
//! sum-check, the three Spark sparse-matrix arguments with their offline
//! memory-checks, and every WHIR opening (Merkle authentication, out-of-domain
//! consistency, STIR query folding, proof-of-work grinding, final-polynomial
//! evaluation). A satisfied circuit is the statement "this transcript is a
//! valid proof"; the surrounding Groth16 wrap is a collaborator concern.

pub mod circuit;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod fiat_shamir;
pub mod gpa;
pub mod merkle;
pub mod poly;
pub mod proof;
pub mod r1cs;
pub mod spark;
pub mod sumcheck;
pub mod verifier;
pub mod whir;

pub use errors::VerifierError;
pub use verifier::{verify, VerificationReport};
