//! Fiat-Shamir transcript handling.
//!
//! The transcript is processed in two stages:
//!
//! 1. Out of circuit, [`splitter::split_transcript`] walks the IO pattern over
//!    the raw bytes, collecting absorbed bytes into the truncated buffer that
//!    becomes the circuit's public input, and parsing hint payloads into typed
//!    pools.
//! 2. In circuit, [`reader::Arthur`] replays the truncated buffer against the
//!    same pattern, interleaving absorbs and squeezes in exactly the order the
//!    prover performed them.

pub mod errors;
pub mod pattern;
pub mod reader;
pub mod splitter;

pub use pattern::{IoOp, IoPattern, OpKind};
pub use reader::Arthur;
