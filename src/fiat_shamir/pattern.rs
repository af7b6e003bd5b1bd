//! IO pattern: the Fiat-Shamir script.
//!
//! A pattern is an ordered list of labelled operations. `Absorb` ops carry
//! prover messages (scalars, or raw bytes for the `pow-nonce` label),
//! `Squeeze` ops document verifier challenges and carry no transcript bytes,
//! `Hint` ops carry out-of-band payloads that are parsed but never absorbed.
//!
//! The textual encoding joins operations with `\0`; each operation is a kind
//! letter (`A`, `S`, `H`), a decimal size, and the label.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::errors::FiatShamirError;

/// Label of the raw-byte absorb carrying a proof-of-work nonce.
pub const POW_NONCE_LABEL: &str = "pow-nonce";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Absorb,
    Squeeze,
    Hint,
}

impl OpKind {
    const fn letter(self) -> char {
        match self {
            Self::Absorb => 'A',
            Self::Squeeze => 'S',
            Self::Hint => 'H',
        }
    }
}

/// One operation of the Fiat-Shamir script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoOp {
    pub kind: OpKind,
    pub label: String,
    /// Scalar count for absorbs and squeezes (byte count for `pow-nonce`).
    /// Hints are length-prefixed in the transcript; their size field is zero.
    pub size: usize,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind.letter(), self.size, self.label)
    }
}

/// The full Fiat-Shamir script of one proof.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoPattern {
    pub ops: Vec<IoOp>,
}

impl IoPattern {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, size: usize, label: impl Into<String>) -> &mut Self {
        self.ops.push(IoOp {
            kind: OpKind::Absorb,
            label: label.into(),
            size,
        });
        self
    }

    pub fn squeeze(&mut self, size: usize, label: impl Into<String>) -> &mut Self {
        self.ops.push(IoOp {
            kind: OpKind::Squeeze,
            label: label.into(),
            size,
        });
        self
    }

    pub fn hint(&mut self, label: impl Into<String>) -> &mut Self {
        self.ops.push(IoOp {
            kind: OpKind::Hint,
            label: label.into(),
            size: 0,
        });
        self
    }

    /// Parse the textual encoding.
    pub fn parse(encoded: &[u8]) -> Result<Self, FiatShamirError> {
        let text = core::str::from_utf8(encoded)
            .map_err(|_| FiatShamirError::InvalidPattern("not valid UTF-8".into()))?;
        let mut ops = Vec::new();
        for part in text.split('\0').filter(|p| !p.is_empty()) {
            ops.push(Self::parse_op(part)?);
        }
        Ok(Self { ops })
    }

    fn parse_op(part: &str) -> Result<IoOp, FiatShamirError> {
        let mut chars = part.chars();
        let kind = match chars.next() {
            Some('A') => OpKind::Absorb,
            Some('S') => OpKind::Squeeze,
            Some('H') => OpKind::Hint,
            other => {
                return Err(FiatShamirError::InvalidPattern(format!(
                    "unknown op kind {other:?} in {part:?}"
                )))
            }
        };
        let rest = chars.as_str();
        let digits_end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(rest.len(), |(i, _)| i);
        if digits_end == 0 {
            return Err(FiatShamirError::InvalidPattern(format!(
                "missing size in {part:?}"
            )));
        }
        let size: usize = rest[..digits_end]
            .parse()
            .map_err(|_| FiatShamirError::InvalidPattern(format!("bad size in {part:?}")))?;
        Ok(IoOp {
            kind,
            label: rest[digits_end..].to_string(),
            size,
        })
    }

    /// The textual encoding, also the sponge's domain separator.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                out.push('\0');
            }
            out.push_str(&op.to_string());
        }
        out.into_bytes()
    }

    /// The absorb subsequence, in order; what the in-circuit replayer follows.
    #[must_use]
    pub fn absorb_ops(&self) -> Vec<IoOp> {
        self.ops
            .iter()
            .filter(|op| op.kind == OpKind::Absorb)
            .cloned()
            .collect()
    }
}
