//! In-circuit transcript replay.
//!
//! [`Arthur`] owns the sponge and the truncated absorb stream. Prover messages
//! are parsed from the stream, absorbed, and returned as wires; challenges are
//! squeezed. The interleaving follows the IO pattern exactly: every read
//! consumes the next absorb operation and must match its declared shape.

use ark_bn254::Fr;
use ark_serialize::CanonicalDeserialize;

use super::{
    errors::FiatShamirError,
    pattern::{IoOp, IoPattern, POW_NONCE_LABEL},
    splitter::SCALAR_BYTES,
};
use crate::{
    circuit::Builder,
    crypto::sponge::CircuitSponge,
};

/// The transcript replayer: the verifier of the Fiat-Shamir metaphor.
#[derive(Debug)]
pub struct Arthur<S> {
    sponge: S,
    absorb_ops: Vec<IoOp>,
    next_op: usize,
    stream: Vec<u8>,
    pos: usize,
}

impl<S> Arthur<S> {
    /// Replayer over a truncated absorb stream, following `pattern`.
    pub fn new(pattern: &IoPattern, absorb_stream: Vec<u8>, sponge: S) -> Self {
        Self {
            sponge,
            absorb_ops: pattern.absorb_ops(),
            next_op: 0,
            stream: absorb_stream,
            pos: 0,
        }
    }

    /// Bytes of the absorb stream not yet replayed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stream.len() - self.pos
    }

    fn next_absorb_op(&mut self, want_scalars: usize, want_nonce: bool) -> Result<(), FiatShamirError> {
        let op = self.absorb_ops.get(self.next_op).ok_or_else(|| {
            FiatShamirError::PatternMismatch {
                expected: format!("absorb of {want_scalars} element(s)"),
                found: "end of pattern".into(),
            }
        })?;
        let is_nonce = op.label == POW_NONCE_LABEL;
        if op.size != want_scalars || is_nonce != want_nonce {
            return Err(FiatShamirError::PatternMismatch {
                expected: format!(
                    "absorb of {want_scalars} {}",
                    if want_nonce { "nonce byte(s)" } else { "scalar(s)" }
                ),
                found: op.to_string(),
            });
        }
        self.next_op += 1;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&[u8], FiatShamirError> {
        let available = self.remaining();
        if n > available {
            return Err(FiatShamirError::TranscriptUnderflow {
                needed: n,
                available,
            });
        }
        let out = &self.stream[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read `n` scalars from the transcript, absorb them, return them as
    /// wires. Rejects non-canonical encodings.
    pub fn fill_next_scalars<B: Builder>(
        &mut self,
        b: &mut B,
        n: usize,
    ) -> Result<Vec<B::Var>, FiatShamirError>
    where
        S: CircuitSponge<B>,
    {
        if n == 0 {
            return Ok(Vec::new());
        }
        self.next_absorb_op(n, false)?;
        let start = self.pos;
        let bytes = self.take(n * SCALAR_BYTES)?.to_vec();
        let mut wires = Vec::with_capacity(n);
        for (i, chunk) in bytes.chunks(SCALAR_BYTES).enumerate() {
            let scalar = Fr::deserialize_compressed(chunk).map_err(|_| {
                FiatShamirError::NonCanonicalScalar {
                    offset: start + i * SCALAR_BYTES,
                }
            })?;
            wires.push(b.constant(scalar));
        }
        self.sponge.absorb(b, &wires);
        Ok(wires)
    }

    /// Read `n` raw bytes (the proof-of-work nonce), absorb them, return them
    /// as byte wires.
    pub fn fill_next_bytes<B: Builder>(
        &mut self,
        b: &mut B,
        n: usize,
    ) -> Result<Vec<B::Var>, FiatShamirError>
    where
        S: CircuitSponge<B>,
    {
        self.next_absorb_op(n, true)?;
        let bytes = self.take(n)?.to_vec();
        let wires: Vec<B::Var> = bytes
            .iter()
            .map(|&byte| b.constant(Fr::from(byte as u64)))
            .collect();
        self.sponge.absorb_byte_wires(b, &wires);
        Ok(wires)
    }

    /// Squeeze `n` challenge scalars.
    pub fn fill_challenge_scalars<B: Builder>(&mut self, b: &mut B, n: usize) -> Vec<B::Var>
    where
        S: CircuitSponge<B>,
    {
        (0..n).map(|_| self.sponge.squeeze(b)).collect()
    }

    /// Squeeze `n` challenge bytes.
    pub fn fill_challenge_bytes<B: Builder>(&mut self, b: &mut B, n: usize) -> Vec<B::Var>
    where
        S: CircuitSponge<B>,
    {
        self.sponge.squeeze_byte_wires(b, n)
    }

    /// Two-to-one compression of the underlying sponge. Stateless: does not
    /// advance the transcript.
    pub fn compress<B: Builder>(&self, b: &mut B, left: &B::Var, right: &B::Var) -> B::Var
    where
        S: CircuitSponge<B>,
    {
        self.sponge.compress(b, left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        circuit::NativeBuilder,
        crypto::sponge::{scalar_bytes, DuplexSponge, KeccakSponge},
    };

    fn pattern() -> IoPattern {
        let mut p = IoPattern::new();
        p.absorb(2, "claims")
            .squeeze(1, "alpha")
            .absorb(8, POW_NONCE_LABEL);
        p
    }

    fn stream(scalars: &[Fr], nonce: &[u8; 8]) -> Vec<u8> {
        let mut out = Vec::new();
        for s in scalars {
            out.extend_from_slice(&scalar_bytes(s));
        }
        out.extend_from_slice(nonce);
        out
    }

    #[test]
    fn replay_matches_prover_side_sponge() {
        let p = pattern();
        let scalars = [Fr::from(5u64), Fr::from(6u64)];
        let nonce = [9u8; 8];

        // Prover side: absorb the same messages into an identical sponge.
        let mut prover_sponge = KeccakSponge::from_io_pattern(&p.encode());
        prover_sponge.absorb_scalars(&scalars);
        let prover_alpha = prover_sponge.squeeze_scalar();
        prover_sponge.absorb_bytes(&nonce);

        let mut b = NativeBuilder::new();
        let sponge = KeccakSponge::from_io_pattern(&p.encode());
        let mut arthur = Arthur::new(&p, stream(&scalars, &nonce), sponge);

        let wires = arthur.fill_next_scalars(&mut b, 2).unwrap();
        assert_eq!(wires, scalars.to_vec());
        let alpha = arthur.fill_challenge_scalars(&mut b, 1);
        assert_eq!(alpha[0], prover_alpha);
        let nonce_wires = arthur.fill_next_bytes(&mut b, 8).unwrap();
        assert_eq!(nonce_wires[0], Fr::from(9u64));
        assert_eq!(arthur.remaining(), 0);
    }

    #[test]
    fn shape_mismatch_is_detected() {
        let p = pattern();
        let mut b = NativeBuilder::new();
        let sponge = KeccakSponge::from_io_pattern(&p.encode());
        let mut arthur = Arthur::new(&p, stream(&[Fr::from(1u64), Fr::from(2u64)], &[0; 8]), sponge);
        assert!(matches!(
            arthur.fill_next_scalars(&mut b, 3),
            Err(FiatShamirError::PatternMismatch { .. })
        ));
    }

    #[test]
    fn non_canonical_scalar_is_rejected() {
        use ark_ff::{BigInteger, PrimeField};

        let mut p = IoPattern::new();
        p.absorb(1, "root");
        // The modulus itself: the smallest non-canonical encoding.
        let stream = Fr::MODULUS.to_bytes_le();
        let mut b = NativeBuilder::new();
        let sponge = KeccakSponge::from_io_pattern(&p.encode());
        let mut arthur = Arthur::new(&p, stream, sponge);
        assert!(matches!(
            arthur.fill_next_scalars(&mut b, 1),
            Err(FiatShamirError::NonCanonicalScalar { offset: 0 })
        ));
    }

    #[test]
    fn underflow_is_reported() {
        let mut p = IoPattern::new();
        p.absorb(1, "root");
        let mut b = NativeBuilder::new();
        let sponge = KeccakSponge::from_io_pattern(&p.encode());
        let mut arthur = Arthur::new(&p, vec![0u8; 16], sponge);
        assert!(matches!(
            arthur.fill_next_scalars(&mut b, 1),
            Err(FiatShamirError::TranscriptUnderflow { .. })
        ));
    }
}
