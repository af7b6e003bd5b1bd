//! Duplex sponge over BN254 scalars.
//!
//! The Fiat-Shamir sponge of the production system (Skyscraper) is a
//! collaborator; the verifier only relies on the duplex interface below. The
//! crate ships [`KeccakSponge`], a Keccak-256-backed duplex used by the
//! reference backend and by every test that generates transcripts.
//!
//! The sponge is single-owner: the transcript replayer holds it exclusively
//! and every squeeze depends on all prior absorbs. Reordering any two
//! operations changes every subsequent challenge.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use ark_serialize::CanonicalSerialize;
use sha3::{Digest, Keccak256};

use crate::circuit::{Builder, NativeBuilder};

/// Absorb/squeeze interface over concrete field elements and bytes.
pub trait DuplexSponge: Clone {
    /// Fresh sponge from a 32-byte initialization vector.
    fn new(iv: [u8; 32]) -> Self;

    fn absorb_scalars(&mut self, input: &[Fr]);
    fn absorb_bytes(&mut self, input: &[u8]);

    fn squeeze_bytes(&mut self, out: &mut [u8]);

    fn squeeze_scalar(&mut self) -> Fr {
        let mut block = [0u8; 32];
        self.squeeze_bytes(&mut block);
        Fr::from_le_bytes_mod_order(&block)
    }

    fn squeeze_scalars(&mut self, n: usize) -> Vec<Fr> {
        (0..n).map(|_| self.squeeze_scalar()).collect()
    }
}

/// The sponge as seen from inside the circuit: operations on wires.
///
/// A real backend implements this with an algebraic permutation expressed in
/// constraints. The reference implementation delegates to the concrete sponge,
/// since native wires carry their values.
pub trait CircuitSponge<B: Builder> {
    fn absorb(&mut self, b: &mut B, input: &[B::Var]);

    /// Absorb wires holding byte values (used for the proof-of-work nonce).
    fn absorb_byte_wires(&mut self, b: &mut B, input: &[B::Var]);

    fn squeeze(&mut self, b: &mut B) -> B::Var;

    /// Squeeze `n` wires each holding a byte value.
    fn squeeze_byte_wires(&mut self, b: &mut B, n: usize) -> Vec<B::Var>;

    /// Two-to-one compression for Merkle hashing. Stateless.
    fn compress(&self, b: &mut B, left: &B::Var, right: &B::Var) -> B::Var;
}

/// Domain-separation tags for the Keccak duplex ratchet.
const TAG_ABSORB_SCALARS: u8 = 0x00;
const TAG_ABSORB_BYTES: u8 = 0x01;
const TAG_SQUEEZE: u8 = 0x02;

/// Keccak-256 duplex over BN254 scalars.
///
/// Absorbs ratchet the 32-byte state over the canonical little-endian scalar
/// encoding; squeezed scalars are the little-endian reduction of a squeezed
/// block. `compress` hashes the two canonical encodings, reduced into the
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeccakSponge {
    state: [u8; 32],
}

impl KeccakSponge {
    /// Sponge bound to a protocol shape: the IV is the digest of the
    /// IO-pattern string.
    #[must_use]
    pub fn from_io_pattern(io_pattern: &[u8]) -> Self {
        Self::new(keccak256(&[io_pattern]))
    }

    /// Stateless two-to-one compression over concrete scalars.
    #[must_use]
    pub fn compress_scalars(left: &Fr, right: &Fr) -> Fr {
        let digest = keccak256(&[&scalar_bytes(left), &scalar_bytes(right)]);
        Fr::from_le_bytes_mod_order(&digest)
    }

    fn ratchet(&mut self, tag: u8, payload: &[u8]) {
        self.state = keccak256(&[&self.state, &[tag], payload]);
    }
}

impl DuplexSponge for KeccakSponge {
    fn new(iv: [u8; 32]) -> Self {
        Self { state: iv }
    }

    fn absorb_scalars(&mut self, input: &[Fr]) {
        for scalar in input {
            self.ratchet(TAG_ABSORB_SCALARS, &scalar_bytes(scalar));
        }
    }

    fn absorb_bytes(&mut self, input: &[u8]) {
        self.ratchet(TAG_ABSORB_BYTES, input);
    }

    fn squeeze_bytes(&mut self, out: &mut [u8]) {
        for chunk in out.chunks_mut(32) {
            let block = keccak256(&[&self.state, &[TAG_SQUEEZE]]);
            self.state = block;
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
    }
}

impl CircuitSponge<NativeBuilder> for KeccakSponge {
    fn absorb(&mut self, _b: &mut NativeBuilder, input: &[Fr]) {
        self.absorb_scalars(input);
    }

    fn absorb_byte_wires(&mut self, _b: &mut NativeBuilder, input: &[Fr]) {
        let bytes: Vec<u8> = input.iter().map(wire_to_byte).collect();
        self.absorb_bytes(&bytes);
    }

    fn squeeze(&mut self, b: &mut NativeBuilder) -> Fr {
        let scalar = self.squeeze_scalar();
        b.constant(scalar)
    }

    fn squeeze_byte_wires(&mut self, b: &mut NativeBuilder, n: usize) -> Vec<Fr> {
        let mut bytes = vec![0u8; n];
        self.squeeze_bytes(&mut bytes);
        bytes
            .into_iter()
            .map(|byte| b.constant(Fr::from(byte as u64)))
            .collect()
    }

    fn compress(&self, _b: &mut NativeBuilder, left: &Fr, right: &Fr) -> Fr {
        Self::compress_scalars(left, right)
    }
}

/// Canonical 32-byte little-endian encoding of a scalar.
#[must_use]
pub fn scalar_bytes(scalar: &Fr) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    scalar
        .serialize_compressed(&mut bytes[..])
        .expect("32-byte buffer fits a BN254 scalar");
    bytes
}

fn wire_to_byte(wire: &Fr) -> u8 {
    let repr = wire.into_bigint();
    debug_assert!(repr.0[1] == 0 && repr.0[2] == 0 && repr.0[3] == 0 && repr.0[0] < 256);
    repr.0[0] as u8
}

fn keccak256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
