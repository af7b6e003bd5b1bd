//! Proof payload model: the hints interleaved in the transcript.
//!
//! Hints are out-of-band prover data (Merkle openings, claimed evaluations)
//! that the circuit receives as witness rather than absorbing. They are parsed
//! once, out of circuit, into a [`HintPool`], then partitioned into one group
//! per WHIR invocation.

use ark_bn254::Fr;
use thiserror::Error;

pub mod deserialize;

use deserialize::ByteReader;

/// A Keccak-256 output.
pub type Digest = [u8; 32];

/// Hint labels, as they appear in the IO pattern.
pub const HINT_MERKLE_PROOF: &str = "merkle_proof";
pub const HINT_STIR_ANSWERS: &str = "stir_answers";
pub const HINT_DEFERRED: &str = "deferred_weight_evaluations";
pub const HINT_CLAIMED_EVALUATIONS: &str = "claimed_evaluations";
pub const HINT_SUMCHECK_LAST_FOLDS: &str = "sumcheck_last_folds";

/// Malformed hint payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HintError {
    #[error("hint payload truncated")]
    Truncated,

    #[error("non-canonical scalar in hint payload")]
    NonCanonicalScalar,

    #[error("hint payload has {0} trailing byte(s)")]
    TrailingBytes(usize),

    #[error("malformed authentication path: {0}")]
    BadAuthPath(String),

    #[error("malformed opening: {0}")]
    BadOpening(String),
}

/// A batched Merkle opening with prefix-compressed authentication paths.
///
/// Paths are stored root-side first. `auth_paths_suffixes[0]` is the first
/// leaf's full path; every later entry is `(prefix_length, suffix)`, meaning
/// "keep the first `prefix_length` digests of the previous path, then append
/// `suffix`". Adjacent leaves share the top of the tree, so the shared prefix
/// is the root side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiPath {
    pub leaf_sibling_hashes: Vec<Digest>,
    pub auth_paths_prefix_lengths: Vec<u64>,
    pub auth_paths_suffixes: Vec<Vec<Digest>>,
    pub leaf_indexes: Vec<u64>,
}

impl MultiPath {
    /// Number of opened leaves.
    #[must_use]
    pub fn num_leaves(&self) -> usize {
        self.leaf_indexes.len()
    }

    /// Reconstruct every leaf's full authentication path, bottom-up.
    ///
    /// Entry `z` of a returned path is the sibling hash at tree level `z + 1`
    /// (the level-0 sibling is `leaf_sibling_hashes`). Decoding keeps a
    /// mutable previous path and splices each suffix in at its prefix length.
    pub fn decode_auth_paths(&self) -> Result<Vec<Vec<Digest>>, HintError> {
        let k = self.num_leaves();
        if k == 0
            || self.leaf_sibling_hashes.len() != k
            || self.auth_paths_prefix_lengths.len() != k
            || self.auth_paths_suffixes.len() != k
        {
            return Err(HintError::BadAuthPath(format!(
                "inconsistent arity: {k} leaves, {} siblings, {} prefixes, {} suffixes",
                self.leaf_sibling_hashes.len(),
                self.auth_paths_prefix_lengths.len(),
                self.auth_paths_suffixes.len(),
            )));
        }

        let mut prev = self.auth_paths_suffixes[0].clone();
        let path_len = prev.len();
        let mut out = Vec::with_capacity(k);
        out.push(reversed(&prev));

        for j in 1..k {
            let prefix = self.auth_paths_prefix_lengths[j] as usize;
            if prefix > prev.len() {
                return Err(HintError::BadAuthPath(format!(
                    "prefix length {prefix} exceeds path length {}",
                    prev.len()
                )));
            }
            prev.truncate(prefix);
            prev.extend_from_slice(&self.auth_paths_suffixes[j]);
            if prev.len() != path_len {
                return Err(HintError::BadAuthPath(format!(
                    "path length changed from {path_len} to {}",
                    prev.len()
                )));
            }
            out.push(reversed(&prev));
        }
        Ok(out)
    }
}

fn reversed(path: &[Digest]) -> Vec<Digest> {
    path.iter().rev().copied().collect()
}

/// Typed pools of all hints in one transcript, in order of appearance.
#[derive(Debug, Clone, Default)]
pub struct HintPool {
    pub merkle_paths: Vec<MultiPath>,
    pub stir_answers: Vec<Vec<Vec<Fr>>>,
    pub deferred: Vec<Fr>,
    pub claimed_evaluations: Vec<Fr>,
    pub sumcheck_last_folds: Vec<Fr>,
}

impl HintPool {
    /// Parse one hint payload by label. Unknown labels are skipped, matching
    /// the transcript format: their payload bytes were already consumed by the
    /// length prefix.
    pub fn absorb_hint(&mut self, label: &str, payload: &[u8]) -> Result<(), HintError> {
        match label {
            HINT_MERKLE_PROOF => {
                let mut reader = ByteReader::new(payload);
                let path = deserialize::read_multipath(&mut reader)?;
                reader.finish()?;
                self.merkle_paths.push(path);
            }
            HINT_STIR_ANSWERS => {
                let mut reader = ByteReader::new(payload);
                let answers = deserialize::read_scalar_matrix(&mut reader)?;
                reader.finish()?;
                self.stir_answers.push(answers);
            }
            HINT_DEFERRED => {
                self.deferred.extend(decode_scalar_vec(payload)?);
            }
            HINT_CLAIMED_EVALUATIONS => {
                self.claimed_evaluations.extend(decode_scalar_vec(payload)?);
            }
            HINT_SUMCHECK_LAST_FOLDS => {
                self.sumcheck_last_folds
                    .extend(decode_scalar_vec(payload)?);
            }
            _ => {}
        }
        Ok(())
    }
}

fn decode_scalar_vec(payload: &[u8]) -> Result<Vec<Fr>, HintError> {
    let mut reader = ByteReader::new(payload);
    let scalars = deserialize::read_scalar_vec(&mut reader)?;
    reader.finish()?;
    Ok(scalars)
}

/// The Merkle-opening hints of a single WHIR invocation: one
/// `(paths, answers)` pair per round, including the commitment round.
#[derive(Debug, Clone, Default)]
pub struct WhirHints {
    pub paths: Vec<MultiPath>,
    pub answers: Vec<Vec<Vec<Fr>>>,
}
