//! In-circuit batched Merkle opening verification.
//!
//! Each WHIR invocation carries `n_rounds + 1` batched openings, one per
//! committed codeword. A leaf is a coset of scalars; its hash is the
//! left-to-right compression fold of the coset. Authentication walks bottom-up,
//! choosing left/right at every level from the leaf index bits, and the final
//! value is constrained equal to the claimed root.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use itertools::izip;

use crate::{
    circuit::Builder,
    crypto::sponge::CircuitSponge,
    fiat_shamir::Arthur,
    proof::{HintError, WhirHints},
};

/// One batched opening: every opened leaf of one committed codeword.
#[derive(Debug, Clone)]
pub struct MerkleRound<V> {
    /// Opened cosets, one vector of scalars per leaf.
    pub leaves: Vec<Vec<V>>,
    /// Concrete leaf positions, kept for challenge-point derivation.
    pub leaf_indexes: Vec<u64>,
    /// The same positions as wires.
    pub leaf_index_wires: Vec<V>,
    /// Sibling hash of each leaf.
    pub sibling_hashes: Vec<V>,
    /// Authentication paths, bottom-up; entry `z` is the sibling at level
    /// `z + 1`.
    pub auth_paths: Vec<Vec<V>>,
}

/// All openings of one WHIR invocation, commitment round first.
#[derive(Debug, Clone)]
pub struct MerkleRounds<V> {
    pub rounds: Vec<MerkleRound<V>>,
}

impl<V: Clone> MerkleRounds<V> {
    /// Decode one invocation's hint group into wires.
    pub fn from_hints<B: Builder<Var = V>>(
        b: &mut B,
        hints: &WhirHints,
    ) -> Result<Self, HintError> {
        let mut rounds = Vec::with_capacity(hints.paths.len());
        for (path, answers) in hints.paths.iter().zip(&hints.answers) {
            if answers.len() != path.num_leaves() {
                return Err(HintError::BadOpening(format!(
                    "{} opened leaves but {} answer vectors",
                    path.num_leaves(),
                    answers.len()
                )));
            }
            for coset in answers {
                if coset.len() < 2 || !coset.len().is_power_of_two() {
                    return Err(HintError::BadOpening(format!(
                        "coset of {} scalar(s) is not an opened leaf",
                        coset.len()
                    )));
                }
            }
            let auth_paths = path
                .decode_auth_paths()?
                .into_iter()
                .map(|p| p.iter().map(|d| digest_wire(b, d)).collect())
                .collect();
            rounds.push(MerkleRound {
                leaves: answers
                    .iter()
                    .map(|coset| coset.iter().map(|s| b.constant(*s)).collect())
                    .collect(),
                leaf_indexes: path.leaf_indexes.clone(),
                leaf_index_wires: path
                    .leaf_indexes
                    .iter()
                    .map(|&i| b.constant(Fr::from(i)))
                    .collect(),
                sibling_hashes: path
                    .leaf_sibling_hashes
                    .iter()
                    .map(|d| digest_wire(b, d))
                    .collect(),
                auth_paths,
            });
        }
        Ok(Self { rounds })
    }

    #[must_use]
    pub fn num_rounds(&self) -> usize {
        self.rounds.len()
    }

    #[must_use]
    pub fn round(&self, r: usize) -> &MerkleRound<V> {
        &self.rounds[r]
    }
}

/// A digest enters the field as its little-endian reduction.
fn digest_wire<B: Builder>(b: &mut B, digest: &[u8; 32]) -> B::Var {
    b.constant(Fr::from_le_bytes_mod_order(digest))
}

/// Constrain every opened leaf of `round` to authenticate against `root`.
pub fn verify_merkle_round<B, S>(
    b: &mut B,
    arthur: &Arthur<S>,
    round: &MerkleRound<B::Var>,
    root: &B::Var,
) where
    B: Builder,
    S: CircuitSponge<B>,
{
    for (leaf, index_wire, sibling, auth_path) in izip!(
        &round.leaves,
        &round.leaf_index_wires,
        &round.sibling_hashes,
        &round.auth_paths
    ) {
        let tree_height = auth_path.len() + 1;
        let index_bits = b.to_binary(index_wire, tree_height);

        assert!(leaf.len() >= 2, "a coset holds at least two scalars");
        let mut leaf_hash = arthur.compress(b, &leaf[0], &leaf[1]);
        for scalar in &leaf[2..] {
            leaf_hash = arthur.compress(b, &leaf_hash, scalar);
        }

        let mut current = combine_level(b, arthur, &index_bits[0], &leaf_hash, sibling);
        for (bit, sibling_hash) in index_bits[1..].iter().zip(auth_path) {
            current = combine_level(b, arthur, bit, &current, sibling_hash);
        }
        b.assert_is_equal(&current, root);
    }
}

/// Compress a node with its sibling, ordered by the index bit.
fn combine_level<B, S>(
    b: &mut B,
    arthur: &Arthur<S>,
    bit: &B::Var,
    node: &B::Var,
    sibling: &B::Var,
) -> B::Var
where
    B: Builder,
    S: CircuitSponge<B>,
{
    let left = b.select(bit, sibling, node);
    let right = b.select(bit, node, sibling);
    arthur.compress(b, &left, &right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        circuit::NativeBuilder,
        crypto::sponge::{scalar_bytes, KeccakSponge},
        fiat_shamir::IoPattern,
        proof::{Digest, MultiPath},
    };

    /// Test-side Merkle tree over coset leaves, using the same compression as
    /// the circuit.
    struct Tree {
        levels: Vec<Vec<Fr>>,
    }

    impl Tree {
        fn build(cosets: &[Vec<Fr>]) -> Self {
            assert!(cosets.len().is_power_of_two());
            let mut level: Vec<Fr> = cosets
                .iter()
                .map(|coset| {
                    let mut h = KeccakSponge::compress_scalars(&coset[0], &coset[1]);
                    for s in &coset[2..] {
                        h = KeccakSponge::compress_scalars(&h, s);
                    }
                    h
                })
                .collect();
            let mut levels = vec![level.clone()];
            while level.len() > 1 {
                level = level
                    .chunks(2)
                    .map(|pair| KeccakSponge::compress_scalars(&pair[0], &pair[1]))
                    .collect();
                levels.push(level.clone());
            }
            Self { levels }
        }

        fn root(&self) -> Fr {
            self.levels.last().unwrap()[0]
        }

        /// Root-first stored path for one leaf (levels `height-1 .. 1`).
        fn stored_path(&self, index: usize) -> Vec<Digest> {
            let height = self.levels.len() - 1;
            (1..height)
                .rev()
                .map(|level| {
                    let sibling = (index >> level) ^ 1;
                    scalar_bytes(&self.levels[level][sibling])
                })
                .collect()
        }

        fn open(&self, indexes: &[usize], cosets: &[Vec<Fr>]) -> (MultiPath, Vec<Vec<Fr>>) {
            let mut path = MultiPath::default();
            let mut answers = Vec::new();
            let mut prev: Option<Vec<Digest>> = None;
            for &index in indexes {
                let full = self.stored_path(index);
                match &prev {
                    None => {
                        path.auth_paths_prefix_lengths.push(0);
                        path.auth_paths_suffixes.push(full.clone());
                    }
                    Some(prev_path) => {
                        let shared = prev_path
                            .iter()
                            .zip(&full)
                            .take_while(|(a, b)| a == b)
                            .count();
                        path.auth_paths_prefix_lengths.push(shared as u64);
                        path.auth_paths_suffixes.push(full[shared..].to_vec());
                    }
                }
                prev = Some(full);
                path.leaf_sibling_hashes
                    .push(scalar_bytes(&self.levels[0][index ^ 1]));
                path.leaf_indexes.push(index as u64);
                answers.push(cosets[index].clone());
            }
            (path, answers)
        }
    }

    fn setup() -> (Vec<Vec<Fr>>, Tree) {
        let cosets: Vec<Vec<Fr>> = (0..8u64)
            .map(|i| vec![Fr::from(10 * i), Fr::from(10 * i + 1), Fr::from(10 * i + 2), Fr::from(10 * i + 3)])
            .collect();
        let tree = Tree::build(&cosets);
        (cosets, tree)
    }

    fn verify(path: MultiPath, answers: Vec<Vec<Fr>>, root: Fr) -> Result<(), ()> {
        let hints = WhirHints {
            paths: vec![path],
            answers: vec![answers],
        };
        let mut b = NativeBuilder::new();
        let pattern = IoPattern::new();
        let arthur = Arthur::new(
            &pattern,
            Vec::new(),
            KeccakSponge::from_io_pattern(&pattern.encode()),
        );
        let rounds = MerkleRounds::from_hints(&mut b, &hints).map_err(|_| ())?;
        let root_wire = b.constant(root);
        verify_merkle_round(&mut b, &arthur, rounds.round(0), &root_wire);
        b.finish().map(|_| ()).map_err(|_| ())
    }

    #[test]
    fn honest_openings_authenticate() {
        let (cosets, tree) = setup();
        let (path, answers) = tree.open(&[1, 3, 6], &cosets);
        assert!(verify(path, answers, tree.root()).is_ok());
    }

    #[test]
    fn tampered_sibling_fails() {
        let (cosets, tree) = setup();
        let (mut path, answers) = tree.open(&[2, 5], &cosets);
        path.leaf_sibling_hashes[1][0] ^= 1;
        assert!(verify(path, answers, tree.root()).is_err());
    }

    #[test]
    fn tampered_leaf_fails() {
        let (cosets, tree) = setup();
        let (path, mut answers) = tree.open(&[0, 7], &cosets);
        answers[0][2] += Fr::from(1u64);
        assert!(verify(path, answers, tree.root()).is_err());
    }

    #[test]
    fn wrong_index_fails() {
        let (cosets, tree) = setup();
        let (mut path, answers) = tree.open(&[4], &cosets);
        path.leaf_indexes[0] = 5;
        assert!(verify(path, answers, tree.root()).is_err());
    }

    #[test]
    fn wrong_root_fails() {
        let (cosets, tree) = setup();
        let (path, answers) = tree.open(&[4], &cosets);
        assert!(verify(path, answers, tree.root() + Fr::from(1u64)).is_err());
    }
}
