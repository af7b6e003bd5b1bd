//! Grand-product arguments and the offline memory-check.
//!
//! A grand product over `2^k` compressed memory tuples is verified layer by
//! layer down a binary product tree: each layer contributes one sum-check of
//! `eq(prev, y) * L0(y) * L1(y)` plus a two-point line message reducing the
//! pair of child claims to one. The memory-check runs four such arguments
//! (initial memory, read set, write set, final memory) and closes them with
//! the multiset identity `init * ws == rs * final`.
//!
//! Tuple compression is `addr * gamma^2 + value * gamma + counter - tau`. The
//! `init` run discharges its final claim purely in-circuit (the address is a
//! bit recombination of the randomness, the value an equality polynomial, the
//! counter zero); the other runs solve one operand of the triple from the
//! reduced claim and discharge the rest through WHIR openings.

use crate::{
    circuit::Builder,
    crypto::sponge::CircuitSponge,
    errors::VerifierError,
    fiat_shamir::Arthur,
    merkle::MerkleRounds,
    poly::{calculate_adr, eval_eq},
    sumcheck::{verify_sumcheck_rounds, PolynomialForm},
    whir::{run_whir, EvaluationClaims, WhirCommitment, WhirParams},
};

/// Outcome of one grand-product sum-check run.
#[derive(Debug, Clone)]
pub struct GpaResult<V> {
    /// The claimed product, as read from the transcript.
    pub claimed_product: V,
    /// The reduced claim: the leaf-layer polynomial at `randomness`.
    pub last_value: V,
    /// Final randomness, one coordinate per tree variable, high bit first.
    pub randomness: Vec<V>,
}

/// Verify a grand product over `2^leaf_count_log` values.
///
/// Reads the claimed product, then walks the tree top-down. Layer `i`
/// contributes `i` cubic sum-check rounds, a two-scalar line `(L(0), L(1))`,
/// and one squeezed challenge; the pair of child claims reduces to the line's
/// value at the challenge.
pub fn gpa_sumcheck_verifier<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    leaf_count_log: usize,
) -> Result<GpaResult<B::Var>, VerifierError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    let claimed_product = arthur
        .fill_next_scalars(b, 1)?
        .pop()
        .expect("one claimed product");
    let mut last = claimed_product.clone();
    let mut prev_rand: Vec<B::Var> = Vec::new();

    for i in 0..leaf_count_log {
        let (rand, reduced) =
            verify_sumcheck_rounds(b, arthur, &last, i, 4, PolynomialForm::Coefficients)?;
        last = reduced;

        let line = arthur.fill_next_scalars(b, 2)?;
        let rho = arthur
            .fill_challenge_scalars(b, 1)
            .pop()
            .expect("one challenge");

        // eq(prev, rand) * L(0) * L(1) must close the sum-check.
        let eq = eval_eq(b, &prev_rand, &rand);
        let child_product = b.mul(&line[0], &line[1]);
        let expected = b.mul(&eq, &child_product);
        b.assert_is_equal(&expected, &last);

        // Reduce both child claims to the line at rho.
        let diff = b.sub(&line[1], &line[0]);
        let shift = b.mul(&rho, &diff);
        last = b.add(&line[0], &shift);

        prev_rand = rand;
        prev_rand.push(rho);
    }

    Ok(GpaResult {
        claimed_product,
        last_value: last,
        randomness: prev_rand,
    })
}

/// `addr * gamma^2 + value * gamma + counter - tau`.
fn compress_tuple<B: Builder>(
    b: &mut B,
    addr: &B::Var,
    value: &B::Var,
    counter: Option<&B::Var>,
    gamma: &B::Var,
    gamma_sq: &B::Var,
    tau: &B::Var,
) -> B::Var {
    let a = b.mul(addr, gamma_sq);
    let v = b.mul(value, gamma);
    let mut acc = b.add(&a, &v);
    if let Some(counter) = counter {
        acc = b.add(&acc, counter);
    }
    b.sub(&acc, tau)
}

/// Solve the tuple compression for its counter:
/// `counter = claim + tau - addr * gamma^2 - value * gamma`.
fn solve_counter<B: Builder>(
    b: &mut B,
    claim: &B::Var,
    addr: &B::Var,
    value: &B::Var,
    gamma: &B::Var,
    gamma_sq: &B::Var,
    tau: &B::Var,
) -> B::Var {
    let a = b.mul(addr, gamma_sq);
    let v = b.mul(value, gamma);
    let mut acc = b.add(claim, tau);
    acc = b.sub(&acc, &a);
    b.sub(&acc, &v)
}

/// Everything one memory side (row or column) needs for its check.
pub struct MemorySide<'a, V> {
    /// Randomness the memory was initialized with: `r_outer` for rows, the
    /// witness-opening randomness for columns. Length is the memory log-size.
    pub r_mem: &'a [V],
    /// Log of the number of memory cells.
    pub log_memory: usize,
    /// Log of the number of accesses (matrix terms).
    pub log_ops: usize,
    /// Term-space WHIR parameters (address, value, and timestamp openings).
    pub ops_params: &'a WhirParams,
    /// Memory-space WHIR parameters (final-counter opening).
    pub cts_params: &'a WhirParams,
    pub addr_commitment: &'a WhirCommitment<V>,
    pub value_commitment: &'a WhirCommitment<V>,
    pub read_ts_commitment: &'a WhirCommitment<V>,
    pub final_cts_commitment: &'a WhirCommitment<V>,
}

/// Number of WHIR openings one memory-check consumes, in transcript order:
/// final counters, then read-set and write-set address/value/timestamp.
pub const MEMORY_CHECK_WHIR_OPENINGS: usize = 7;

/// Offline memory-check: the four multisets
/// `init ∪ writes == reads ∪ final` over one memory side.
pub fn offline_memory_check<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    side: &MemorySide<'_, B::Var>,
    merkle_groups: &[MerkleRounds<B::Var>],
) -> Result<(), VerifierError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    assert_eq!(
        merkle_groups.len(),
        MEMORY_CHECK_WHIR_OPENINGS,
        "one Merkle group per memory-check opening"
    );

    let tau = arthur
        .fill_challenge_scalars(b, 1)
        .pop()
        .expect("one challenge");
    let gamma = arthur
        .fill_challenge_scalars(b, 1)
        .pop()
        .expect("one challenge");
    let gamma_sq = b.mul(&gamma, &gamma);

    // Initial memory: everything is synthesized from the randomness.
    let init = gpa_sumcheck_verifier(b, arthur, side.log_memory)?;
    let addr = calculate_adr(b, &init.randomness);
    let value = eval_eq(b, side.r_mem, &init.randomness);
    let expected = compress_tuple(b, &addr, &value, None, &gamma, &gamma_sq, &tau);
    b.assert_is_equal(&init.last_value, &expected);

    // Final memory: address and value synthesize; the counter claim is solved
    // and discharged against the committed final counters.
    let fin = gpa_sumcheck_verifier(b, arthur, side.log_memory)?;
    let addr = calculate_adr(b, &fin.randomness);
    let value = eval_eq(b, side.r_mem, &fin.randomness);
    let counter = solve_counter(b, &fin.last_value, &addr, &value, &gamma, &gamma_sq, &tau);
    run_whir(
        b,
        arthur,
        side.cts_params,
        side.final_cts_commitment,
        &merkle_groups[0],
        &EvaluationClaims::at_point(fin.randomness.clone(), counter),
    )?;

    // Read set: claimed address and value arrive as absorbed prover messages,
    // the read timestamp is solved, and all three are opened.
    let rs = gpa_sumcheck_verifier(b, arthur, side.log_ops)?;
    let mut claims = arthur.fill_next_scalars(b, 2)?;
    let value_claim = claims.pop().expect("two claims");
    let addr_claim = claims.pop().expect("two claims");
    let ts_claim = solve_counter(
        b,
        &rs.last_value,
        &addr_claim,
        &value_claim,
        &gamma,
        &gamma_sq,
        &tau,
    );
    for (group, (commitment, claim)) in merkle_groups[1..4].iter().zip([
        (side.addr_commitment, addr_claim),
        (side.value_commitment, value_claim),
        (side.read_ts_commitment, ts_claim),
    ]) {
        run_whir(
            b,
            arthur,
            side.ops_params,
            commitment,
            group,
            &EvaluationClaims::at_point(rs.randomness.clone(), claim),
        )?;
    }

    // Write set: identical shape, with the write counter one past the read
    // counter, so the committed timestamp is opened at `counter - 1`.
    let ws = gpa_sumcheck_verifier(b, arthur, side.log_ops)?;
    let mut claims = arthur.fill_next_scalars(b, 2)?;
    let value_claim = claims.pop().expect("two claims");
    let addr_claim = claims.pop().expect("two claims");
    let write_counter = solve_counter(
        b,
        &ws.last_value,
        &addr_claim,
        &value_claim,
        &gamma,
        &gamma_sq,
        &tau,
    );
    let one = b.one();
    let ts_claim = b.sub(&write_counter, &one);
    for (group, (commitment, claim)) in merkle_groups[4..7].iter().zip([
        (side.addr_commitment, addr_claim),
        (side.value_commitment, value_claim),
        (side.read_ts_commitment, ts_claim),
    ]) {
        run_whir(
            b,
            arthur,
            side.ops_params,
            commitment,
            group,
            &EvaluationClaims::at_point(ws.randomness.clone(), claim),
        )?;
    }

    // Multiset closure.
    let lhs = b.mul(&init.claimed_product, &ws.claimed_product);
    let rhs = b.mul(&rs.claimed_product, &fin.claimed_product);
    b.assert_is_equal(&lhs, &rhs);

    Ok(())
}

#[cfg(test)]
mod tests {
    use ark_bn254::Fr;
    use ark_std::{One, Zero};

    use super::*;
    use crate::{
        circuit::NativeBuilder,
        crypto::sponge::{scalar_bytes, DuplexSponge, KeccakSponge},
        fiat_shamir::IoPattern,
    };

    /// Big-endian equality table of a point over its full hypercube.
    fn eq_table(point: &[Fr]) -> Vec<Fr> {
        let mut table = vec![Fr::one()];
        for c in point {
            table = table
                .iter()
                .flat_map(|e| [*e * (Fr::one() - c), *e * c])
                .collect();
        }
        table
    }

    /// Cubic coefficients of `sum_suffix eq(X, s) * v0(X, s) * v1(X, s)`
    /// folded over the first (most significant) variable.
    fn round_coefficients(tables: [&[Fr]; 3]) -> [Fr; 4] {
        let mut coeffs = [Fr::zero(); 4];
        let half = tables[0].len() / 2;
        for j in 0..half {
            let (a0, da) = (tables[0][j], tables[0][half + j] - tables[0][j]);
            let (b0, db) = (tables[1][j], tables[1][half + j] - tables[1][j]);
            let (c0, dc) = (tables[2][j], tables[2][half + j] - tables[2][j]);
            coeffs[0] += a0 * b0 * c0;
            coeffs[1] += a0 * b0 * dc + a0 * db * c0 + da * b0 * c0;
            coeffs[2] += a0 * db * dc + da * b0 * dc + da * db * c0;
            coeffs[3] += da * db * dc;
        }
        coeffs
    }

    fn fold(table: &mut Vec<Fr>, r: Fr) {
        let half = table.len() / 2;
        for j in 0..half {
            table[j] = table[j] + r * (table[half + j] - table[j]);
        }
        table.truncate(half);
    }

    /// Honest grand-product prover over `leaves`, mirroring the verifier's
    /// transcript exactly. Appends to `stream` and advances `sponge`.
    fn prove_gpa(leaves: &[Fr], sponge: &mut KeccakSponge, stream: &mut Vec<u8>) {
        let mut push_scalars = |sponge: &mut KeccakSponge, stream: &mut Vec<u8>, s: &[Fr]| {
            for x in s {
                stream.extend_from_slice(&scalar_bytes(x));
            }
            sponge.absorb_scalars(s);
        };

        // Product tree, root first.
        let mut layers = vec![leaves.to_vec()];
        while layers.last().unwrap().len() > 1 {
            let next: Vec<Fr> = layers
                .last()
                .unwrap()
                .chunks(2)
                .map(|pair| pair[0] * pair[1])
                .collect();
            layers.push(next);
        }
        layers.reverse();

        push_scalars(sponge, stream, &[layers[0][0]]);

        let mut prev_rand: Vec<Fr> = Vec::new();
        for (i, layer) in layers[1..].iter().enumerate() {
            // Child tables: last index bit selects even/odd.
            let mut v0: Vec<Fr> = layer.iter().step_by(2).copied().collect();
            let mut v1: Vec<Fr> = layer.iter().skip(1).step_by(2).copied().collect();
            let mut eq = eq_table(&prev_rand);

            let mut rand = Vec::new();
            for _ in 0..i {
                let coeffs = round_coefficients([&eq, &v0, &v1]);
                push_scalars(sponge, stream, &coeffs);
                let r = sponge.squeeze_scalar();
                rand.push(r);
                fold(&mut eq, r);
                fold(&mut v0, r);
                fold(&mut v1, r);
            }

            push_scalars(sponge, stream, &[v0[0], v1[0]]);
            let rho = sponge.squeeze_scalar();
            prev_rand = rand;
            prev_rand.push(rho);
        }
    }

    fn gpa_pattern(leaf_count_log: usize) -> IoPattern {
        let mut p = IoPattern::new();
        p.absorb(1, "gpa-claimed-product");
        for i in 0..leaf_count_log {
            for _ in 0..i {
                p.absorb(4, "sumcheck-poly").squeeze(1, "folding-randomness");
            }
            p.absorb(2, "gpa-line").squeeze(1, "layer-randomness");
        }
        p
    }

    fn eval_multilinear(table: &[Fr], point: &[Fr]) -> Fr {
        let mut b = NativeBuilder::new();
        crate::poly::eval_multilinear_evals(&mut b, table, point)
    }

    #[test]
    fn honest_tree_verifies_and_reduces_to_leaf_evaluation() {
        let leaves: Vec<Fr> = (1..=16u64).map(Fr::from).collect();
        let pattern = gpa_pattern(4);
        let mut sponge = KeccakSponge::from_io_pattern(&pattern.encode());
        let mut stream = Vec::new();
        prove_gpa(&leaves, &mut sponge, &mut stream);

        let mut b = NativeBuilder::new();
        let verifier_sponge = KeccakSponge::from_io_pattern(&pattern.encode());
        let mut arthur = Arthur::new(&pattern, stream, verifier_sponge);
        let result = gpa_sumcheck_verifier(&mut b, &mut arthur, 4).unwrap();

        assert_eq!(result.claimed_product, leaves.iter().product::<Fr>());
        assert_eq!(result.randomness.len(), 4);
        assert_eq!(
            result.last_value,
            eval_multilinear(&leaves, &result.randomness)
        );
        assert!(b.finish().is_ok());
    }

    #[test]
    fn tampered_product_fails() {
        let leaves: Vec<Fr> = (1..=8u64).map(Fr::from).collect();
        let pattern = gpa_pattern(3);
        let mut sponge = KeccakSponge::from_io_pattern(&pattern.encode());
        let mut stream = Vec::new();
        prove_gpa(&leaves, &mut sponge, &mut stream);
        // Overwrite the claimed product (the first scalar) with a wrong value.
        stream[..32].copy_from_slice(&scalar_bytes(&Fr::from(999u64)));

        let mut b = NativeBuilder::new();
        let verifier_sponge = KeccakSponge::from_io_pattern(&pattern.encode());
        let mut arthur = Arthur::new(&pattern, stream, verifier_sponge);
        let _ = gpa_sumcheck_verifier(&mut b, &mut arthur, 3).unwrap();
        assert!(b.finish().is_err());
    }

    #[test]
    fn init_memory_discharge_is_fully_synthesized() {
        // Initial memory over 8 cells: (addr, eq(r_mem, addr), 0) compressed.
        let r_mem = vec![Fr::from(21u64), Fr::from(22u64), Fr::from(23u64)];
        let tau = Fr::from(77u64);
        let gamma = Fr::from(31u64);
        let eq = eq_table(&r_mem);
        let leaves: Vec<Fr> = (0..8u64)
            .map(|a| Fr::from(a) * gamma * gamma + eq[a as usize] * gamma - tau)
            .collect();

        let pattern = gpa_pattern(3);
        let mut sponge = KeccakSponge::from_io_pattern(&pattern.encode());
        let mut stream = Vec::new();
        prove_gpa(&leaves, &mut sponge, &mut stream);

        let mut b = NativeBuilder::new();
        let verifier_sponge = KeccakSponge::from_io_pattern(&pattern.encode());
        let mut arthur = Arthur::new(&pattern, stream, verifier_sponge);
        let result = gpa_sumcheck_verifier(&mut b, &mut arthur, 3).unwrap();

        let addr = calculate_adr(&mut b, &result.randomness);
        let value = eval_eq(&mut b, &r_mem, &result.randomness);
        let gamma_sq = gamma * gamma;
        let tau_w = b.constant(tau);
        let gamma_w = b.constant(gamma);
        let gamma_sq_w = b.constant(gamma_sq);
        let expected = compress_tuple(
            &mut b, &addr, &value, None, &gamma_w, &gamma_sq_w, &tau_w,
        );
        b.assert_is_equal(&result.last_value, &expected);
        assert!(b.finish().is_ok());
    }

    #[test]
    fn multiset_closure_holds_for_consistent_traces() {
        // One memory of 4 cells, 8 accesses; offline memory-checking closure:
        // init * ws == rs * final iff the traces are consistent.
        let tau = Fr::from(5u64);
        let gamma = Fr::from(9u64);
        let values = [Fr::from(40u64), Fr::from(41u64), Fr::from(42u64), Fr::from(43u64)];
        let accesses = [0usize, 2, 1, 2, 2, 3, 0, 1];

        let compress = |a: u64, v: Fr, t: u64| {
            Fr::from(a) * gamma * gamma + v * gamma + Fr::from(t) - tau
        };

        let mut counters = [0u64; 4];
        let mut rs = Fr::one();
        let mut ws = Fr::one();
        for &a in &accesses {
            rs *= compress(a as u64, values[a], counters[a]);
            counters[a] += 1;
            ws *= compress(a as u64, values[a], counters[a]);
        }
        let init: Fr = (0..4).map(|a| compress(a as u64, values[a as usize], 0)).product();
        let fin: Fr = (0..4)
            .map(|a| compress(a as u64, values[a as usize], counters[a as usize]))
            .product();

        assert_eq!(init * ws, rs * fin);

        // A final counter off by one breaks the identity.
        let broken: Fr = (0..4)
            .map(|a| {
                let bump = u64::from(a == 1);
                compress(a as u64, values[a as usize], counters[a as usize] + bump)
            })
            .product();
        assert_ne!(init * ws, rs * broken);
    }
}
