//! The WHIR opening verifier.
//!
//! One [`run_whir`] call checks a single polynomial opening: the initial
//! claim combination, per-round Merkle-authenticated STIR queries with
//! proof-of-work grinding, the sum-check folding chain, and the final
//! coefficient-form polynomial. Every check is an in-circuit constraint; a
//! cheating transcript makes the circuit unsatisfiable rather than producing
//! an error.

use ark_bn254::Fr;
use ark_ff::Field;

use crate::{
    circuit::Builder,
    crypto::sponge::CircuitSponge,
    errors::VerifierError,
    fiat_shamir::{errors::FiatShamirError, Arthur},
    merkle::{verify_merkle_round, MerkleRounds},
    poly::{
        combine_bytes_be, combine_bytes_le, dot_product, eval_eq, eval_multilinear_coeffs,
        eval_multilinear_evals, eval_univariate, expand_from_univariate, expand_randomness,
    },
    sumcheck::{verify_sumcheck_rounds, PolynomialForm},
    whir::WhirParams,
};

/// A parsed commitment: root plus out-of-domain binding.
#[derive(Debug, Clone)]
pub struct WhirCommitment<V> {
    pub root: V,
    pub ood_points: Vec<V>,
    pub ood_answers: Vec<V>,
}

/// Evaluation claims carried into an opening.
///
/// `linear_statement_evaluations` are claimed sums of linear statements whose
/// weight evaluations arrive deferred (`linear_statement_values_at_points`);
/// `evaluation_claims` are claimed values at explicit `evaluation_points`.
#[derive(Debug, Clone, Default)]
pub struct EvaluationClaims<V> {
    pub linear_statement_evaluations: Vec<V>,
    pub linear_statement_values_at_points: Vec<V>,
    pub evaluation_claims: Vec<V>,
    pub evaluation_points: Vec<Vec<V>>,
}

impl<V> EvaluationClaims<V> {
    /// A single claimed evaluation at one point.
    pub fn at_point(point: Vec<V>, claim: V) -> Self {
        Self {
            linear_statement_evaluations: Vec::new(),
            linear_statement_values_at_points: Vec::new(),
            evaluation_claims: vec![claim],
            evaluation_points: vec![point],
        }
    }
}

/// Read a commitment from the transcript: root, then OOD points (squeezed)
/// and their claimed answers.
pub fn read_commitment<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    ood_samples: usize,
) -> Result<WhirCommitment<B::Var>, FiatShamirError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    let root = arthur
        .fill_next_scalars(b, 1)?
        .pop()
        .expect("one root scalar");
    let (ood_points, ood_answers) = read_ood(b, arthur, ood_samples)?;
    Ok(WhirCommitment {
        root,
        ood_points,
        ood_answers,
    })
}

/// Squeeze `n` out-of-domain points and read their claimed answers.
pub fn read_ood<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    n: usize,
) -> Result<(Vec<B::Var>, Vec<B::Var>), FiatShamirError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    if n == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    let points = arthur.fill_challenge_scalars(b, n);
    let answers = arthur.fill_next_scalars(b, n)?;
    Ok((points, answers))
}

/// Squeeze a combination generator and expand it to `n` powers.
pub fn combination_randomness<B, S>(b: &mut B, arthur: &mut Arthur<S>, n: usize) -> Vec<B::Var>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    let generator = arthur
        .fill_challenge_scalars(b, 1)
        .pop()
        .expect("one generator");
    expand_randomness(b, &generator, n)
}

/// Proof-of-work grinding check.
///
/// Squeezes a 32-byte challenge, reads an 8-byte nonce, and constrains the
/// compression of the pair to have at least `difficulty` leading zero bits.
pub fn run_pow<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    difficulty: usize,
) -> Result<(), FiatShamirError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    if difficulty == 0 {
        return Ok(());
    }
    let challenge_bytes = arthur.fill_challenge_bytes(b, 32);
    let challenge = combine_bytes_le(b, &challenge_bytes);
    let nonce_bytes = arthur.fill_next_bytes(b, 8)?;
    let nonce = combine_bytes_le(b, &nonce_bytes);
    let digest = arthur.compress(b, &challenge, &nonce);

    let bits = b.to_binary(&digest, 254);
    let zero = b.zero();
    for bit in &bits[254 - difficulty..] {
        b.assert_is_equal(bit, &zero);
    }
    Ok(())
}

/// `base^exponent` for a constant base and a 64-bit exponent wire, by
/// square-and-multiply over the exponent bits.
pub fn exp_with_constant_base<B: Builder>(b: &mut B, base: Fr, exponent: &B::Var) -> B::Var {
    let bits = b.to_binary(exponent, 64);
    let one = b.one();
    let mut acc = b.one();
    let mut power = base;
    for bit in &bits {
        let power_wire = b.constant(power);
        let factor = b.select(bit, &power_wire, &one);
        acc = b.mul(&acc, &factor);
        power.square_in_place();
    }
    acc
}

/// Generate the STIR challenge indices for one round, bind them to the opened
/// leaves, and derive the corresponding domain points.
///
/// Index derivation squeezes `ceil(log2(folded_domain)/8)` bytes per query,
/// combines them big-endian, and keeps the low `log2(folded_domain)` bits.
/// Each derived index is constrained to be one of the opened leaf positions;
/// the returned points are `domain_generator^leaf_index`, one per opened leaf.
#[allow(clippy::too_many_arguments)]
pub fn stir_challenge_points<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    num_queries: usize,
    leaf_index_wires: &[B::Var],
    domain_size: usize,
    exp_domain_gen: Fr,
    folding_factor: usize,
) -> Result<Vec<B::Var>, FiatShamirError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    let folded_domain_size = domain_size >> folding_factor;
    let domain_bits = folded_domain_size.trailing_zeros() as usize;
    let bytes_per_query = domain_bits.div_ceil(8);

    let challenge_bytes = arthur.fill_challenge_bytes(b, bytes_per_query * num_queries);
    let zero = b.zero();
    for query in 0..num_queries {
        let chunk = &challenge_bytes[query * bytes_per_query..][..bytes_per_query];
        let value = combine_bytes_be(b, chunk);
        let value_bits = b.to_binary(&value, bytes_per_query * 8);
        let index = b.from_binary(&value_bits[..domain_bits]);

        // Subset check: the derived index must be one of the opened leaves.
        let mut membership = b.one();
        for leaf in leaf_index_wires {
            let diff = b.sub(&index, leaf);
            membership = b.mul(&membership, &diff);
        }
        b.assert_is_equal(&membership, &zero);
    }

    Ok(leaf_index_wires
        .iter()
        .map(|leaf| exp_with_constant_base(b, exp_domain_gen, leaf))
        .collect())
}

/// Fold every opened coset at the round's folding randomness.
fn compute_fold<B: Builder>(
    b: &mut B,
    leaves: &[Vec<B::Var>],
    folding_randomness: &[B::Var],
) -> Result<Vec<B::Var>, VerifierError> {
    let expected = 1usize << folding_randomness.len();
    leaves
        .iter()
        .map(|coset| {
            if coset.len() != expected {
                return Err(FiatShamirError::PatternMismatch {
                    expected: format!("coset of {expected} scalar(s)"),
                    found: format!("coset of {} scalar(s)", coset.len()),
                }
                .into());
            }
            Ok(eval_multilinear_evals(b, coset, folding_randomness))
        })
        .collect()
}

struct InitialSumcheckData<V> {
    ood_queries: Vec<V>,
    combination_randomness: Vec<V>,
}

struct MainRoundData<V> {
    ood_points: Vec<Vec<V>>,
    stir_points: Vec<Vec<V>>,
    combination_randomness: Vec<Vec<V>>,
}

impl<V> Default for MainRoundData<V> {
    fn default() -> Self {
        Self {
            ood_points: Vec::new(),
            stir_points: Vec::new(),
            combination_randomness: Vec::new(),
        }
    }
}

/// Verify one WHIR opening. Returns the total folding randomness, reversed so
/// that the innermost sum-check variable comes first.
pub fn run_whir<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    params: &WhirParams,
    commitment: &WhirCommitment<B::Var>,
    merkle: &MerkleRounds<B::Var>,
    claims: &EvaluationClaims<B::Var>,
) -> Result<Vec<B::Var>, VerifierError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    // The commitment round authenticates against the root read by the caller.
    verify_merkle_round(b, arthur, merkle.round(0), &commitment.root);

    // Initial combination of OOD answers and statement claims.
    let m = params.commitment_ood_samples
        + claims.linear_statement_evaluations.len()
        + claims.evaluation_claims.len();
    let initial_combination = combination_randomness(b, arthur, m);
    let combined_claims: Vec<B::Var> = commitment
        .ood_answers
        .iter()
        .chain(&claims.linear_statement_evaluations)
        .chain(&claims.evaluation_claims)
        .cloned()
        .collect();
    let mut last_eval = dot_product(b, &initial_combination, &combined_claims);

    let (initial_randomness, reduced) = verify_sumcheck_rounds(
        b,
        arthur,
        &last_eval,
        params.folding_factors[0],
        3,
        PolynomialForm::Evaluations,
    )?;
    last_eval = reduced;

    let initial_data = InitialSumcheckData {
        ood_queries: commitment.ood_points.clone(),
        combination_randomness: initial_combination,
    };

    let mut computed_fold = compute_fold(b, &merkle.round(0).leaves, &initial_randomness)?;
    let mut total_folding_randomness = initial_randomness;

    let mut exp_domain_gen = params
        .starting_domain_generator
        .pow([1u64 << params.folding_factors[0]]);
    let mut domain_size = params.domain_size;

    let mut main_rounds = MainRoundData::default();

    for r in 0..params.n_rounds {
        let round_root = arthur
            .fill_next_scalars(b, 1)?
            .pop()
            .expect("one root scalar");
        verify_merkle_round(b, arthur, merkle.round(r + 1), &round_root);

        let (ood_points, ood_answers) = read_ood(b, arthur, params.ood_samples[r])?;
        main_rounds.ood_points.push(ood_points);

        run_pow(b, arthur, params.pow_bits[r])?;

        let stir_points = stir_challenge_points(
            b,
            arthur,
            params.num_queries[r],
            &merkle.round(r).leaf_index_wires,
            domain_size,
            exp_domain_gen,
            params.folding_factors[r],
        )?;
        main_rounds.stir_points.push(stir_points);

        let combination = combination_randomness(
            b,
            arthur,
            merkle.round(r).leaf_index_wires.len() + params.ood_samples[r],
        );

        // Fold the new claims into the running sum.
        let shifted: Vec<B::Var> = ood_answers
            .iter()
            .chain(&computed_fold)
            .cloned()
            .collect();
        let shift = dot_product(b, &shifted, &combination);
        last_eval = b.add(&last_eval, &shift);
        main_rounds.combination_randomness.push(combination);

        let (round_randomness, reduced) = verify_sumcheck_rounds(
            b,
            arthur,
            &last_eval,
            params.folding_factors[r],
            3,
            PolynomialForm::Evaluations,
        )?;
        last_eval = reduced;

        computed_fold = compute_fold(b, &merkle.round(r + 1).leaves, &round_randomness)?;
        total_folding_randomness.extend(round_randomness);

        domain_size /= 2;
        exp_domain_gen.square_in_place();
    }

    // Final round: the polynomial arrives in the clear, as coefficients.
    let final_coefficients = arthur.fill_next_scalars(b, 1 << params.final_sumcheck_rounds)?;

    run_pow(b, arthur, params.final_pow_bits)?;

    let final_points = stir_challenge_points(
        b,
        arthur,
        params.final_queries,
        &merkle.round(params.n_rounds).leaf_index_wires,
        domain_size,
        exp_domain_gen,
        params.folding_factors[params.n_rounds],
    )?;

    for (fold, point) in computed_fold.iter().zip(&final_points) {
        let evaluated = eval_univariate(b, &final_coefficients, point);
        b.assert_is_equal(fold, &evaluated);
    }

    let (final_randomness, reduced) = verify_sumcheck_rounds(
        b,
        arthur,
        &last_eval,
        params.final_sumcheck_rounds,
        3,
        PolynomialForm::Evaluations,
    )?;
    last_eval = reduced;

    total_folding_randomness.extend(final_randomness.clone());
    total_folding_randomness.reverse();

    let weight = compute_w_poly(
        b,
        params,
        &initial_data,
        &main_rounds,
        &total_folding_randomness,
        claims,
    );
    let final_value = eval_multilinear_coeffs(b, &final_coefficients, &final_randomness);
    let expected = b.mul(&weight, &final_value);
    b.assert_is_equal(&last_eval, &expected);

    Ok(total_folding_randomness)
}

/// Reconstruct the expected value of the sum-checked weight polynomial at the
/// total folding randomness.
///
/// Initial constraints (OOD queries, deferred linear statements, evaluation
/// points) are taken over all `num_variables`; each main round's constraints
/// live on a domain shrunk by that round's folding factor and see only the
/// matching prefix of the randomness.
fn compute_w_poly<B: Builder>(
    b: &mut B,
    params: &WhirParams,
    initial: &InitialSumcheckData<B::Var>,
    main_rounds: &MainRoundData<B::Var>,
    total_folding_randomness: &[B::Var],
    claims: &EvaluationClaims<B::Var>,
) -> B::Var {
    let mut num_variables = params.num_variables;
    let mut value = b.zero();

    let mut comb = initial.combination_randomness.iter();
    for query in &initial.ood_queries {
        let coeff = comb.next().expect("combination covers OOD queries");
        let point = expand_from_univariate(b, query, num_variables);
        let eq = eval_eq(b, &point, total_folding_randomness);
        let term = b.mul(coeff, &eq);
        value = b.add(&value, &term);
    }
    for deferred in &claims.linear_statement_values_at_points {
        let coeff = comb.next().expect("combination covers linear statements");
        let term = b.mul(coeff, deferred);
        value = b.add(&value, &term);
    }
    for point in &claims.evaluation_points {
        let coeff = comb.next().expect("combination covers evaluation points");
        let eq = eval_eq(b, total_folding_randomness, point);
        let term = b.mul(coeff, &eq);
        value = b.add(&value, &term);
    }

    for r in 0..main_rounds.ood_points.len() {
        num_variables -= params.folding_factors[r];
        let points: Vec<B::Var> = main_rounds.ood_points[r]
            .iter()
            .chain(&main_rounds.stir_points[r])
            .cloned()
            .collect();
        let mut round_sum = b.zero();
        for (point, coeff) in points.iter().zip(&main_rounds.combination_randomness[r]) {
            let expanded = expand_from_univariate(b, point, num_variables);
            let eq = eval_eq(b, &expanded, &total_folding_randomness[..num_variables]);
            let term = b.mul(&eq, coeff);
            round_sum = b.add(&round_sum, &term);
        }
        value = b.add(&value, &round_sum);
    }

    value
}
