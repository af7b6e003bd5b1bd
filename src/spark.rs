//! Spark: the sparse-matrix evaluation argument, one instance per R1CS
//! matrix.
//!
//! The prover has committed to the matrix in scattered form: `row`, `col`,
//! and `val` over the term index space, the equality lookups
//! `e_rx = eq(r_x, row(.))` and `e_ry = eq(r_y, col(.))`, and the
//! read/final counters of both access patterns. The verifier checks a
//! term-space sum-check whose final value factors as `val * e_rx * e_ry`,
//! opens the three factors, and then runs an offline memory-check per access
//! pattern to tie the equality lookups back to the claimed evaluation point.

use crate::{
    circuit::Builder,
    crypto::sponge::CircuitSponge,
    errors::VerifierError,
    fiat_shamir::{errors::FiatShamirError, Arthur},
    gpa::{offline_memory_check, MemorySide, MEMORY_CHECK_WHIR_OPENINGS},
    merkle::MerkleRounds,
    sumcheck::{verify_sumcheck_rounds, PolynomialForm},
    whir::{read_commitment, run_whir, EvaluationClaims, WhirCommitment, WhirParams},
};

/// The nine per-matrix commitments, in transcript order.
#[derive(Debug, Clone)]
pub struct SparkCommitments<V> {
    pub row: WhirCommitment<V>,
    pub col: WhirCommitment<V>,
    pub val: WhirCommitment<V>,
    pub e_rx: WhirCommitment<V>,
    pub e_ry: WhirCommitment<V>,
    pub read_ts_row: WhirCommitment<V>,
    pub read_ts_col: WhirCommitment<V>,
    pub final_cts_row: WhirCommitment<V>,
    pub final_cts_col: WhirCommitment<V>,
}

/// Read the nine commitment roots and their out-of-domain bindings.
pub fn read_spark_commitments<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    ops_params: &WhirParams,
    row_params: &WhirParams,
    col_params: &WhirParams,
) -> Result<SparkCommitments<B::Var>, FiatShamirError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    let ops = ops_params.commitment_ood_samples;
    Ok(SparkCommitments {
        row: read_commitment(b, arthur, ops)?,
        col: read_commitment(b, arthur, ops)?,
        val: read_commitment(b, arthur, ops)?,
        e_rx: read_commitment(b, arthur, ops)?,
        e_ry: read_commitment(b, arthur, ops)?,
        read_ts_row: read_commitment(b, arthur, ops)?,
        read_ts_col: read_commitment(b, arthur, ops)?,
        final_cts_row: read_commitment(b, arthur, row_params.commitment_ood_samples)?,
        final_cts_col: read_commitment(b, arthur, col_params.commitment_ood_samples)?,
    })
}

/// One matrix's instance of the argument.
pub struct MatrixArgument<'a, V> {
    /// Term-space WHIR parameters (`2^log_num_terms` entries).
    pub ops_params: &'a WhirParams,
    /// Row-space WHIR parameters (`2^log_num_constraints` cells).
    pub row_params: &'a WhirParams,
    /// Column-space WHIR parameters (`2^log_num_variables` cells).
    pub col_params: &'a WhirParams,
    pub log_num_terms: usize,
    /// The claimed matrix evaluation `<M, eq(r_x, .) ⊗ eq(r_y, .)>`, bound by
    /// the outer opening's deferred weight evaluations.
    pub claimed_value: V,
    /// The prover's final folded operands: `val`, `e_rx`, `e_ry` at the
    /// sum-check randomness.
    pub last_folds: [V; 3],
    /// Row-space evaluation point (`r_outer`).
    pub r_row: &'a [V],
    /// Column-space evaluation point (the witness-opening randomness).
    pub r_col: &'a [V],
}

/// WHIR openings one Spark instance consumes, in transcript order: the three
/// sum-check factors, then the row and column memory-checks.
pub const SPARK_WHIR_OPENINGS: usize = 3 + 2 * MEMORY_CHECK_WHIR_OPENINGS;

/// Verify one matrix's Spark argument.
pub fn run_spark<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    matrix: &MatrixArgument<'_, B::Var>,
    merkle_groups: &[MerkleRounds<B::Var>],
) -> Result<(), VerifierError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    assert_eq!(
        merkle_groups.len(),
        SPARK_WHIR_OPENINGS,
        "one Merkle group per Spark opening"
    );

    let commitments = read_spark_commitments(
        b,
        arthur,
        matrix.ops_params,
        matrix.row_params,
        matrix.col_params,
    )?;

    // Term-space sum-check of val(t) * e_rx(t) * e_ry(t).
    let (sumcheck_randomness, last_value) = verify_sumcheck_rounds(
        b,
        arthur,
        &matrix.claimed_value,
        matrix.log_num_terms,
        4,
        PolynomialForm::Coefficients,
    )?;

    let partial = b.mul(&matrix.last_folds[0], &matrix.last_folds[1]);
    let folds_product = b.mul(&partial, &matrix.last_folds[2]);
    b.assert_is_equal(&last_value, &folds_product);

    // Open each factor at the sum-check randomness.
    for (group, (commitment, claim)) in merkle_groups[..3].iter().zip([
        (&commitments.val, matrix.last_folds[0].clone()),
        (&commitments.e_rx, matrix.last_folds[1].clone()),
        (&commitments.e_ry, matrix.last_folds[2].clone()),
    ]) {
        run_whir(
            b,
            arthur,
            matrix.ops_params,
            commitment,
            group,
            &EvaluationClaims::at_point(sumcheck_randomness.clone(), claim),
        )?;
    }

    // Row access pattern.
    offline_memory_check(
        b,
        arthur,
        &MemorySide {
            r_mem: matrix.r_row,
            log_memory: matrix.row_params.num_variables,
            log_ops: matrix.log_num_terms,
            ops_params: matrix.ops_params,
            cts_params: matrix.row_params,
            addr_commitment: &commitments.row,
            value_commitment: &commitments.e_rx,
            read_ts_commitment: &commitments.read_ts_row,
            final_cts_commitment: &commitments.final_cts_row,
        },
        &merkle_groups[3..3 + MEMORY_CHECK_WHIR_OPENINGS],
    )?;

    // Column access pattern.
    offline_memory_check(
        b,
        arthur,
        &MemorySide {
            r_mem: matrix.r_col,
            log_memory: matrix.col_params.num_variables,
            log_ops: matrix.log_num_terms,
            ops_params: matrix.ops_params,
            cts_params: matrix.col_params,
            addr_commitment: &commitments.col,
            value_commitment: &commitments.e_ry,
            read_ts_commitment: &commitments.read_ts_col,
            final_cts_commitment: &commitments.final_cts_col,
        },
        &merkle_groups[3 + MEMORY_CHECK_WHIR_OPENINGS..],
    )?;

    Ok(())
}
