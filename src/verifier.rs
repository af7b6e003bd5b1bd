//! Top-level orchestration: the Spartan outer protocol.
//!
//! [`verify`] parses the IO pattern and transcript, validates the proof shape
//! against the configuration, and builds the full verifier circuit over the
//! reference backend: the outer sum-check of the R1CS relation, the witness
//! opening, and the three Spark instances. Parsing failures surface as typed
//! errors before any circuit work; once circuit construction starts, every
//! failure is an unsatisfiable constraint.

use ark_bn254::Fr;
use ark_std::Zero;
use tracing::instrument;

use crate::{
    circuit::{Builder, CircuitStats, NativeBuilder},
    config::{Config, ConfigError},
    crypto::sponge::{CircuitSponge, KeccakSponge},
    errors::VerifierError,
    fiat_shamir::{splitter::split_transcript, Arthur, IoPattern},
    gpa::MEMORY_CHECK_WHIR_OPENINGS,
    merkle::MerkleRounds,
    poly::eval_eq,
    proof::{HintPool, WhirHints},
    r1cs::{log2_terms, R1cs},
    spark::{run_spark, MatrixArgument, SPARK_WHIR_OPENINGS},
    sumcheck::{verify_sumcheck_rounds, PolynomialForm},
    whir::{read_commitment, run_whir, EvaluationClaims, WhirParams},
};

/// Outcome of a successful verification run.
#[derive(Debug, Clone, Copy)]
pub struct VerificationReport {
    pub stats: CircuitStats,
    /// Bytes of the truncated absorb stream the circuit replays.
    pub public_input_bytes: usize,
}

/// Runtime parameters of every WHIR instance in the protocol.
struct ProtocolParams {
    row: WhirParams,
    col: WhirParams,
    matrices: [WhirParams; 3],
}

impl ProtocolParams {
    fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let row = WhirParams::from_config(&config.whir_config_row)?;
        let col = WhirParams::from_config(&config.whir_config_col)?;
        let matrices = [
            WhirParams::from_config(&config.whir_config_a)?,
            WhirParams::from_config(&config.whir_config_b)?,
            WhirParams::from_config(&config.whir_config_c)?,
        ];
        if row.num_variables != config.log_num_constraints {
            return Err(ConfigError::Mismatch(format!(
                "row commitment covers {} variables but log_num_constraints is {}",
                row.num_variables, config.log_num_constraints
            )));
        }
        if col.num_variables != config.log_num_variables {
            return Err(ConfigError::Mismatch(format!(
                "column commitment covers {} variables but log_num_variables is {}",
                col.num_variables, config.log_num_variables
            )));
        }
        for (m, params) in matrices.iter().enumerate() {
            let log_terms = [
                config.log_a_num_terms,
                config.log_b_num_terms,
                config.log_c_num_terms,
            ][m];
            if params.num_variables != log_terms {
                return Err(ConfigError::Mismatch(format!(
                    "matrix {m} commitment covers {} variables but its term log is {log_terms}",
                    params.num_variables
                )));
            }
        }
        Ok(Self { row, col, matrices })
    }

    /// Merkle-group sizes of every WHIR invocation, in transcript order.
    fn whir_invocation_sizes(&self) -> Vec<usize> {
        let groups = |p: &WhirParams| p.n_rounds + 1;
        let mut sizes = vec![groups(&self.col)];
        for ops in &self.matrices {
            // Sum-check factor openings.
            sizes.extend(std::iter::repeat_n(groups(ops), 3));
            // Row memory-check: final counters, then read and write sets.
            sizes.push(groups(&self.row));
            sizes.extend(std::iter::repeat_n(
                groups(ops),
                MEMORY_CHECK_WHIR_OPENINGS - 1,
            ));
            // Column memory-check.
            sizes.push(groups(&self.col));
            sizes.extend(std::iter::repeat_n(
                groups(ops),
                MEMORY_CHECK_WHIR_OPENINGS - 1,
            ));
        }
        sizes
    }
}

/// Slice the hint pools into one group per WHIR invocation.
fn partition_hints(pool: &HintPool, sizes: &[usize]) -> Result<Vec<WhirHints>, ConfigError> {
    let total: usize = sizes.iter().sum();
    if pool.merkle_paths.len() != total || pool.stir_answers.len() != total {
        return Err(ConfigError::Mismatch(format!(
            "expected {total} Merkle openings, found {} paths and {} answer sets",
            pool.merkle_paths.len(),
            pool.stir_answers.len()
        )));
    }
    let mut groups = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for &size in sizes {
        groups.push(WhirHints {
            paths: pool.merkle_paths[offset..offset + size].to_vec(),
            answers: pool.stir_answers[offset..offset + size].to_vec(),
        });
        offset += size;
    }
    Ok(groups)
}

fn check_arities(config: &Config, r1cs: &R1cs, pool: &HintPool) -> Result<(), ConfigError> {
    let interner = r1cs.interner.decode()?;
    for (matrix, log_terms, name) in [
        (&r1cs.a, config.log_a_num_terms, "A"),
        (&r1cs.b, config.log_b_num_terms, "B"),
        (&r1cs.c, config.log_c_num_terms, "C"),
    ] {
        // Term tables are padded to a power of two; the committed table may
        // be larger than the live term count, never smaller.
        let cells = matrix.cells(&interner)?;
        if log2_terms(cells.len()) > log_terms {
            return Err(ConfigError::Mismatch(format!(
                "matrix {name} has {} terms, which does not fit a 2^{log_terms} table",
                cells.len()
            )));
        }
    }

    if pool.claimed_evaluations.len() != 3 {
        return Err(ConfigError::Mismatch(format!(
            "expected 3 claimed evaluations (Az, Bz, Cz), found {}",
            pool.claimed_evaluations.len()
        )));
    }
    if pool.deferred.len() != 3 {
        return Err(ConfigError::Mismatch(format!(
            "expected 3 deferred weight evaluations, found {}",
            pool.deferred.len()
        )));
    }
    if pool.sumcheck_last_folds.len() != 9 {
        return Err(ConfigError::Mismatch(format!(
            "expected 9 sum-check folds (3 per matrix), found {}",
            pool.sumcheck_last_folds.len()
        )));
    }
    Ok(())
}

/// Verify a proof: parse, validate shape, and build the circuit.
#[instrument(skip_all, fields(transcript_len = config.transcript.len()))]
pub fn verify(config: &Config, r1cs: &R1cs) -> Result<VerificationReport, VerifierError> {
    let pattern = IoPattern::parse(config.io_pattern.as_bytes())?;
    let split = split_transcript(&pattern, &config.transcript)?;

    let params = ProtocolParams::from_config(config)?;
    check_arities(config, r1cs, &split.hints)?;
    let groups = partition_hints(&split.hints, &params.whir_invocation_sizes())?;

    let mut b = NativeBuilder::new();
    let sponge = KeccakSponge::from_io_pattern(config.io_pattern.as_bytes());
    let public_input_bytes = split.absorb_stream.len();
    let mut arthur = Arthur::new(&pattern, split.absorb_stream, sponge);

    let merkle: Vec<MerkleRounds<Fr>> = groups
        .iter()
        .map(|group| MerkleRounds::from_hints(&mut b, group))
        .collect::<Result<_, _>>()?;

    define_circuit(&mut b, &mut arthur, config, &params, &split.hints, &merkle)?;

    b.finish()
        .map(|stats| VerificationReport {
            stats,
            public_input_bytes,
        })
        .map_err(VerifierError::ConstraintUnsatisfied)
}

/// The verifier circuit proper.
fn define_circuit<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    config: &Config,
    params: &ProtocolParams,
    pool: &HintPool,
    merkle: &[MerkleRounds<B::Var>],
) -> Result<(), VerifierError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    let claimed_evaluations: Vec<B::Var> = pool
        .claimed_evaluations
        .iter()
        .map(|s| b.constant(*s))
        .collect();
    let deferred: Vec<B::Var> = pool.deferred.iter().map(|s| b.constant(*s)).collect();
    let last_folds: Vec<B::Var> = pool
        .sumcheck_last_folds
        .iter()
        .map(|s| b.constant(*s))
        .collect();

    // Outer sum-check of the R1CS relation, claim zero.
    let t_rand = arthur.fill_challenge_scalars(b, config.log_num_constraints);
    let zero = b.constant(Fr::zero());
    let (outer_randomness, outer_value) = verify_sumcheck_rounds(
        b,
        arthur,
        &zero,
        config.log_num_constraints,
        4,
        PolynomialForm::Coefficients,
    )?;

    // Witness opening, carrying the three claimed matrix-vector evaluations.
    let witness_commitment = read_commitment(b, arthur, params.col.commitment_ood_samples)?;
    let witness_claims = EvaluationClaims {
        linear_statement_evaluations: claimed_evaluations.clone(),
        linear_statement_values_at_points: deferred.clone(),
        evaluation_claims: Vec::new(),
        evaluation_points: Vec::new(),
    };
    let witness_randomness = run_whir(
        b,
        arthur,
        &params.col,
        &witness_commitment,
        &merkle[0],
        &witness_claims,
    )?;

    // The R1CS relation itself: (Az * Bz - Cz) * eq(r, t) == outer value.
    let az_bz = b.mul(&claimed_evaluations[0], &claimed_evaluations[1]);
    let residual = b.sub(&az_bz, &claimed_evaluations[2]);
    let eq = eval_eq(b, &outer_randomness, &t_rand);
    let relation = b.mul(&residual, &eq);
    b.assert_is_equal(&outer_value, &relation);

    // One Spark instance per matrix.
    for m in 0..3 {
        let log_terms = config.matrix(m).1;
        let matrix = MatrixArgument {
            ops_params: &params.matrices[m],
            row_params: &params.row,
            col_params: &params.col,
            log_num_terms: log_terms,
            claimed_value: deferred[m].clone(),
            last_folds: [
                last_folds[3 * m].clone(),
                last_folds[3 * m + 1].clone(),
                last_folds[3 * m + 2].clone(),
            ],
            r_row: &outer_randomness,
            r_col: &witness_randomness,
        };
        let start = 1 + m * SPARK_WHIR_OPENINGS;
        run_spark(b, arthur, &matrix, &merkle[start..start + SPARK_WHIR_OPENINGS])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WhirConfig;

    fn whir_config(n_vars: usize, n_rounds: usize) -> WhirConfig {
        WhirConfig {
            n_rounds,
            rate: 1,
            n_vars,
            folding_factor: vec![2, 2],
            ood_samples: vec![1; n_rounds],
            num_queries: vec![2; n_rounds],
            pow_bits: vec![0; n_rounds],
            final_queries: 2,
            final_pow_bits: 0,
            final_folding_pow_bits: 0,
            domain_generator: "5".into(),
        }
    }

    fn config() -> Config {
        Config {
            whir_config_row: whir_config(4, 1),
            whir_config_col: whir_config(4, 1),
            whir_config_a: whir_config(2, 0),
            whir_config_b: whir_config(2, 0),
            whir_config_c: whir_config(4, 1),
            log_num_constraints: 4,
            log_num_variables: 4,
            log_a_num_terms: 2,
            log_b_num_terms: 2,
            log_c_num_terms: 4,
            io_pattern: String::new(),
            transcript: Vec::new(),
            transcript_len: 0,
        }
    }

    #[test]
    fn invocation_sizes_cover_the_full_schedule() {
        let params = ProtocolParams::from_config(&config()).unwrap();
        let sizes = params.whir_invocation_sizes();
        // One witness opening plus 17 openings per matrix.
        assert_eq!(sizes.len(), 1 + 3 * SPARK_WHIR_OPENINGS);
        // The one-round witness opening carries two Merkle groups.
        assert_eq!(sizes[0], 2);
        // Matrix A's factor openings are zero-round: one group each.
        assert_eq!(sizes[1], 1);
        // Matrix C has a one-round term-space config: its factor openings
        // carry two groups each.
        assert_eq!(sizes[1 + 2 * SPARK_WHIR_OPENINGS], 2);
        // Row memory-check final counters use the row config (one round).
        assert_eq!(sizes[1 + 3], 2);
    }

    #[test]
    fn mismatched_shape_is_rejected() {
        let mut cfg = config();
        cfg.log_num_constraints = 5;
        assert!(matches!(
            ProtocolParams::from_config(&cfg),
            Err(ConfigError::Mismatch(_))
        ));
    }

    #[test]
    fn partitioning_requires_exact_counts() {
        let pool = HintPool::default();
        assert!(partition_hints(&pool, &[1, 2]).is_err());
        assert!(partition_hints(&pool, &[]).is_ok());
    }
}
