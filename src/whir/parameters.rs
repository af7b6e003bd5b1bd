//! Runtime WHIR parameters.

use ark_bn254::Fr;

use crate::config::{ConfigError, WhirConfig};

/// Parameters of one WHIR invocation, derived from the JSON config.
#[derive(Debug, Clone)]
pub struct WhirParams {
    pub n_rounds: usize,
    /// Folding factors per round, padded with a trailing copy of the last
    /// entry so that index `n_rounds` always exists.
    pub folding_factors: Vec<usize>,
    pub ood_samples: Vec<usize>,
    pub num_queries: Vec<usize>,
    pub pow_bits: Vec<usize>,
    pub final_queries: usize,
    pub final_pow_bits: usize,
    pub final_folding_pow_bits: usize,
    pub final_sumcheck_rounds: usize,
    /// Generator of the starting evaluation domain.
    pub starting_domain_generator: Fr,
    /// Starting domain size: `2^(n_vars + rate)`.
    pub domain_size: usize,
    pub commitment_ood_samples: usize,
    pub num_variables: usize,
}

impl WhirParams {
    pub fn from_config(cfg: &WhirConfig) -> Result<Self, ConfigError> {
        let n_vars = cfg.n_vars;

        let mut folding_factors = cfg.folding_factor.clone();
        if folding_factors.is_empty() {
            folding_factors = vec![4, 4];
        } else {
            // Pad with a trailing copy so the final round has a factor.
            let last = *folding_factors.last().expect("non-empty");
            folding_factors.push(last);
        }
        let last = *folding_factors.last().expect("non-empty");
        let final_sumcheck_rounds = n_vars % last;

        if folding_factors.len() <= cfg.n_rounds {
            return Err(ConfigError::Mismatch(format!(
                "{} folding factors cannot cover {} rounds",
                folding_factors.len(),
                cfg.n_rounds
            )));
        }
        for (name, len) in [
            ("ood_samples", cfg.ood_samples.len()),
            ("num_queries", cfg.num_queries.len()),
            ("pow_bits", cfg.pow_bits.len()),
        ] {
            if len < cfg.n_rounds {
                return Err(ConfigError::Mismatch(format!(
                    "{name} has {len} entries for {} rounds",
                    cfg.n_rounds
                )));
            }
        }

        // Every variable must be folded exactly once: the initial sum-check
        // takes the first factor, each round takes its own, and the final
        // sum-check covers the remainder.
        let folded = folding_factors[0]
            + folding_factors[..cfg.n_rounds].iter().sum::<usize>()
            + final_sumcheck_rounds;
        if folded != n_vars {
            return Err(ConfigError::Mismatch(format!(
                "folding schedule covers {folded} of {n_vars} variables"
            )));
        }

        let starting_domain_generator = crate::config::parse_scalar(&cfg.domain_generator)?;

        Ok(Self {
            n_rounds: cfg.n_rounds,
            folding_factors,
            ood_samples: cfg.ood_samples.clone(),
            num_queries: cfg.num_queries.clone(),
            pow_bits: cfg.pow_bits.clone(),
            final_queries: cfg.final_queries,
            final_pow_bits: cfg.final_pow_bits,
            final_folding_pow_bits: cfg.final_folding_pow_bits,
            final_sumcheck_rounds,
            starting_domain_generator,
            domain_size: 1 << (n_vars + cfg.rate),
            commitment_ood_samples: 1,
            num_variables: n_vars,
        })
    }
}
