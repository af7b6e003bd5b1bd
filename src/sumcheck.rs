//! Univariate-round sum-check verification.
//!
//! One helper serves every sum-check in the protocol; only the polynomial
//! representation differs per call site. WHIR rounds send quadratics as
//! evaluations on `{0, 1, 2}`; the Spartan outer, Spark, and grand-product
//! rounds send cubics as four coefficients.

use crate::{
    circuit::Builder,
    crypto::sponge::CircuitSponge,
    fiat_shamir::{errors::FiatShamirError, Arthur},
    poly::{eval_quadratic_from_evals, eval_univariate},
};

/// How a round polynomial's scalars are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolynomialForm {
    /// Low-to-high coefficients.
    Coefficients,
    /// Values on `{0, 1, 2}` (quadratics only).
    Evaluations,
}

/// Evaluate one round polynomial at `x` under the given representation.
pub fn eval_round_polynomial<B: Builder>(
    b: &mut B,
    values: &[B::Var],
    x: &B::Var,
    form: PolynomialForm,
) -> B::Var {
    match form {
        PolynomialForm::Coefficients => eval_univariate(b, values, x),
        PolynomialForm::Evaluations => eval_quadratic_from_evals(b, values, x),
    }
}

/// `p(0) + p(1)` under the given representation.
fn sum_over_boolean_domain<B: Builder>(
    b: &mut B,
    values: &[B::Var],
    form: PolynomialForm,
) -> B::Var {
    match form {
        // p(0) = c0 and p(1) = c0 + c1 + ... + cd.
        PolynomialForm::Coefficients => {
            let all = b.sum(values);
            b.add(&values[0], &all)
        }
        PolynomialForm::Evaluations => b.add(&values[0], &values[1]),
    }
}

/// Verify `rounds` sum-check rounds against `claim`.
///
/// Per round: read a `degree`-scalar polynomial, assert
/// `p(0) + p(1) == claim`, squeeze a challenge `r`, and reduce the claim to
/// `p(r)`. Returns the challenges in round order together with the final
/// reduced claim.
pub fn verify_sumcheck_rounds<B, S>(
    b: &mut B,
    arthur: &mut Arthur<S>,
    claim: &B::Var,
    rounds: usize,
    degree: usize,
    form: PolynomialForm,
) -> Result<(Vec<B::Var>, B::Var), FiatShamirError>
where
    B: Builder,
    S: CircuitSponge<B>,
{
    let mut claim = claim.clone();
    let mut randomness = Vec::with_capacity(rounds);
    for _ in 0..rounds {
        let polynomial = arthur.fill_next_scalars(b, degree)?;
        let over_boolean = sum_over_boolean_domain(b, &polynomial, form);
        b.assert_is_equal(&over_boolean, &claim);
        let r = arthur
            .fill_challenge_scalars(b, 1)
            .pop()
            .expect("one challenge");
        claim = eval_round_polynomial(b, &polynomial, &r, form);
        randomness.push(r);
    }
    Ok((randomness, claim))
}
