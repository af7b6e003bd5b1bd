//! In-circuit polynomial algebra.
//!
//! Everything here operates on wires through the [`Builder`] seam. Multilinear
//! conventions are big-endian throughout: the first coordinate of a point
//! selects the top half of an evaluation (or coefficient) table, and
//! [`expand_from_univariate`] produces `(x^{2^{n-1}}, ..., x^2, x)` so that a
//! coefficient list evaluated multilinearly at the expansion equals its
//! univariate evaluation at `x`.

use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, Field};

use crate::circuit::Builder;

/// The equality polynomial `eq(a, r) = prod_i (a_i r_i + (1-a_i)(1-r_i))`.
///
/// # Panics
/// Panics if the points have different lengths.
pub fn eval_eq<B: Builder>(b: &mut B, a: &[B::Var], r: &[B::Var]) -> B::Var {
    assert_eq!(a.len(), r.len(), "eq points must have equal length");
    let one = b.one();
    let mut acc = one.clone();
    for (ai, ri) in a.iter().zip(r) {
        let both_one = b.mul(ai, ri);
        let na = b.sub(&one, ai);
        let nr = b.sub(&one, ri);
        let both_zero = b.mul(&na, &nr);
        let term = b.add(&both_one, &both_zero);
        acc = b.mul(&acc, &term);
    }
    acc
}

/// Powers of a generator: `(1, g, g^2, ..., g^{n-1})`.
pub fn expand_randomness<B: Builder>(b: &mut B, generator: &B::Var, n: usize) -> Vec<B::Var> {
    let mut out = Vec::with_capacity(n);
    let mut cur = b.one();
    for _ in 0..n {
        out.push(cur.clone());
        cur = b.mul(&cur, generator);
    }
    out
}

/// Univariate point lifted to a multilinear one, big-endian:
/// `(x^{2^{n-1}}, ..., x^4, x^2, x)`.
pub fn expand_from_univariate<B: Builder>(b: &mut B, x: &B::Var, n: usize) -> Vec<B::Var> {
    let mut out = vec![x.clone(); n];
    let mut cur = x.clone();
    for i in (0..n).rev() {
        out[i] = cur.clone();
        cur = b.mul(&cur, &cur);
    }
    out
}

/// `sum_i a_i b_i`.
///
/// # Panics
/// Panics if the slices have different lengths.
pub fn dot_product<B: Builder>(b: &mut B, lhs: &[B::Var], rhs: &[B::Var]) -> B::Var {
    assert_eq!(lhs.len(), rhs.len(), "dot product arity mismatch");
    let mut acc = b.zero();
    for (l, r) in lhs.iter().zip(rhs) {
        let term = b.mul(l, r);
        acc = b.add(&acc, &term);
    }
    acc
}

/// Horner evaluation of a coefficient-form univariate polynomial.
pub fn eval_univariate<B: Builder>(b: &mut B, coeffs: &[B::Var], x: &B::Var) -> B::Var {
    let mut acc = b.zero();
    for coeff in coeffs.iter().rev() {
        acc = b.mul(&acc, x);
        acc = b.add(&acc, coeff);
    }
    acc
}

/// Evaluation of a quadratic given by its values on `{0, 1, 2}`.
///
/// Lagrange form: `p(x) = e0 (x-1)(x-2)/2 - e1 x(x-2) + e2 x(x-1)/2`.
pub fn eval_quadratic_from_evals<B: Builder>(b: &mut B, evals: &[B::Var], x: &B::Var) -> B::Var {
    assert_eq!(evals.len(), 3, "quadratic needs three evaluations");
    let one = b.one();
    let two = b.constant(Fr::from(2u64));
    let half = b.constant(Fr::from(2u64).inverse().expect("2 is invertible"));

    let xm1 = b.sub(x, &one);
    let xm2 = b.sub(x, &two);

    let mut t0 = b.mul(&xm1, &xm2);
    t0 = b.mul(&t0, &half);
    t0 = b.mul(&t0, &evals[0]);

    let mut t1 = b.mul(x, &xm2);
    t1 = b.mul(&t1, &evals[1]);

    let mut t2 = b.mul(x, &xm1);
    t2 = b.mul(&t2, &half);
    t2 = b.mul(&t2, &evals[2]);

    let sum02 = b.add(&t0, &t2);
    b.sub(&sum02, &t1)
}

/// Multilinear evaluation of a table of hypercube evaluations, big-endian.
///
/// # Panics
/// Panics unless `evals.len() == 2^point.len()`.
pub fn eval_multilinear_evals<B: Builder>(
    b: &mut B,
    evals: &[B::Var],
    point: &[B::Var],
) -> B::Var {
    assert_eq!(
        evals.len(),
        1 << point.len(),
        "evaluation table must match point arity"
    );
    let mut table = evals.to_vec();
    for coord in point {
        let half = table.len() / 2;
        let (lo, hi) = table.split_at(half);
        table = lo
            .iter()
            .zip(hi)
            .map(|(l, h)| {
                let diff = b.sub(h, l);
                let shift = b.mul(coord, &diff);
                b.add(l, &shift)
            })
            .collect();
    }
    table.pop().expect("folded to a single value")
}

/// Multilinear evaluation of a coefficient table, big-endian: coefficient `j`
/// weights the monomial whose variable set is the binary expansion of `j`
/// (most significant bit first).
pub fn eval_multilinear_coeffs<B: Builder>(
    b: &mut B,
    coeffs: &[B::Var],
    point: &[B::Var],
) -> B::Var {
    assert_eq!(
        coeffs.len(),
        1 << point.len(),
        "coefficient table must match point arity"
    );
    let mut table = coeffs.to_vec();
    for coord in point {
        let half = table.len() / 2;
        let (lo, hi) = table.split_at(half);
        table = lo
            .iter()
            .zip(hi)
            .map(|(l, h)| {
                let shift = b.mul(coord, h);
                b.add(l, &shift)
            })
            .collect();
    }
    table.pop().expect("folded to a single value")
}

/// Address synthesized from grand-product randomness: the last coordinate is
/// the low bit, so `adr(r) = sum_i 2^i r_{k-1-i}`.
pub fn calculate_adr<B: Builder>(b: &mut B, randomness: &[B::Var]) -> B::Var {
    let mut acc = b.zero();
    let mut weight = Fr::from(1u64);
    for coord in randomness.iter().rev() {
        let w = b.constant(weight);
        let term = b.mul(coord, &w);
        acc = b.add(&acc, &term);
        weight.double_in_place();
    }
    acc
}

/// Little-endian recombination of byte wires into a single wire.
pub fn combine_bytes_le<B: Builder>(b: &mut B, bytes: &[B::Var]) -> B::Var {
    let mut acc = b.zero();
    let mut weight = Fr::from(1u64);
    for byte in bytes {
        let w = b.constant(weight);
        let term = b.mul(byte, &w);
        acc = b.add(&acc, &term);
        weight *= Fr::from(256u64);
    }
    acc
}

/// Big-endian recombination, as produced by transcript challenge bytes.
pub fn combine_bytes_be<B: Builder>(b: &mut B, bytes: &[B::Var]) -> B::Var {
    let base = b.constant(Fr::from(256u64));
    let mut acc = b.zero();
    for byte in bytes {
        acc = b.mul(&acc, &base);
        acc = b.add(&acc, byte);
    }
    acc
}
