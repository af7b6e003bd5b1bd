//! Constraint-builder seam.
//!
//! The verifier is written against [`Builder`], the interface a circuit
//! compilation backend is expected to provide: field arithmetic, bit
//! decomposition and recomposition, conditional selection, and equality
//! assertions. Wires are opaque; the verifier never inspects values.
//!
//! [`NativeBuilder`] is the reference backend. It evaluates every wire
//! directly over `ark_bn254::Fr` and records failed equalities instead of
//! aborting, mirroring how a compiled circuit surfaces unsatisfiability only
//! when the prover runs: there is no early exit while the circuit is being
//! defined.

use core::fmt;

use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, BigInteger, PrimeField};
use ark_std::{One, Zero};

/// Interface to the circuit compilation backend.
///
/// All arithmetic is over the BN254 scalar field. `to_binary` produces
/// little-endian bits and constrains the input to the requested width;
/// `select` expects a boolean condition wire.
pub trait Builder {
    /// An opaque wire handle.
    type Var: Clone + fmt::Debug;

    /// Introduce a wire carrying a fixed field element.
    fn constant(&mut self, value: Fr) -> Self::Var;

    fn add(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;
    fn sub(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;
    fn mul(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;

    /// `cond * if_true + (1 - cond) * if_false`.
    fn select(&mut self, cond: &Self::Var, if_true: &Self::Var, if_false: &Self::Var)
        -> Self::Var;

    /// Little-endian bit decomposition of width `bits`.
    ///
    /// Constrains the value to fit in `bits` bits.
    fn to_binary(&mut self, value: &Self::Var, bits: usize) -> Vec<Self::Var>;

    /// Recompose little-endian bits into a single wire.
    fn from_binary(&mut self, bits: &[Self::Var]) -> Self::Var;

    /// Constrain two wires to carry the same value.
    fn assert_is_equal(&mut self, a: &Self::Var, b: &Self::Var);

    fn zero(&mut self) -> Self::Var {
        self.constant(Fr::zero())
    }

    fn one(&mut self) -> Self::Var {
        self.constant(Fr::one())
    }

    /// Sum of a slice of wires.
    fn sum(&mut self, vars: &[Self::Var]) -> Self::Var {
        let mut acc = self.zero();
        for v in vars {
            acc = self.add(&acc, v);
        }
        acc
    }
}

/// A failed equality assertion, with the two values that disagreed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedConstraint {
    /// Position among all equality assertions issued so far.
    pub index: usize,
    pub left: Fr,
    pub right: Fr,
}

impl fmt::Display for UnsatisfiedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "assertion #{}: {} != {}",
            self.index, self.left, self.right
        )
    }
}

/// Reference backend: direct evaluation over `Fr`.
#[derive(Debug, Default)]
pub struct NativeBuilder {
    assertions: usize,
    multiplications: usize,
    failures: Vec<UnsatisfiedConstraint>,
}

impl NativeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of equality assertions issued.
    #[must_use]
    pub const fn assertion_count(&self) -> usize {
        self.assertions
    }

    /// Number of multiplication gates issued.
    #[must_use]
    pub const fn multiplication_count(&self) -> usize {
        self.multiplications
    }

    /// All assertions issued so far, with every failure recorded.
    pub fn finish(self) -> Result<CircuitStats, Vec<UnsatisfiedConstraint>> {
        if self.failures.is_empty() {
            Ok(CircuitStats {
                assertions: self.assertions,
                multiplications: self.multiplications,
            })
        } else {
            Err(self.failures)
        }
    }

    fn record_equality(&mut self, left: Fr, right: Fr) {
        if left != right {
            self.failures.push(UnsatisfiedConstraint {
                index: self.assertions,
                left,
                right,
            });
        }
        self.assertions += 1;
    }
}

/// Gate counts of a fully built, satisfied circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitStats {
    pub assertions: usize,
    pub multiplications: usize,
}

impl Builder for NativeBuilder {
    type Var = Fr;

    fn constant(&mut self, value: Fr) -> Fr {
        value
    }

    fn add(&mut self, a: &Fr, b: &Fr) -> Fr {
        *a + *b
    }

    fn sub(&mut self, a: &Fr, b: &Fr) -> Fr {
        *a - *b
    }

    fn mul(&mut self, a: &Fr, b: &Fr) -> Fr {
        self.multiplications += 1;
        *a * *b
    }

    fn select(&mut self, cond: &Fr, if_true: &Fr, if_false: &Fr) -> Fr {
        self.multiplications += 1;
        *cond * (*if_true - *if_false) + *if_false
    }

    fn to_binary(&mut self, value: &Fr, bits: usize) -> Vec<Fr> {
        let le = value.into_bigint().to_bits_le();
        // Width check: bits beyond the requested range must be clear.
        let overflow = le.iter().skip(bits).any(|&b| b);
        let zero = Fr::zero();
        self.record_equality(if overflow { Fr::one() } else { zero }, zero);
        (0..bits)
            .map(|i| {
                if le.get(i).copied().unwrap_or(false) {
                    Fr::one()
                } else {
                    Fr::zero()
                }
            })
            .collect()
    }

    fn from_binary(&mut self, bits: &[Fr]) -> Fr {
        let mut acc = Fr::zero();
        let mut weight = Fr::one();
        for bit in bits {
            acc += *bit * weight;
            weight.double_in_place();
        }
        acc
    }

    fn assert_is_equal(&mut self, a: &Fr, b: &Fr) {
        self.record_equality(*a, *b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_and_select() {
        let mut b = NativeBuilder::new();
        let x = b.constant(Fr::from(7u64));
        let y = b.constant(Fr::from(5u64));
        assert_eq!(b.add(&x, &y), Fr::from(12u64));
        assert_eq!(b.sub(&x, &y), Fr::from(2u64));
        assert_eq!(b.mul(&x, &y), Fr::from(35u64));

        let one = b.one();
        let zero = b.zero();
        assert_eq!(b.select(&one, &x, &y), x);
        assert_eq!(b.select(&zero, &x, &y), y);
    }

    #[test]
    fn binary_round_trip() {
        let mut b = NativeBuilder::new();
        let v = b.constant(Fr::from(0b1011_0010u64));
        let bits = b.to_binary(&v, 8);
        assert_eq!(bits.len(), 8);
        assert_eq!(bits[1], Fr::one());
        assert_eq!(bits[2], Fr::zero());
        let back = b.from_binary(&bits);
        assert_eq!(back, v);
        assert!(b.finish().is_ok());
    }

    #[test]
    fn to_binary_rejects_oversized_value() {
        let mut b = NativeBuilder::new();
        let v = b.constant(Fr::from(300u64));
        let _ = b.to_binary(&v, 8);
        assert!(b.finish().is_err());
    }

    #[test]
    fn failed_assertions_are_collected_not_fatal() {
        let mut b = NativeBuilder::new();
        let x = b.constant(Fr::from(1u64));
        let y = b.constant(Fr::from(2u64));
        b.assert_is_equal(&x, &y);
        // Circuit definition continues past the failure.
        b.assert_is_equal(&x, &x);
        let z = b.constant(Fr::from(3u64));
        b.assert_is_equal(&y, &z);
        let failures = b.finish().unwrap_err();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 0);
        assert_eq!(failures[1].index, 2);
    }

    #[test]
    fn select_with_non_boolean_condition_is_affine() {
        let mut b = NativeBuilder::new();
        let c = b.constant(Fr::from(2u64));
        let t = b.constant(Fr::from(10u64));
        let f = b.constant(Fr::from(4u64));
        // 2 * (10 - 4) + 4
        assert_eq!(b.select(&c, &t, &f), Fr::from(16u64));
    }
}
