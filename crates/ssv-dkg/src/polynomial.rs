//! Degree-`(t-1)` secret-sharing polynomials over the BLS12-381 scalar
//! field, and their Pedersen commitments.

use blstrs::{G1Projective, Scalar};
use ff::Field;
use group::{Group, Curve};
use rand::RngCore;

/// A random polynomial `f(x) = c_0 + c_1*x + ... + c_{t-1}*x^{t-1}`, whose
/// constant term `c_0` is this participant's contribution to the shared
/// secret (spec §4.5 round 1).
pub struct Polynomial {
    coefficients: Vec<Scalar>,
}

impl Polynomial {
    /// Samples a polynomial of degree `threshold - 1` uniformly at random.
    pub fn sample(rng: &mut impl RngCore, threshold: usize) -> Self {
        let coefficients = (0..threshold).map(|_| Scalar::random(&mut *rng)).collect();
        Self { coefficients }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn constant_term(&self) -> Scalar {
        self.coefficients[0]
    }

    /// Evaluates the polynomial at `x`, e.g. the share dealt to operator `x`.
    pub fn eval(&self, x: Scalar) -> Scalar {
        let mut acc = Scalar::ZERO;
        let mut power = Scalar::ONE;
        for c in &self.coefficients {
            acc += *c * power;
            power *= x;
        }
        acc
    }

    /// Pedersen-style commitment to every coefficient: `[g^c_0, ..., g^c_{t-1}]`.
    pub fn commit(&self) -> Vec<G1Projective> {
        self.coefficients.iter().map(|c| G1Projective::generator() * c).collect()
    }
}

/// Evaluates a committed polynomial "in the exponent" at `x`:
/// `prod_l(C_l^{x^l})`, used to verify a dealt share without learning the
/// polynomial's coefficients.
pub fn eval_commitment(commitments: &[G1Projective], x: Scalar) -> G1Projective {
    let mut acc = G1Projective::identity();
    let mut power = Scalar::ONE;
    for c in commitments {
        acc += *c * power;
        power *= x;
    }
    acc
}

/// `g^share`, compared against [`eval_commitment`] to verify a received
/// share in round 3.
pub fn commit_scalar(share: Scalar) -> G1Projective {
    G1Projective::generator() * share
}

pub fn affine(point: G1Projective) -> blstrs::G1Affine {
    point.to_affine()
}
