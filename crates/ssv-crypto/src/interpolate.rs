//! Lagrange interpolation at `x = 0` over `OperatorId`-indexed points.
//!
//! Shared by two consumers: `ssv-partial-sig` reconstructs a validator
//! signature from `t` signature shares by combining them with these
//! coefficients in the G2 exponent; `ssv-dkg` uses the same coefficients
//! (over secret-share scalars) to verify a dealt polynomial's constant term
//! during the FROST Verify round.

use std::collections::HashSet;

use blstrs::{G1Projective, G2Projective};
use ff::Field;
use group::{Curve, Group};

use blstrs::Scalar;
use ssv_types::OperatorId;

use crate::bls::Signature;
use crate::error::CryptoError;

fn operator_scalar(id: OperatorId) -> Scalar {
    Scalar::from(id.value())
}

/// Computes the Lagrange coefficient `lambda_i(0)` for each operator in
/// `ids`, the weight by which `f(i)` must be scaled so that
/// `sum(lambda_i * f(i)) == f(0)` for any polynomial `f` of degree `< |ids|`.
pub fn lagrange_coefficients(ids: &[OperatorId]) -> Result<Vec<(OperatorId, Scalar)>, CryptoError> {
    if ids.is_empty() {
        return Err(CryptoError::EmptyInterpolationSet);
    }
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(*id) {
            return Err(CryptoError::DuplicateInterpolationPoint(id.value()));
        }
    }

    let mut coefficients = Vec::with_capacity(ids.len());
    for &i in ids {
        let xi = operator_scalar(i);
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for &j in ids {
            if i == j {
                continue;
            }
            let xj = operator_scalar(j);
            // At x = 0: numerator *= (0 - xj) = -xj, denominator *= (xi - xj).
            numerator *= -xj;
            denominator *= xi - xj;
        }
        let inv_denominator: Scalar = denominator.invert().unwrap();
        coefficients.push((i, numerator * inv_denominator));
    }
    Ok(coefficients)
}

/// Reconstructs a group element of G2 at `x = 0` from per-operator points,
/// e.g. combining `t` signature shares into the aggregate signature.
pub fn interpolate_g2(points: &[(OperatorId, G2Projective)]) -> Result<G2Projective, CryptoError> {
    let ids: Vec<_> = points.iter().map(|(id, _)| *id).collect();
    let coefficients = lagrange_coefficients(&ids)?;
    let mut acc = G2Projective::identity();
    for (id, point) in points {
        let (_, lambda) = coefficients.iter().find(|(cid, _)| cid == id).unwrap();
        acc += *point * lambda;
    }
    Ok(acc)
}

/// Reconstructs a group element of G1 at `x = 0` from per-operator points,
/// used to recover a validator's aggregate public key from its shares.
pub fn interpolate_g1(points: &[(OperatorId, G1Projective)]) -> Result<G1Projective, CryptoError> {
    let ids: Vec<_> = points.iter().map(|(id, _)| *id).collect();
    let coefficients = lagrange_coefficients(&ids)?;
    let mut acc = G1Projective::identity();
    for (id, point) in points {
        let (_, lambda) = coefficients.iter().find(|(cid, _)| cid == id).unwrap();
        acc += *point * lambda;
    }
    Ok(acc)
}

/// Reconstructs a scalar at `x = 0` from per-operator scalar shares, used by
/// DKG's identifiable-abort path to recompute a suspect participant's share
/// from the remaining committee during blame resolution.
pub fn interpolate_scalar(shares: &[(OperatorId, Scalar)]) -> Result<Scalar, CryptoError> {
    let ids: Vec<_> = shares.iter().map(|(id, _)| *id).collect();
    let coefficients = lagrange_coefficients(&ids)?;
    let mut acc = Scalar::ZERO;
    for (id, value) in shares {
        let (_, lambda) = coefficients.iter().find(|(cid, _)| cid == id).unwrap();
        acc += *value * lambda;
    }
    Ok(acc)
}

/// Reconstructs a full validator signature from `t` partial signature shares
/// over the same root, by Lagrange-combining their G2 points at `x = 0`.
/// Used by `ssv-partial-sig::PartialSignatureContainer::reconstruct` so that
/// crate never needs to touch `blstrs` directly.
pub fn reconstruct_signature(shares: &[(OperatorId, Signature)]) -> Result<Signature, CryptoError> {
    let points: Vec<_> = shares.iter().map(|(id, sig)| (*id, G2Projective::from(*sig.point()))).collect();
    let combined = interpolate_g2(&points)?;
    Ok(Signature::from_point(combined.to_affine()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: u64) -> OperatorId {
        OperatorId::new(id)
    }

    /// Builds shares of a random degree-(t-1) polynomial and checks that any
    /// t of them interpolate back to the constant term f(0).
    #[test]
    fn interpolates_scalar_secret() {
        let mut rng = rand::rngs::OsRng;
        let t = 3;
        let secret = Scalar::random(&mut rng);
        let mut coeffs = vec![secret];
        for _ in 1..t {
            coeffs.push(Scalar::random(&mut rng));
        }
        let eval = |x: u64| -> Scalar {
            let x = Scalar::from(x);
            let mut acc = Scalar::ZERO;
            let mut power = Scalar::ONE;
            for c in &coeffs {
                acc += *c * power;
                power *= x;
            }
            acc
        };

        let shares: Vec<_> = (1..=t as u64).map(|id| (op(id), eval(id))).collect();
        let reconstructed = interpolate_scalar(&shares).unwrap();
        assert_eq!(reconstructed, secret);

        // a different t-subset must reconstruct the same secret
        let shares2: Vec<_> = (2..=t as u64 + 1).map(|id| (op(id), eval(id))).collect();
        let reconstructed2 = interpolate_scalar(&shares2).unwrap();
        assert_eq!(reconstructed2, secret);
    }

    #[test]
    fn rejects_duplicate_points() {
        let points = vec![(op(1), Scalar::ONE), (op(1), Scalar::ONE)];
        assert!(interpolate_scalar(&points).is_err());
    }

    #[test]
    fn rejects_empty_set() {
        let points: Vec<(OperatorId, Scalar)> = vec![];
        assert!(interpolate_scalar(&points).is_err());
    }

    /// t-of-n threshold signing: any t shares of a secret dealt via a
    /// degree-(t-1) polynomial reconstruct to the same signature, which
    /// verifies under the combined (interpolated) public key.
    #[test]
    fn reconstructs_signature_from_any_threshold_subset() {
        use crate::bls::SecretKeyShare;

        let mut rng = rand::rngs::OsRng;
        let t = 3usize;
        let secret = Scalar::random(&mut rng);
        let mut coeffs = vec![secret];
        for _ in 1..t {
            coeffs.push(Scalar::random(&mut rng));
        }
        let eval = |x: u64| -> Scalar {
            let x = Scalar::from(x);
            let mut acc = Scalar::ZERO;
            let mut power = Scalar::ONE;
            for c in &coeffs {
                acc += *c * power;
                power *= x;
            }
            acc
        };

        let msg = b"reconstruction-test-root--------";
        let shares_a: Vec<_> = (1..=t as u64)
            .map(|id| (op(id), SecretKeyShare::from_scalar(eval(id)).sign(msg)))
            .collect();
        let shares_b: Vec<_> = (2..=t as u64 + 1)
            .map(|id| (op(id), SecretKeyShare::from_scalar(eval(id)).sign(msg)))
            .collect();

        let sig_a = reconstruct_signature(&shares_a).unwrap();
        let sig_b = reconstruct_signature(&shares_b).unwrap();
        assert_eq!(sig_a, sig_b);

        let validator_sk = SecretKeyShare::from_scalar(secret);
        assert!(sig_a.verify(msg, validator_sk.public_key_share().point()));
    }
}
