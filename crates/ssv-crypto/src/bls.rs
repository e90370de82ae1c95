//! BLS12-381 signature primitives (min-pk variant: public keys on G1,
//! signatures on G2), built directly on `blstrs`' field/group arithmetic
//! rather than a high-level `min_pk` wrapper, since the share-reconstruction
//! and DKG code in this crate both need raw `Scalar`/`G1Projective` algebra.

use blstrs::{G1Affine, G1Projective, G2Affine, G2Projective, Gt, Scalar};
use ff::Field;
use group::{Curve, Group};
use pairing::{MillerLoopResult, MultiMillerLoop};
use rand::RngCore;

use crate::domain::BLS_CIPHERSUITE_DST;
use crate::error::CryptoError;

/// A single operator's share of a validator's BLS12-381 private key.
#[derive(Clone)]
pub struct SecretKeyShare(Scalar);

impl SecretKeyShare {
    pub fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }

    /// Samples a uniformly random share, used only for standalone testing;
    /// production shares are always DKG outputs (see `ssv-dkg`).
    pub fn random(rng: &mut impl RngCore) -> Self {
        Self(Scalar::random(rng))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes_le()
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let scalar = Scalar::from_bytes_le(bytes);
        if scalar.is_some().into() {
            Ok(Self(scalar.unwrap()))
        } else {
            Err(CryptoError::InvalidSecretKey)
        }
    }

    pub fn public_key_share(&self) -> PublicKeyShare {
        PublicKeyShare((G1Projective::generator() * self.0).to_affine())
    }

    /// Signs `message_root` (already domain-separated by the caller via
    /// `ssv_crypto::domain::signing_root`) by hashing it onto G2 and
    /// multiplying by this share's scalar.
    pub fn sign(&self, message_root: &[u8]) -> Signature {
        let point = hash_to_g2(message_root);
        Signature((point * self.0).to_affine())
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.0
    }
}

/// The public counterpart of a [`SecretKeyShare`], published during DKG so
/// peers can verify individual partial signatures before aggregation.
#[derive(Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PublicKeyShare(#[serde(with = "g1_serde")] G1Affine);

impl PublicKeyShare {
    pub fn to_bytes(&self) -> [u8; 48] {
        self.0.to_compressed()
    }

    pub fn from_bytes(bytes: &[u8; 48]) -> Result<Self, CryptoError> {
        let point = G1Affine::from_compressed(bytes);
        if point.is_some().into() {
            Ok(Self(point.unwrap()))
        } else {
            Err(CryptoError::InvalidPublicKey)
        }
    }

    pub fn point(&self) -> &G1Affine {
        &self.0
    }

    /// Sums a set of public-key shares, used to verify an aggregate
    /// signature produced by distinct signers over the same root (QBFT
    /// Commit quorum), as opposed to combining shares of one key via
    /// `interpolate::interpolate_g1`.
    pub fn aggregate(keys: &[PublicKeyShare]) -> Option<PublicKeyShare> {
        if keys.is_empty() {
            return None;
        }
        let sum = keys
            .iter()
            .fold(G1Projective::identity(), |acc, key| acc + G1Projective::from(key.0));
        Some(PublicKeyShare(sum.to_affine()))
    }
}

impl core::fmt::Debug for PublicKeyShare {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PublicKeyShare({}...)", hex::encode(&self.to_bytes()[..8]))
    }
}

/// A BLS signature (partial share signature, or an aggregated/reconstructed
/// validator signature — the two are indistinguishable on the wire).
#[derive(Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Signature(#[serde(with = "g2_serde")] G2Affine);

impl Signature {
    pub fn to_bytes(&self) -> [u8; 96] {
        self.0.to_compressed()
    }

    pub fn from_bytes(bytes: &[u8; 96]) -> Result<Self, CryptoError> {
        let point = G2Affine::from_compressed(bytes);
        if point.is_some().into() {
            Ok(Self(point.unwrap()))
        } else {
            Err(CryptoError::InvalidSignature)
        }
    }

    /// Verifies this signature over `message_root` against `public_key` via
    /// the pairing equation `e(sig, G1::generator) == e(H(m), pubkey)`.
    pub fn verify(&self, message_root: &[u8], public_key: &G1Affine) -> bool {
        let h = hash_to_g2(message_root).to_affine();
        pairings_equal(&self.0, &G1Affine::from(G1Projective::generator()), &h, public_key)
    }

    /// Aggregates signatures by summing their G2 points. Valid whether the
    /// inputs are partial shares being combined into a reconstruction
    /// candidate, or independent signers' signatures over the same root.
    pub fn aggregate(signatures: &[Signature]) -> Option<Signature> {
        if signatures.is_empty() {
            return None;
        }
        let sum = signatures
            .iter()
            .fold(G2Projective::identity(), |acc, sig| acc + G2Projective::from(sig.0));
        Some(Signature(sum.to_affine()))
    }

    pub fn point(&self) -> &G2Affine {
        &self.0
    }

    pub(crate) fn from_point(point: G2Affine) -> Self {
        Self(point)
    }
}

impl core::fmt::Debug for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.to_bytes()[..8]))
    }
}

/// Checks `e(a1, b1) == e(a2, b2)` via a single multi-Miller-loop, which is
/// cheaper than computing and comparing the two pairings independently.
fn pairings_equal(a1: &G2Affine, b1: &G1Affine, a2: &G2Affine, b2: &G1Affine) -> bool {
    let b1_neg = -G1Projective::from(*b1);
    let terms = [
        (&b1_neg.to_affine(), &blstrs::G2Prepared::from(*a1)),
        (b2, &blstrs::G2Prepared::from(*a2)),
    ];
    let result: Gt = blstrs::Bls12::multi_miller_loop(&terms).final_exponentiation();
    bool::from(result.is_identity())
}

fn hash_to_g2(message: &[u8]) -> G2Projective {
    G2Projective::hash_to_curve(message, BLS_CIPHERSUITE_DST, &[])
}

mod g1_serde {
    use blstrs::G1Affine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(point: &G1Affine, s: S) -> Result<S::Ok, S::Error> {
        hex::serde::serialize(point.to_compressed(), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<G1Affine, D::Error> {
        let bytes: [u8; 48] = hex::serde::deserialize(d)?;
        Option::from(G1Affine::from_compressed(&bytes))
            .ok_or_else(|| serde::de::Error::custom("invalid G1 point encoding"))
    }
}

mod g2_serde {
    use blstrs::G2Affine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(point: &G2Affine, s: S) -> Result<S::Ok, S::Error> {
        hex::serde::serialize(point.to_compressed(), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<G2Affine, D::Error> {
        let bytes: [u8; 96] = hex::serde::deserialize(d)?;
        Option::from(G2Affine::from_compressed(&bytes))
            .ok_or_else(|| serde::de::Error::custom("invalid G2 point encoding"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let mut rng = rand::rngs::OsRng;
        let sk = SecretKeyShare::random(&mut rng);
        let pk = sk.public_key_share();
        let msg = b"attestation-root-00000000000000";
        let sig = sk.sign(msg);
        assert!(sig.verify(msg, pk.point()));
    }

    #[test]
    fn verify_rejects_wrong_message() {
        let mut rng = rand::rngs::OsRng;
        let sk = SecretKeyShare::random(&mut rng);
        let pk = sk.public_key_share();
        let sig = sk.sign(b"message-one---------------------");
        assert!(!sig.verify(b"message-two---------------------", pk.point()));
    }

    #[test]
    fn aggregate_signature_verifies_under_aggregate_public_key() {
        let mut rng = rand::rngs::OsRng;
        let sk1 = SecretKeyShare::random(&mut rng);
        let sk2 = SecretKeyShare::random(&mut rng);
        let msg = b"commit-data-root----------------";
        let sig1 = sk1.sign(msg);
        let sig2 = sk2.sign(msg);
        let agg_sig = Signature::aggregate(&[sig1, sig2]).unwrap();
        let agg_pk = PublicKeyShare::aggregate(&[sk1.public_key_share(), sk2.public_key_share()]).unwrap();
        assert!(agg_sig.verify(msg, agg_pk.point()));
    }

    #[test]
    fn aggregate_of_single_is_identity() {
        let mut rng = rand::rngs::OsRng;
        let sk = SecretKeyShare::random(&mut rng);
        let sig = sk.sign(b"root----------------------------");
        let agg = Signature::aggregate(&[sig]).unwrap();
        assert_eq!(agg, sig);
    }
}
