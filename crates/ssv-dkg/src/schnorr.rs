//! Schnorr proof of knowledge of a polynomial's constant term, binding the
//! prover's `OperatorID` and the DKG request ID so a proof from one session
//! or one operator can never be replayed onto another (spec §4.5 round 1).

use blstrs::{G1Affine, G1Projective, Scalar};
use ff::Field;
use group::{Curve, Group};
use rand::RngCore;
use sha2::{Digest, Sha512};

use ssv_types::OperatorId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProofOfKnowledge {
    #[serde(with = "g1_serde")]
    r: G1Affine,
    #[serde(with = "scalar_serde")]
    z: Scalar,
}

impl ProofOfKnowledge {
    /// Proves knowledge of `secret` such that `public == g^secret`, binding
    /// `request_id` and `prover` into the Fiat-Shamir challenge.
    pub fn prove(rng: &mut impl RngCore, secret: Scalar, public: G1Affine, request_id: [u8; 32], prover: OperatorId) -> Self {
        let k = Scalar::random(&mut *rng);
        let r = (G1Projective::generator() * k).to_affine();
        let c = challenge(request_id, prover, &r, &public);
        let z = k + c * secret;
        Self { r, z }
    }

    /// Verifies this proof against `public`, `request_id` and `prover`.
    pub fn verify(&self, public: G1Affine, request_id: [u8; 32], prover: OperatorId) -> bool {
        let c = challenge(request_id, prover, &self.r, &public);
        let lhs = G1Projective::generator() * self.z;
        let rhs = G1Projective::from(self.r) + G1Projective::from(public) * c;
        lhs == rhs
    }
}

fn challenge(request_id: [u8; 32], prover: OperatorId, r: &G1Affine, public: &G1Affine) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(b"ssv-dkg-frost-pok");
    hasher.update(request_id);
    hasher.update(prover.value().to_be_bytes());
    hasher.update(r.to_compressed());
    hasher.update(public.to_compressed());
    let digest: [u8; 64] = hasher.finalize().into();
    Scalar::from_bytes_wide(&digest)
}

mod g1_serde {
    use blstrs::G1Affine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(point: &G1Affine, s: S) -> Result<S::Ok, S::Error> {
        hex::serde::serialize(point.to_compressed(), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<G1Affine, D::Error> {
        let bytes: [u8; 48] = hex::serde::deserialize(d)?;
        Option::from(G1Affine::from_compressed(&bytes)).ok_or_else(|| serde::de::Error::custom("invalid G1 point encoding"))
    }
}

mod scalar_serde {
    use blstrs::Scalar;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(scalar: &Scalar, s: S) -> Result<S::Ok, S::Error> {
        hex::serde::serialize(scalar.to_bytes_le(), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Scalar, D::Error> {
        let bytes: [u8; 32] = hex::serde::deserialize(d)?;
        Option::from(Scalar::from_bytes_le(&bytes)).ok_or_else(|| serde::de::Error::custom("invalid scalar encoding"))
    }
}
