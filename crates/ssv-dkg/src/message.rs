//! Wire messages for the three FROST DKG rounds (spec §4.5).

use blstrs::{G1Affine, Scalar};

use ssv_types::OperatorId;

use crate::schnorr::ProofOfKnowledge;

/// Round 1 "Commit": a participant's Pedersen commitment to its secret
/// polynomial's coefficients, plus a proof of knowledge of the constant
/// term so a dishonest dealer cannot claim a public key it cannot later
/// produce a consistent secret share for.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommitMessage {
    pub sender: OperatorId,
    #[serde(with = "g1_vec_serde")]
    pub commitments: Vec<G1Affine>,
    pub proof_of_knowledge: ProofOfKnowledge,
}

impl CommitMessage {
    pub fn degree(&self) -> usize {
        self.commitments.len().saturating_sub(1)
    }

    pub fn constant_term(&self) -> G1Affine {
        self.commitments[0]
    }
}

/// Round 2 "Shares": the secret evaluation `sender`'s polynomial dealt to
/// `recipient`, sent peer-to-peer (never broadcast — this is the actual
/// secret material).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShareMessage {
    pub sender: OperatorId,
    pub recipient: OperatorId,
    #[serde(with = "scalar_serde")]
    pub share: Scalar,
}

/// Round 3 accusation: `accuser` publishes the raw share it received from
/// `accused` so the rest of the committee can verify the mismatch against
/// `accused`'s round-1 commitment and exclude it without trusting the
/// accuser's word alone.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Blame {
    pub accuser: OperatorId,
    pub accused: OperatorId,
    #[serde(with = "scalar_serde")]
    pub disputed_share: Scalar,
}

mod g1_vec_serde {
    use blstrs::G1Affine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(points: &[G1Affine], s: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = points.iter().map(|p| hex::encode(p.to_compressed())).collect();
        encoded.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<G1Affine>, D::Error> {
        let encoded: Vec<String> = Vec::deserialize(d)?;
        encoded
            .into_iter()
            .map(|s| {
                let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
                let bytes: [u8; 48] = bytes.try_into().map_err(|_| serde::de::Error::custom("wrong G1 point length"))?;
                Option::from(G1Affine::from_compressed(&bytes)).ok_or_else(|| serde::de::Error::custom("invalid G1 point encoding"))
            })
            .collect()
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
