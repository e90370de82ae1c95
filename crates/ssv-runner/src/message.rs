//! The partial-signature wire message a runner exchanges during its
//! pre-consensus and post-consensus phases (spec §4.3, §6): JSON-encoded
//! per spec §6, unlike the SSZ-tagged consensus/DKG traffic.

use ssv_types::OperatorId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PartialSigPhase {
    PreConsensus,
    PostConsensus,
}

/// One operator's partial BLS signature over one root, tagged with which
/// container (pre- or post-consensus) it belongs in. A duty runner cannot
/// infer the phase from the root alone since a role's pre- and
/// post-consensus roots are drawn from disjoint but not provably distinct
/// domains (see e.g. `Aggregator`, which signs a slot and later an
/// `AggregateAndProof` root — both 32-byte digests with no shared tag).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PartialSignatureMessage {
    pub phase: PartialSigPhase,
    pub signer: OperatorId,
    pub root: [u8; 32],
    #[serde(with = "hex::serde")]
    pub signature: [u8; 96],
}
