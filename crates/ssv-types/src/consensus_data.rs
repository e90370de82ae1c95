//! Minimal, role-specific beacon-chain payload types.
//!
//! The beacon node and its full SSZ type system are external collaborators
//! (see the engine's top-level specification, §6): these structs carry only
//! the fields the duty runner and QBFT value-check actually inspect.

use crate::duty::Duty;
use ethereum_ssz::{Decode as _, Encode as _};
use ethereum_ssz_derive::{Decode, Encode};
use tree_hash::TreeHash as _;
use tree_hash_derive::TreeHash;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct Checkpoint {
    pub epoch: u64,
    pub root: [u8; 32],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct AttestationData {
    pub slot: u64,
    pub index: u64,
    pub beacon_block_root: [u8; 32],
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct Attestation {
    pub aggregation_bits: Vec<bool>,
    pub data: AttestationData,
    pub signature: [u8; 96],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconBlockHeader {
    pub slot: u64,
    pub proposer_index: u64,
    pub parent_root: [u8; 32],
    pub state_root: [u8; 32],
    pub body_root: [u8; 32],
    /// Commitment to whatever graffiti and randao reveal the proposer used;
    /// kept as an opaque root since block body construction is external.
    pub body_reveal_root: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct SignedBeaconBlock {
    pub header: BeaconBlockHeader,
    pub signature: [u8; 96],
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct AggregateAndProof {
    pub aggregator_index: u64,
    pub aggregate: Attestation,
    pub selection_proof: [u8; 96],
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct SignedAggregateAndProof {
    pub message: AggregateAndProof,
    pub signature: [u8; 96],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct SyncCommitteeMessage {
    pub slot: u64,
    pub beacon_block_root: [u8; 32],
    pub validator_index: u64,
    pub signature: [u8; 96],
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct SyncCommitteeContribution {
    pub slot: u64,
    pub beacon_block_root: [u8; 32],
    pub subcommittee_index: u64,
    pub aggregation_bits: Vec<bool>,
    pub signature: [u8; 96],
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct ContributionAndProof {
    pub aggregator_index: u64,
    pub contribution: SyncCommitteeContribution,
    pub selection_proof: [u8; 96],
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct SignedContributionAndProof {
    pub message: ContributionAndProof,
    pub signature: [u8; 96],
}

/// The per-role payload carried by a [`ConsensusData`].
///
/// Exactly one variant is populated, matching `duty.role`; which one is
/// enforced by the role's value-check function, not by this type itself
/// (mirroring the source's single flat struct with role-specific optional
/// fields, but made exhaustive so callers can't forget a role).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DutyPayload {
    Attestation(AttestationData),
    Block(BeaconBlockHeader),
    SyncCommitteeRoot([u8; 32]),
    AggregateAndProof(AggregateAndProof),
    /// One payload per subcommittee index the validator must contribute to.
    SyncCommitteeContributions(Vec<SyncCommitteeContribution>),
}

/// Wire selector for each [`DutyPayload`] variant, also used as the SSZ
/// union selector byte mixed into the variant's hash-tree root.
const PAYLOAD_SELECTOR_ATTESTATION: u8 = 0;
const PAYLOAD_SELECTOR_BLOCK: u8 = 1;
const PAYLOAD_SELECTOR_SYNC_COMMITTEE_ROOT: u8 = 2;
const PAYLOAD_SELECTOR_AGGREGATE_AND_PROOF: u8 = 3;
const PAYLOAD_SELECTOR_SYNC_COMMITTEE_CONTRIBUTIONS: u8 = 4;

impl ethereum_ssz::Encode for DutyPayload {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_fixed_len() -> usize {
        ethereum_ssz::BYTES_PER_LENGTH_OFFSET
    }

    fn ssz_bytes_len(&self) -> usize {
        1 + match self {
            DutyPayload::Attestation(v) => v.ssz_bytes_len(),
            DutyPayload::Block(v) => v.ssz_bytes_len(),
            DutyPayload::SyncCommitteeRoot(v) => v.ssz_bytes_len(),
            DutyPayload::AggregateAndProof(v) => v.ssz_bytes_len(),
            DutyPayload::SyncCommitteeContributions(v) => v.ssz_bytes_len(),
        }
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        let (selector, bytes) = match self {
            DutyPayload::Attestation(v) => (PAYLOAD_SELECTOR_ATTESTATION, v.as_ssz_bytes()),
            DutyPayload::Block(v) => (PAYLOAD_SELECTOR_BLOCK, v.as_ssz_bytes()),
            DutyPayload::SyncCommitteeRoot(v) => (PAYLOAD_SELECTOR_SYNC_COMMITTEE_ROOT, v.as_ssz_bytes()),
            DutyPayload::AggregateAndProof(v) => (PAYLOAD_SELECTOR_AGGREGATE_AND_PROOF, v.as_ssz_bytes()),
            DutyPayload::SyncCommitteeContributions(v) => (PAYLOAD_SELECTOR_SYNC_COMMITTEE_CONTRIBUTIONS, v.as_ssz_bytes()),
        };
        buf.push(selector);
        buf.extend_from_slice(&bytes);
    }
}

impl ethereum_ssz::Decode for DutyPayload {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        let (selector, rest) = bytes
            .split_first()
            .ok_or_else(|| ethereum_ssz::DecodeError::BytesInvalid("empty DutyPayload bytes".to_string()))?;
        match *selector {
            PAYLOAD_SELECTOR_ATTESTATION => Ok(DutyPayload::Attestation(AttestationData::from_ssz_bytes(rest)?)),
            PAYLOAD_SELECTOR_BLOCK => Ok(DutyPayload::Block(BeaconBlockHeader::from_ssz_bytes(rest)?)),
            PAYLOAD_SELECTOR_SYNC_COMMITTEE_ROOT => Ok(DutyPayload::SyncCommitteeRoot(<[u8; 32]>::from_ssz_bytes(rest)?)),
            PAYLOAD_SELECTOR_AGGREGATE_AND_PROOF => Ok(DutyPayload::AggregateAndProof(AggregateAndProof::from_ssz_bytes(rest)?)),
            PAYLOAD_SELECTOR_SYNC_COMMITTEE_CONTRIBUTIONS => {
                Ok(DutyPayload::SyncCommitteeContributions(Vec::from_ssz_bytes(rest)?))
            }
            other => Err(ethereum_ssz::DecodeError::BytesInvalid(format!("unknown DutyPayload selector {other}"))),
        }
    }
}

impl tree_hash::TreeHash for DutyPayload {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Container
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("union type is not packable")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("union type is not packable")
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        let (selector, root) = match self {
            DutyPayload::Attestation(v) => (PAYLOAD_SELECTOR_ATTESTATION, v.tree_hash_root()),
            DutyPayload::Block(v) => (PAYLOAD_SELECTOR_BLOCK, v.tree_hash_root()),
            DutyPayload::SyncCommitteeRoot(v) => (PAYLOAD_SELECTOR_SYNC_COMMITTEE_ROOT, v.tree_hash_root()),
            DutyPayload::AggregateAndProof(v) => (PAYLOAD_SELECTOR_AGGREGATE_AND_PROOF, v.tree_hash_root()),
            DutyPayload::SyncCommitteeContributions(v) => {
                (PAYLOAD_SELECTOR_SYNC_COMMITTEE_CONTRIBUTIONS, v.tree_hash_root())
            }
        };
        tree_hash::mix_in_selector(&root, selector).expect("payload selector fits in union range")
    }
}

/// The value proposed and decided on by a QBFT instance: a duty descriptor
/// plus its role-specific payload. Identified by its SSZ-style hash-tree
/// root, computed in `ssv-crypto`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConsensusData {
    pub duty: Duty,
    pub payload: DutyPayload,
}

impl ethereum_ssz::Encode for ConsensusData {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_fixed_len() -> usize {
        ethereum_ssz::BYTES_PER_LENGTH_OFFSET
    }

    fn ssz_bytes_len(&self) -> usize {
        2 * ethereum_ssz::BYTES_PER_LENGTH_OFFSET + self.duty.ssz_bytes_len() + self.payload.ssz_bytes_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        let mut encoder = ethereum_ssz::SszEncoder::container(buf, 2 * ethereum_ssz::BYTES_PER_LENGTH_OFFSET);
        encoder.append(&self.duty);
        encoder.append(&self.payload);
        encoder.finalize();
    }
}

impl ethereum_ssz::Decode for ConsensusData {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        let mut builder = ethereum_ssz::SszDecoderBuilder::new(bytes);
        builder.register_type::<Duty>()?;
        builder.register_type::<DutyPayload>()?;
        let mut decoder = builder.build()?;
        let duty = decoder.decode_next()?;
        let payload = decoder.decode_next()?;
        Ok(Self { duty, payload })
    }
}

impl tree_hash::TreeHash for ConsensusData {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Container
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("struct is not packable")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("struct is not packable")
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        let mut leaves = Vec::with_capacity(2 * 32);
        leaves.extend_from_slice(self.duty.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.payload.tree_hash_root().as_bytes());
        tree_hash::merkle_root(&leaves, 0)
    }
}
