use core::fmt;
use ethereum_ssz::{Decode as _, Encode as _, SszDecoderBuilder, SszEncoder};
use tree_hash::TreeHash as _;

/// The five beacon-chain duty roles a runner can execute.
///
/// Each role is encoded as an 8-byte big-endian tag when it is embedded in a
/// [`crate::message_id::MessageId`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum BeaconRole {
    Attester,
    Proposer,
    Aggregator,
    SyncCommittee,
    SyncCommitteeContribution,
}

impl BeaconRole {
    /// All roles, in the fixed order used for the wire tag.
    pub const ALL: [BeaconRole; 5] = [
        BeaconRole::Attester,
        BeaconRole::Proposer,
        BeaconRole::Aggregator,
        BeaconRole::SyncCommittee,
        BeaconRole::SyncCommitteeContribution,
    ];

    /// Whether this role requires a pre-consensus signing phase before `executeDuty`
    /// can assemble a [`crate::consensus_data::ConsensusData`].
    pub fn requires_pre_consensus(&self) -> bool {
        matches!(
            self,
            BeaconRole::Proposer | BeaconRole::Aggregator | BeaconRole::SyncCommitteeContribution
        )
    }

    /// The 8-byte big-endian tag used in the wire [`crate::message_id::MessageId`].
    pub fn tag(&self) -> [u8; 8] {
        let discriminant: u64 = match self {
            BeaconRole::Attester => 0,
            BeaconRole::Proposer => 1,
            BeaconRole::Aggregator => 2,
            BeaconRole::SyncCommittee => 3,
            BeaconRole::SyncCommitteeContribution => 4,
        };
        discriminant.to_be_bytes()
    }

    /// Recover a role from its wire tag.
    pub fn from_tag(tag: [u8; 8]) -> Option<Self> {
        match u64::from_be_bytes(tag) {
            0 => Some(BeaconRole::Attester),
            1 => Some(BeaconRole::Proposer),
            2 => Some(BeaconRole::Aggregator),
            3 => Some(BeaconRole::SyncCommittee),
            4 => Some(BeaconRole::SyncCommitteeContribution),
            _ => None,
        }
    }

    /// The raw `u64` discriminant backing [`Self::tag`], used directly by the
    /// SSZ encoding below instead of round-tripping through the byte array.
    fn discriminant(&self) -> u64 {
        u64::from_be_bytes(self.tag())
    }
}

impl ethereum_ssz::Encode for BeaconRole {
    fn is_ssz_fixed_len() -> bool {
        <u64 as ethereum_ssz::Encode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u64 as ethereum_ssz::Encode>::ssz_fixed_len()
    }

    fn ssz_bytes_len(&self) -> usize {
        self.discriminant().ssz_bytes_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        self.discriminant().ssz_append(buf)
    }
}

impl ethereum_ssz::Decode for BeaconRole {
    fn is_ssz_fixed_len() -> bool {
        <u64 as ethereum_ssz::Decode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u64 as ethereum_ssz::Decode>::ssz_fixed_len()
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        let discriminant = u64::from_ssz_bytes(bytes)?;
        BeaconRole::from_tag(discriminant.to_be_bytes())
            .ok_or_else(|| ethereum_ssz::DecodeError::BytesInvalid(format!("unknown BeaconRole discriminant {discriminant}")))
    }
}

impl tree_hash::TreeHash for BeaconRole {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        <u64 as tree_hash::TreeHash>::tree_hash_type()
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        self.discriminant().tree_hash_packed_encoding()
    }

    fn tree_hash_packing_factor() -> usize {
        <u64 as tree_hash::TreeHash>::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        self.discriminant().tree_hash_root()
    }
}

impl fmt::Display for BeaconRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BeaconRole::Attester => "ATTESTER",
            BeaconRole::Proposer => "PROPOSER",
            BeaconRole::Aggregator => "AGGREGATOR",
            BeaconRole::SyncCommittee => "SYNC_COMMITTEE",
            BeaconRole::SyncCommitteeContribution => "SYNC_COMMITTEE_CONTRIBUTION",
        };
        write!(f, "{name}")
    }
}

/// A beacon-chain duty assigned to a validator at a given slot.
///
/// Carries every field any of the five roles might need; role-irrelevant
/// fields are simply left at their default by the caller.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Duty {
    pub role: BeaconRole,
    pub validator_index: u64,
    pub slot: u64,

    /// Committee index within the beacon committee (attester duties).
    pub committee_index: u64,
    /// This validator's position within the attesting committee, used to set the
    /// single bit of the submitted attestation's aggregation bitfield.
    pub validator_committee_index: usize,
    /// Size of the attesting committee, i.e. the length of the aggregation bitfield.
    pub committee_length: u64,

    /// Subcommittee (sync committee subnet) indices this validator must act on.
    /// Populated for `SyncCommittee` and `SyncCommitteeContribution` duties; a
    /// validator may sit in more than one subnet.
    pub subcommittee_indices: Vec<u64>,
}

impl Duty {
    /// Epoch containing `slot`, assuming 32 slots per epoch (mainnet parameter).
    pub fn epoch(&self) -> u64 {
        self.slot / 32
    }
}

/// `validator_committee_index` is a `usize` for ergonomic indexing but has no
/// SSZ representation of its own, so it is carried on the wire as a `u64`
/// like every other field here; the container is hand-written rather than
/// derived for that reason.
impl ethereum_ssz::Encode for Duty {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_fixed_len() -> usize {
        ethereum_ssz::BYTES_PER_LENGTH_OFFSET
    }

    fn ssz_bytes_len(&self) -> usize {
        8 + 8 + 8 + 8 + 8 + 8 + ethereum_ssz::BYTES_PER_LENGTH_OFFSET + self.subcommittee_indices.ssz_bytes_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        let validator_committee_index = self.validator_committee_index as u64;
        let mut encoder = ethereum_ssz::SszEncoder::container(buf, 8 + 8 + 8 + 8 + 8 + 8 + ethereum_ssz::BYTES_PER_LENGTH_OFFSET);
        encoder.append(&self.role);
        encoder.append(&self.validator_index);
        encoder.append(&self.slot);
        encoder.append(&self.committee_index);
        encoder.append(&validator_committee_index);
        encoder.append(&self.committee_length);
        encoder.append(&self.subcommittee_indices);
        encoder.finalize();
    }
}

impl ethereum_ssz::Decode for Duty {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        let mut builder = ethereum_ssz::SszDecoderBuilder::new(bytes);
        builder.register_type::<BeaconRole>()?;
        builder.register_type::<u64>()?;
        builder.register_type::<u64>()?;
        builder.register_type::<u64>()?;
        builder.register_type::<u64>()?;
        builder.register_type::<u64>()?;
        builder.register_type::<Vec<u64>>()?;
        let mut decoder = builder.build()?;
        let role = decoder.decode_next()?;
        let validator_index = decoder.decode_next()?;
        let slot = decoder.decode_next()?;
        let committee_index = decoder.decode_next()?;
        let validator_committee_index: u64 = decoder.decode_next()?;
        let committee_length = decoder.decode_next()?;
        let subcommittee_indices = decoder.decode_next()?;
        Ok(Self {
            role,
            validator_index,
            slot,
            committee_index,
            validator_committee_index: validator_committee_index as usize,
            committee_length,
            subcommittee_indices,
        })
    }
}

impl tree_hash::TreeHash for Duty {
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
        let validator_committee_index = self.validator_committee_index as u64;
        let mut leaves = Vec::with_capacity(7 * 32);
        leaves.extend_from_slice(self.role.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.validator_index.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.slot.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.committee_index.tree_hash_root().as_bytes());
        leaves.extend_from_slice(validator_committee_index.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.committee_length.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.subcommittee_indices.tree_hash_root().as_bytes());
        tree_hash::merkle_root(&leaves, 0)
    }
}
