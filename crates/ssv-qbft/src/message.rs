//! The four QBFT message kinds exchanged within one instance, per spec §4.1.

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};

use ethereum_ssz::{Decode as _, Encode as _};
use ethereum_ssz_derive::{Decode, Encode};
use tree_hash::TreeHash as _;
use tree_hash_derive::TreeHash;

use ssv_types::{ConsensusData, Height, OperatorId, Round, SignedMessage};

/// A justification bundle accompanying a Proposal for `round > Round::FIRST`:
/// a quorum of RoundChange messages for this round, and — if any of them
/// reports a prepared round — the Prepare messages that prepared it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct RoundChangeJustification {
    pub round_changes: Vec<SignedMessage<RoundChangeData>>,
    pub prepares: Vec<SignedMessage<PrepareData>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalData {
    pub height: Height,
    pub round: Round,
    pub value: ConsensusData,
    pub justification: Option<RoundChangeJustification>,
}

impl ProposalData {
    pub fn signing_root(&self, value_root: [u8; 32]) -> [u8; 32] {
        signing_root(b"proposal", self.height, self.round, &value_root)
    }
}

/// `justification` has no native SSZ `Option` support in this codebase, so it
/// is carried as a length-prefixed byte blob that is empty for `None` — safe
/// since even an empty-bodied `RoundChangeJustification` encodes to 8 bytes,
/// never 0.
impl ethereum_ssz::Encode for ProposalData {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_fixed_len() -> usize {
        ethereum_ssz::BYTES_PER_LENGTH_OFFSET
    }

    fn ssz_bytes_len(&self) -> usize {
        let justification_bytes = self.justification.as_ref().map(|j| j.as_ssz_bytes()).unwrap_or_default();
        self.height.ssz_bytes_len()
            + self.round.ssz_bytes_len()
            + 2 * ethereum_ssz::BYTES_PER_LENGTH_OFFSET
            + self.value.ssz_bytes_len()
            + justification_bytes.len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        let justification_bytes: Vec<u8> = self.justification.as_ref().map(|j| j.as_ssz_bytes()).unwrap_or_default();
        let mut encoder =
            ethereum_ssz::SszEncoder::container(buf, 16 + 2 * ethereum_ssz::BYTES_PER_LENGTH_OFFSET);
        encoder.append(&self.height);
        encoder.append(&self.round);
        encoder.append(&self.value);
        encoder.append(&justification_bytes);
        encoder.finalize();
    }
}

impl ethereum_ssz::Decode for ProposalData {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        let mut builder = ethereum_ssz::SszDecoderBuilder::new(bytes);
        builder.register_type::<Height>()?;
        builder.register_type::<Round>()?;
        builder.register_type::<ConsensusData>()?;
        builder.register_type::<Vec<u8>>()?;
        let mut decoder = builder.build()?;
        let height = decoder.decode_next()?;
        let round = decoder.decode_next()?;
        let value = decoder.decode_next()?;
        let justification_bytes: Vec<u8> = decoder.decode_next()?;
        let justification = if justification_bytes.is_empty() {
            None
        } else {
            Some(RoundChangeJustification::from_ssz_bytes(&justification_bytes)?)
        };
        Ok(Self {
            height,
            round,
            value,
            justification,
        })
    }
}

impl tree_hash::TreeHash for ProposalData {
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
        let justification_bytes: Vec<u8> = self.justification.as_ref().map(|j| j.as_ssz_bytes()).unwrap_or_default();
        let mut leaves = Vec::with_capacity(4 * 32);
        leaves.extend_from_slice(self.height.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.round.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.value.tree_hash_root().as_bytes());
        leaves.extend_from_slice(justification_bytes.tree_hash_root().as_bytes());
        tree_hash::merkle_root(&leaves, 0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct PrepareData {
    pub height: Height,
    pub round: Round,
    pub root: [u8; 32],
}

impl PrepareData {
    /// The root an operator signs over: binds height and round to the
    /// proposed value's root so a Prepare can never be replayed across
    /// rounds or heights.
    pub fn signing_root(&self) -> [u8; 32] {
        signing_root(b"prepare", self.height, self.round, &self.root)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct CommitData {
    pub height: Height,
    pub round: Round,
    pub root: [u8; 32],
}

impl CommitData {
    pub fn signing_root(&self) -> [u8; 32] {
        signing_root(b"commit", self.height, self.round, &self.root)
    }
}

fn signing_root(tag: &[u8], height: Height, round: Round, root: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(height.value().to_le_bytes());
    hasher.update(round.value().to_le_bytes());
    hasher.update(root);
    hasher.finalize().into()
}

/// A participant's RoundChange: its last prepared (round, value), if any,
/// together with the Prepare quorum that prepared it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundChangeData {
    pub height: Height,
    pub round: Round,
    pub prepared_round: Option<Round>,
    pub prepared_value: Option<ConsensusData>,
    pub prepare_justification: Vec<SignedMessage<PrepareData>>,
}

impl RoundChangeData {
    /// The root an operator signs over; prepared-value root is folded in
    /// when present so a RoundChange can't be replayed onto a different
    /// prepared claim.
    pub fn signing_root(&self, prepared_value_root: Option<[u8; 32]>) -> [u8; 32] {
        signing_root(
            b"round-change",
            self.height,
            self.round,
            &prepared_value_root.unwrap_or([0u8; 32]),
        )
    }
}

/// `prepared_round` rides a `u64` sentinel (`0` means `None`, valid since
/// `Round::FIRST` is `1`); `prepared_value` rides the same empty-blob
/// sentinel as [`ProposalData::justification`].
impl ethereum_ssz::Encode for RoundChangeData {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_fixed_len() -> usize {
        ethereum_ssz::BYTES_PER_LENGTH_OFFSET
    }

    fn ssz_bytes_len(&self) -> usize {
        let prepared_value_bytes = self.prepared_value.as_ref().map(|v| v.as_ssz_bytes()).unwrap_or_default();
        self.height.ssz_bytes_len()
            + self.round.ssz_bytes_len()
            + 8
            + 2 * ethereum_ssz::BYTES_PER_LENGTH_OFFSET
            + prepared_value_bytes.len()
            + self.prepare_justification.ssz_bytes_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        let prepared_round_sentinel: u64 = self.prepared_round.map(|r| r.value()).unwrap_or(0);
        let prepared_value_bytes: Vec<u8> = self.prepared_value.as_ref().map(|v| v.as_ssz_bytes()).unwrap_or_default();
        let mut encoder =
            ethereum_ssz::SszEncoder::container(buf, 16 + 8 + 2 * ethereum_ssz::BYTES_PER_LENGTH_OFFSET);
        encoder.append(&self.height);
        encoder.append(&self.round);
        encoder.append(&prepared_round_sentinel);
        encoder.append(&prepared_value_bytes);
        encoder.append(&self.prepare_justification);
        encoder.finalize();
    }
}

impl ethereum_ssz::Decode for RoundChangeData {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        let mut builder = ethereum_ssz::SszDecoderBuilder::new(bytes);
        builder.register_type::<Height>()?;
        builder.register_type::<Round>()?;
        builder.register_type::<u64>()?;
        builder.register_type::<Vec<u8>>()?;
        builder.register_type::<Vec<SignedMessage<PrepareData>>>()?;
        let mut decoder = builder.build()?;
        let height = decoder.decode_next()?;
        let round = decoder.decode_next()?;
        let prepared_round_sentinel: u64 = decoder.decode_next()?;
        let prepared_value_bytes: Vec<u8> = decoder.decode_next()?;
        let prepare_justification = decoder.decode_next()?;
        let prepared_round = if prepared_round_sentinel == 0 {
            None
        } else {
            Some(Round::new(prepared_round_sentinel))
        };
        let prepared_value = if prepared_value_bytes.is_empty() {
            None
        } else {
            Some(ConsensusData::from_ssz_bytes(&prepared_value_bytes)?)
        };
        Ok(Self {
            height,
            round,
            prepared_round,
            prepared_value,
            prepare_justification,
        })
    }
}

impl tree_hash::TreeHash for RoundChangeData {
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
        let prepared_round_sentinel: u64 = self.prepared_round.map(|r| r.value()).unwrap_or(0);
        let prepared_value_bytes: Vec<u8> = self.prepared_value.as_ref().map(|v| v.as_ssz_bytes()).unwrap_or_default();
        let mut leaves = Vec::with_capacity(5 * 32);
        leaves.extend_from_slice(self.height.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.round.tree_hash_root().as_bytes());
        leaves.extend_from_slice(prepared_round_sentinel.tree_hash_root().as_bytes());
        leaves.extend_from_slice(prepared_value_bytes.tree_hash_root().as_bytes());
        leaves.extend_from_slice(self.prepare_justification.tree_hash_root().as_bytes());
        tree_hash::merkle_root(&leaves, 0)
    }
}

/// A convenience sum type over the four message kinds, for callers that
/// need to route by kind before dispatching to the `Instance` method that
/// handles each; `Instance` itself exposes one method per kind rather than
/// matching on this internally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QbftMessage {
    Proposal(SignedMessage<ProposalData>),
    Prepare(SignedMessage<PrepareData>),
    Commit(SignedMessage<CommitData>),
    RoundChange(SignedMessage<RoundChangeData>),
}

/// Wire selector for each variant, mixed into the tree-hash root as the SSZ
/// union selector byte.
const MESSAGE_SELECTOR_PROPOSAL: u8 = 0;
const MESSAGE_SELECTOR_PREPARE: u8 = 1;
const MESSAGE_SELECTOR_COMMIT: u8 = 2;
const MESSAGE_SELECTOR_ROUND_CHANGE: u8 = 3;

impl ethereum_ssz::Encode for QbftMessage {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_fixed_len() -> usize {
        ethereum_ssz::BYTES_PER_LENGTH_OFFSET
    }

    fn ssz_bytes_len(&self) -> usize {
        1 + match self {
            QbftMessage::Proposal(m) => m.ssz_bytes_len(),
            QbftMessage::Prepare(m) => m.ssz_bytes_len(),
            QbftMessage::Commit(m) => m.ssz_bytes_len(),
            QbftMessage::RoundChange(m) => m.ssz_bytes_len(),
        }
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        let (selector, bytes) = match self {
            QbftMessage::Proposal(m) => (MESSAGE_SELECTOR_PROPOSAL, m.as_ssz_bytes()),
            QbftMessage::Prepare(m) => (MESSAGE_SELECTOR_PREPARE, m.as_ssz_bytes()),
            QbftMessage::Commit(m) => (MESSAGE_SELECTOR_COMMIT, m.as_ssz_bytes()),
            QbftMessage::RoundChange(m) => (MESSAGE_SELECTOR_ROUND_CHANGE, m.as_ssz_bytes()),
        };
        buf.push(selector);
        buf.extend_from_slice(&bytes);
    }
}

impl ethereum_ssz::Decode for QbftMessage {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        let (selector, rest) = bytes
            .split_first()
            .ok_or_else(|| ethereum_ssz::DecodeError::BytesInvalid("empty QbftMessage bytes".to_string()))?;
        match *selector {
            MESSAGE_SELECTOR_PROPOSAL => Ok(QbftMessage::Proposal(SignedMessage::from_ssz_bytes(rest)?)),
            MESSAGE_SELECTOR_PREPARE => Ok(QbftMessage::Prepare(SignedMessage::from_ssz_bytes(rest)?)),
            MESSAGE_SELECTOR_COMMIT => Ok(QbftMessage::Commit(SignedMessage::from_ssz_bytes(rest)?)),
            MESSAGE_SELECTOR_ROUND_CHANGE => Ok(QbftMessage::RoundChange(SignedMessage::from_ssz_bytes(rest)?)),
            other => Err(ethereum_ssz::DecodeError::BytesInvalid(format!("unknown QbftMessage selector {other}"))),
        }
    }
}

impl tree_hash::TreeHash for QbftMessage {
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
            QbftMessage::Proposal(m) => (MESSAGE_SELECTOR_PROPOSAL, m.tree_hash_root()),
            QbftMessage::Prepare(m) => (MESSAGE_SELECTOR_PREPARE, m.tree_hash_root()),
            QbftMessage::Commit(m) => (MESSAGE_SELECTOR_COMMIT, m.tree_hash_root()),
            QbftMessage::RoundChange(m) => (MESSAGE_SELECTOR_ROUND_CHANGE, m.tree_hash_root()),
        };
        tree_hash::mix_in_selector(&root, selector).expect("message selector fits in union range")
    }
}

impl QbftMessage {
    pub fn height(&self) -> Height {
        match self {
            QbftMessage::Proposal(m) => m.data.height,
            QbftMessage::Prepare(m) => m.data.height,
            QbftMessage::Commit(m) => m.data.height,
            QbftMessage::RoundChange(m) => m.data.height,
        }
    }

    pub fn signer(&self) -> Option<OperatorId> {
        let signers = match self {
            QbftMessage::Proposal(m) => &m.signers,
            QbftMessage::Prepare(m) => &m.signers,
            QbftMessage::Commit(m) => &m.signers,
            QbftMessage::RoundChange(m) => &m.signers,
        };
        signers.first().copied()
    }
}
