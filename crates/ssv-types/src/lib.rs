//! Core data model for the SSV distributed-validator consensus engine.
//!
//! This crate is deliberately crypto-agnostic: it defines the shapes that
//! flow through the wire protocol and the QBFT/duty-runner state machines,
//! but leaves signing and verification to `ssv-crypto`.

pub mod consensus_data;
pub mod duty;
pub mod error;
pub mod message_id;
pub mod operator;
pub mod round;
pub mod signed_message;
pub mod wire;

pub use consensus_data::{
    AggregateAndProof, Attestation, AttestationData, BeaconBlockHeader, Checkpoint, ConsensusData,
    ContributionAndProof, DutyPayload, SignedAggregateAndProof, SignedBeaconBlock, SignedContributionAndProof,
    SyncCommitteeContribution, SyncCommitteeMessage,
};
pub use duty::{BeaconRole, Duty};
pub use error::Error;
pub use message_id::{MessageId, ValidatorPublicKey, MESSAGE_ID_LEN, VALIDATOR_PUBLIC_KEY_LEN};
pub use operator::{Committee, OperatorId};
pub use round::{Height, Round};
pub use signed_message::{AggregateSignature, SignedMessage, SIGNATURE_LEN};
pub use wire::{MsgType, SsvMessage};
