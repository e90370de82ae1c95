use thiserror::Error;

use crate::operator::OperatorId;

/// Cross-cutting error kinds shared by every layer of the engine (consensus,
/// partial-signature aggregation, DKG). Each kind is surfaced to the caller
/// distinctly and is never silently swallowed; see the error-handling design
/// in the top-level specification for the intended propagation rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Failed to decode, wrong sizes, nil identifier, empty/duplicate signers,
    /// or signers exceeding the committee size.
    #[error("malformed message: {0}")]
    MalformedMsg(String),

    /// A signer is not a member of the expected committee.
    #[error("unknown signer: operator {0}")]
    UnknownSigner(OperatorId),

    /// Cryptographic signature verification failed.
    #[error("signature verification failed")]
    WrongSignature,

    /// Role-specific duty invariants failed; treated as an invalid proposal.
    #[error("duty invalid: {0}")]
    ValueCheck(String),

    /// Message height is behind the controller's history window.
    #[error("height {0} is in the past and outside the history window")]
    Past(u64),

    /// Message height is ahead of the controller's current height.
    #[error("height {0} is in the future")]
    Future(u64),

    /// No running or decided instance exists for the referenced height.
    #[error("no instance for height {0}")]
    NoInstance(u64),

    /// Same (signer, round) seen twice with divergent content, or a
    /// diverging partial signature for the same root: a slashable offense.
    #[error("equivocation detected for operator {0}")]
    Equivocation(OperatorId),

    /// A quorum of partial signatures was reached but the reconstructed
    /// signature failed verification. Fatal for the duty.
    #[error("signature reconstruction failed")]
    Reconstruction,

    /// Transient failure talking to the beacon node or the network; state
    /// is preserved so the caller can retry.
    #[error("beacon/network error: {0}")]
    BeaconOrNetwork(String),
}
