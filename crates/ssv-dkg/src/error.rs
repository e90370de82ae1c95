use thiserror::Error;

use ssv_types::OperatorId;

/// Failures specific to the FROST DKG protocol; narrower than
/// `ssv_types::Error`'s shared vocabulary since most of these (wrong round,
/// unknown committee member, duplicate commitment) have no consensus-layer
/// analogue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DkgError {
    #[error("session already started")]
    AlreadyStarted,

    #[error("round {expected} message received while session is in round {actual}")]
    WrongRound { expected: u8, actual: u8 },

    #[error("operator {0} is not a member of this session")]
    UnknownParticipant(OperatorId),

    #[error("duplicate commitment from operator {0}")]
    DuplicateCommitment(OperatorId),

    #[error("commitment from operator {0} carries the wrong degree")]
    WrongDegree(OperatorId),

    #[error("proof of knowledge from operator {0} failed verification")]
    InvalidProofOfKnowledge(OperatorId),

    #[error("duplicate share from operator {0}")]
    DuplicateShare(OperatorId),

    #[error("round 2 reached before all commitments were collected")]
    CommitmentsIncomplete,

    #[error("round 3 reached before all shares were collected")]
    SharesIncomplete,

    #[error("session aborted: {0} blame(s) raised, see blame evidence")]
    Aborted(usize),
}
