//! The three-round FROST-style Pedersen VSS DKG state machine (spec §4.5):
//! round 1 commits each participant to a random polynomial, round 2 deals
//! each participant's secret evaluation to every peer, and round 3 verifies
//! every received share against its sender's round-1 commitment before
//! combining them into this operator's share of the validator key. A
//! mismatch in round 3 produces a [`Blame`] rather than a silent failure,
//! so the caller can identify and exclude the misbehaving dealer instead of
//! aborting the whole committee blindly.

use std::collections::BTreeMap;

use blstrs::{G1Projective, Scalar};
use ff::Field;
use group::Group;
use rand::RngCore;
use tracing::{debug, warn};

use ssv_crypto::{PublicKeyShare, SecretKeyShare, Share as CryptoShare};
use ssv_types::{Committee, OperatorId, ValidatorPublicKey};

use crate::error::DkgError;
use crate::message::{Blame, CommitMessage, ShareMessage};
use crate::polynomial::{affine, commit_scalar, eval_commitment, Polynomial};
use crate::schnorr::ProofOfKnowledge;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Round {
    Commit,
    Shares,
    Verify,
    Done,
    Aborted,
}

fn operator_scalar(id: OperatorId) -> Scalar {
    Scalar::from(id.value())
}

/// One operator's view of a single DKG run. Not `Clone`: a session is
/// mutated in place as rounds complete and is meaningless once `finalize`
/// consumes it.
pub struct DkgSession {
    request_id: [u8; 32],
    self_id: OperatorId,
    committee: Committee,
    threshold: usize,
    round: Round,
    own_polynomial: Option<Polynomial>,
    commitments: BTreeMap<OperatorId, Vec<G1Projective>>,
    received_shares: BTreeMap<OperatorId, Scalar>,
    blames: Vec<Blame>,
}

impl DkgSession {
    /// Starts a new session for `committee`, sampling this operator's
    /// degree-`(committee.quorum() - 1)` polynomial and returning the round
    /// 1 [`CommitMessage`] to broadcast.
    pub fn start(
        rng: &mut impl RngCore,
        request_id: [u8; 32],
        self_id: OperatorId,
        committee: Committee,
    ) -> (Self, CommitMessage) {
        let threshold = committee.quorum();
        let polynomial = Polynomial::sample(rng, threshold);
        let commitments = polynomial.commit();
        let proof_of_knowledge = ProofOfKnowledge::prove(
            rng,
            polynomial.constant_term(),
            affine(commitments[0]),
            request_id,
            self_id,
        );

        let message = CommitMessage {
            sender: self_id,
            commitments: commitments.iter().map(|c| affine(*c)).collect(),
            proof_of_knowledge,
        };

        let session = Self {
            request_id,
            self_id,
            committee,
            threshold,
            round: Round::Commit,
            own_polynomial: Some(polynomial),
            commitments: BTreeMap::new(),
            received_shares: BTreeMap::new(),
            blames: Vec::new(),
        };
        (session, message)
    }

    /// Records a peer's round-1 commitment. Once every committee member's
    /// commitment (including this operator's own) has been recorded, moves
    /// the session into round 2 and returns this operator's dealt shares —
    /// one [`ShareMessage`] per peer, to be sent over a private channel.
    pub fn process_commit(&mut self, msg: CommitMessage) -> Result<Option<Vec<ShareMessage>>, DkgError> {
        if self.round != Round::Commit {
            return Err(DkgError::WrongRound {
                expected: Round::Commit as u8,
                actual: self.round as u8,
            });
        }
        if !self.committee.contains(msg.sender) {
            return Err(DkgError::UnknownParticipant(msg.sender));
        }
        if self.commitments.contains_key(&msg.sender) {
            return Err(DkgError::DuplicateCommitment(msg.sender));
        }
        if msg.degree() != self.threshold - 1 {
            return Err(DkgError::WrongDegree(msg.sender));
        }
        if !msg
            .proof_of_knowledge
            .verify(msg.constant_term(), self.request_id, msg.sender)
        {
            return Err(DkgError::InvalidProofOfKnowledge(msg.sender));
        }

        let commitments: Vec<G1Projective> = msg.commitments.iter().map(|c| G1Projective::from(*c)).collect();
        self.commitments.insert(msg.sender, commitments);
        debug!(sender = %msg.sender, received = self.commitments.len(), total = self.committee.size(), "recorded DKG commitment");

        if self.commitments.len() < self.committee.size() {
            return Ok(None);
        }

        self.round = Round::Shares;
        let polynomial = self
            .own_polynomial
            .take()
            .expect("own polynomial is set until round 1 completes exactly once");

        let shares = self
            .committee
            .iter()
            .map(|recipient| ShareMessage {
                sender: self.self_id,
                recipient,
                share: polynomial.eval(operator_scalar(recipient)),
            })
            .collect();
        Ok(Some(shares))
    }

    /// Records a secret share dealt to this operator by `msg.sender`.
    pub fn process_share(&mut self, msg: ShareMessage) -> Result<(), DkgError> {
        if self.round != Round::Shares {
            return Err(DkgError::WrongRound {
                expected: Round::Shares as u8,
                actual: self.round as u8,
            });
        }
        if msg.recipient != self.self_id {
            return Err(DkgError::UnknownParticipant(msg.recipient));
        }
        if !self.commitments.contains_key(&msg.sender) {
            return Err(DkgError::UnknownParticipant(msg.sender));
        }
        if self.received_shares.contains_key(&msg.sender) {
            return Err(DkgError::DuplicateShare(msg.sender));
        }

        self.received_shares.insert(msg.sender, msg.share);
        debug!(sender = %msg.sender, received = self.received_shares.len(), total = self.committee.size(), "recorded DKG share");

        if self.received_shares.len() == self.committee.size() {
            self.round = Round::Verify;
        }
        Ok(())
    }

    /// Round 3: verifies every received share against its sender's
    /// commitment and, if all check out, combines them into this
    /// operator's [`ssv_crypto::Share`] of the validator key. Any mismatch
    /// aborts the session with [`DkgError::Aborted`] instead — call
    /// [`Self::blames`] afterwards for the evidence naming which operator(s)
    /// to exclude before retrying.
    pub fn finalize(&mut self) -> Result<CryptoShare, DkgError> {
        if self.round != Round::Verify {
            return Err(DkgError::SharesIncomplete);
        }

        let self_scalar = operator_scalar(self.self_id);
        for (&sender, &share) in &self.received_shares {
            let commitments = &self.commitments[&sender];
            let expected = eval_commitment(commitments, self_scalar);
            if commit_scalar(share) != expected {
                warn!(sender = %sender, "share failed verification against round 1 commitment");
                self.blames.push(Blame {
                    accuser: self.self_id,
                    accused: sender,
                    disputed_share: share,
                });
            }
        }

        if !self.blames.is_empty() {
            self.round = Round::Aborted;
            return Err(DkgError::Aborted(self.blames.len()));
        }

        let own_secret = self.received_shares.values().fold(Scalar::ZERO, |acc, s| acc + s);

        let validator_point = self
            .commitments
            .values()
            .fold(G1Projective::identity(), |acc, c| acc + c[0]);
        let validator_public_key = ValidatorPublicKey::new(affine(validator_point).to_compressed());

        let mut public_key_shares = BTreeMap::new();
        for operator in self.committee.iter() {
            let x = operator_scalar(operator);
            let point = self
                .commitments
                .values()
                .fold(G1Projective::identity(), |acc, c| acc + eval_commitment(c, x));
            let bytes = affine(point).to_compressed();
            let share = PublicKeyShare::from_bytes(&bytes).expect("point derived from valid commitments is always a valid encoding");
            public_key_shares.insert(operator, share);
        }

        self.round = Round::Done;
        Ok(CryptoShare::new(
            self.self_id,
            validator_public_key,
            self.committee.clone(),
            SecretKeyShare::from_scalar(own_secret),
            public_key_shares,
        ))
    }

    pub fn request_id(&self) -> [u8; 32] {
        self.request_id
    }

    /// Blame evidence accumulated by the last [`Self::finalize`] call, if it
    /// returned [`DkgError::Aborted`]. Empty before round 3 runs.
    pub fn blames(&self) -> &[Blame] {
        &self.blames
    }
}
