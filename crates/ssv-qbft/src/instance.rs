//! One consensus attempt at a single height — spec §4.1.
//!
//! Grounded on the teacher's `core-driver::Driver::apply` multiplexing
//! shape (one method per input kind, each returning what the embedder must
//! do next) and `core-votekeeper`'s per-round tally-to-threshold pattern,
//! adapted from stake-weighted votes to one-operator-one-vote commitee
//! membership.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use ssv_crypto::{HashTreeRoot, Signature};
use ssv_types::{AggregateSignature, Committee, ConsensusData, Error, Height, OperatorId, Round, SignedMessage};

use crate::container::{Insert, MessageContainer};
use crate::message::{
    CommitData, PrepareData, ProposalData, QbftMessage, RoundChangeData, RoundChangeJustification,
};
use crate::signer::QbftSigner;

/// Injected per-role duty validity check, called both on incoming
/// Proposals and before the runner asks an Instance to `start`.
pub trait ValueCheck {
    fn check(&self, value: &ConsensusData) -> Result<(), Error>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InstanceState {
    NotStarted,
    ProposalAccepted,
    Prepared,
    Decided,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecidedValue {
    pub value: ConsensusData,
    pub root: [u8; 32],
    pub aggregated_signature: AggregateSignature,
    pub signers: Vec<OperatorId>,
}

/// What the embedder must do in response to a successful `Instance` call:
/// broadcast zero or more messages, and — at most once — learn that the
/// instance has newly decided.
#[derive(Default)]
pub struct Outcome {
    pub broadcast: Vec<QbftMessage>,
    pub newly_decided: Option<DecidedValue>,
}

pub struct Instance {
    height: Height,
    committee: Committee,
    self_id: OperatorId,
    current_round: Round,
    state: InstanceState,
    initial_value: Option<ConsensusData>,
    accepted_proposal: Option<(Round, ConsensusData, [u8; 32])>,
    prepared: Option<(Round, ConsensusData, [u8; 32])>,
    decided: Option<DecidedValue>,
    proposals: MessageContainer<SignedMessage<ProposalData>>,
    prepares: MessageContainer<SignedMessage<PrepareData>>,
    commits: MessageContainer<SignedMessage<CommitData>>,
    round_changes: MessageContainer<SignedMessage<RoundChangeData>>,
    value_check: Box<dyn ValueCheck>,
}

impl Instance {
    pub fn new(height: Height, committee: Committee, self_id: OperatorId, value_check: Box<dyn ValueCheck>) -> Self {
        Self {
            height,
            committee,
            self_id,
            current_round: Round::FIRST,
            state: InstanceState::NotStarted,
            initial_value: None,
            accepted_proposal: None,
            prepared: None,
            decided: None,
            proposals: MessageContainer::new(),
            prepares: MessageContainer::new(),
            commits: MessageContainer::new(),
            round_changes: MessageContainer::new(),
            value_check,
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn current_round(&self) -> Round {
        self.current_round
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn decided_value(&self) -> Option<&DecidedValue> {
        self.decided.as_ref()
    }

    fn designated_proposer(&self, round: Round) -> OperatorId {
        self.committee.proposer(self.height.value(), round.value() - 1)
    }

    fn quorum(&self) -> usize {
        self.committee.quorum()
    }

    fn max_faulty(&self) -> usize {
        self.committee.max_faulty()
    }

    /// Begins the instance at `Round::FIRST`. If this operator is the
    /// designated proposer, produces the initial signed Proposal to
    /// broadcast; otherwise returns an empty outcome (the instance simply
    /// waits for a Proposal or a round timeout).
    pub fn start(&mut self, value: ConsensusData, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        if self.state != InstanceState::NotStarted {
            return Err(Error::ValueCheck("instance already started".into()));
        }
        self.value_check.check(&value)?;
        self.initial_value = Some(value.clone());

        if self.designated_proposer(Round::FIRST) != self.self_id {
            return Ok(Outcome::default());
        }

        let proposal = ProposalData {
            height: self.height,
            round: Round::FIRST,
            value,
            justification: None,
        };
        self.broadcast_own_proposal(proposal, signer)
    }

    fn broadcast_own_proposal(&mut self, proposal: ProposalData, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        let value_root = proposal.value.hash_tree_root();
        let root = proposal.signing_root(value_root);
        let sig = signer.sign(root);
        let signed = SignedMessage::single(self.self_id, AggregateSignature::new(sig.to_bytes()), proposal.clone());

        self.proposals.insert(proposal.round, self.self_id, signed.clone());
        Ok(Outcome {
            broadcast: vec![QbftMessage::Proposal(signed)],
            newly_decided: None,
        })
    }

    fn verify_single(
        &self,
        signer_id: OperatorId,
        root: [u8; 32],
        signature: &AggregateSignature,
        qbft_signer: &dyn QbftSigner,
    ) -> Result<(), Error> {
        if !self.committee.contains(signer_id) {
            return Err(Error::UnknownSigner(signer_id));
        }
        let pubkey = qbft_signer
            .public_key_share(signer_id)
            .ok_or(Error::UnknownSigner(signer_id))?;
        let sig = Signature::from_bytes(signature.as_bytes())
            .map_err(|_| Error::MalformedMsg("bad signature encoding".into()))?;
        if !sig.verify(&root, pubkey.point()) {
            return Err(Error::WrongSignature);
        }
        Ok(())
    }

    /// Processes an incoming Proposal. Per spec §4.1: accepted iff signed
    /// by the designated proposer, round/identifier match (or a valid
    /// round-change justification accompanies a higher round), the value
    /// passes `value_check`, and — if the justification reports a
    /// prepared round — the value matches the highest-prepared-round
    /// claim.
    pub fn process_proposal(&mut self, msg: SignedMessage<ProposalData>, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        msg.validate(self.committee.size())?;
        let proposer = msg.signers[0];
        let value_root = msg.data.value.hash_tree_root();
        let root = msg.data.signing_root(value_root);
        self.verify_single(proposer, root, &msg.signature, signer)?;

        if proposer != self.designated_proposer(msg.data.round) {
            return Err(Error::ValueCheck(format!(
                "proposal signed by {proposer}, expected designated proposer"
            )));
        }

        match self.proposals.insert(msg.data.round, proposer, msg.clone()) {
            Insert::Equivocation => return Err(Error::Equivocation(proposer)),
            Insert::Accepted => {}
        }

        if msg.data.round > Round::FIRST {
            self.check_round_change_justification(&msg.data, &value_root, signer)?;
        }

        self.value_check.check(&msg.data.value)?;

        if msg.data.round < self.current_round {
            return Ok(Outcome::default());
        }
        self.current_round = msg.data.round;
        self.state = InstanceState::ProposalAccepted;
        self.accepted_proposal = Some((msg.data.round, msg.data.value.clone(), value_root));
        info!(height = %self.height, round = %msg.data.round, "proposal accepted");

        let prepare = PrepareData {
            height: self.height,
            round: msg.data.round,
            root: value_root,
        };
        let prepare_root = prepare.signing_root();
        let sig = signer.sign(prepare_root);
        let signed = SignedMessage::single(self.self_id, AggregateSignature::new(sig.to_bytes()), prepare);
        self.prepares.insert(msg.data.round, self.self_id, signed.clone());

        Ok(Outcome {
            broadcast: vec![QbftMessage::Prepare(signed)],
            newly_decided: None,
        })
    }

    fn check_round_change_justification(
        &self,
        proposal: &ProposalData,
        value_root: &[u8; 32],
        signer: &dyn QbftSigner,
    ) -> Result<(), Error> {
        let justification = proposal
            .justification
            .as_ref()
            .ok_or_else(|| Error::ValueCheck("higher round proposal missing justification".into()))?;

        if justification.round_changes.len() < self.quorum() {
            return Err(Error::ValueCheck("round-change justification below quorum".into()));
        }

        let mut signers = HashSet::new();
        let mut max_prepared: Option<(Round, [u8; 32])> = None;
        for rc in &justification.round_changes {
            rc.validate(1)?;
            let rc_signer = rc.signers[0];
            if !signers.insert(rc_signer) {
                return Err(Error::ValueCheck("duplicate signer in round-change justification".into()));
            }
            let prepared_root = rc.data.prepared_value.as_ref().map(|v| v.hash_tree_root());
            let root = rc.data.signing_root(prepared_root);
            self.verify_single(rc_signer, root, &rc.signature, signer)?;

            if let (Some(pr), Some(pv_root)) = (rc.data.prepared_round, prepared_root) {
                if max_prepared.map_or(true, |(best, _)| pr > best) {
                    max_prepared = Some((pr, pv_root));
                }
            }
        }

        if let Some((_, expected_root)) = max_prepared {
            if expected_root != *value_root {
                return Err(Error::ValueCheck("proposal value does not match highest prepared round-change".into()));
            }
            if justification.prepares.len() < self.quorum() {
                return Err(Error::ValueCheck("prepare justification below quorum".into()));
            }
            let mut prepare_signers = HashSet::new();
            for prepare in &justification.prepares {
                prepare.validate(1)?;
                let prepare_signer = prepare.signers[0];
                if !prepare_signers.insert(prepare_signer) {
                    return Err(Error::ValueCheck("duplicate signer in prepare justification".into()));
                }
                if prepare.data.root != expected_root {
                    return Err(Error::ValueCheck("prepare justification root mismatch".into()));
                }
                self.verify_single(prepare_signer, prepare.data.signing_root(), &prepare.signature, signer)?;
            }
        }

        Ok(())
    }

    /// Processes an incoming Prepare. Round/root mismatches against the
    /// currently accepted proposal are treated as stale messages and
    /// quietly ignored rather than erroring, per spec §7's routing-error
    /// semantics.
    pub fn process_prepare(&mut self, msg: SignedMessage<PrepareData>, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        msg.validate(1)?;
        let prepare_signer = msg.signers[0];
        self.verify_single(prepare_signer, msg.data.signing_root(), &msg.signature, signer)?;

        let data = msg.data;
        match self.prepares.insert(data.round, prepare_signer, msg.clone()) {
            Insert::Equivocation => return Err(Error::Equivocation(prepare_signer)),
            Insert::Accepted => {}
        }

        let Some((accepted_round, accepted_value, accepted_root)) = self.accepted_proposal.clone() else {
            return Ok(Outcome::default());
        };
        if data.round != accepted_round || data.root != accepted_root {
            return Ok(Outcome::default());
        }
        if self.state == InstanceState::Decided {
            return Ok(Outcome::default());
        }

        let count = self
            .prepares
            .messages_for_round(data.round)
            .filter(|(_, p)| p.data.root == accepted_root)
            .count();
        if count < self.quorum() {
            return Ok(Outcome::default());
        }
        if self.prepared.as_ref().map(|(r, ..)| *r) == Some(data.round) {
            return Ok(Outcome::default());
        }

        self.prepared = Some((data.round, accepted_value, accepted_root));
        self.state = InstanceState::Prepared;
        info!(height = %self.height, round = %data.round, "prepared");

        let commit = CommitData {
            height: self.height,
            round: data.round,
            root: accepted_root,
        };
        let sig = signer.sign(commit.signing_root());
        let signed = SignedMessage::single(self.self_id, AggregateSignature::new(sig.to_bytes()), commit);
        self.commits.insert(data.round, self.self_id, signed.clone());

        Ok(Outcome {
            broadcast: vec![QbftMessage::Commit(signed)],
            newly_decided: None,
        })
    }

    /// Processes an incoming Commit. Tolerates arriving after the
    /// instance has already decided the same value/root — this is the
    /// "late commit repair" path of spec §8 scenario 3 — by folding the
    /// signer into the decided aggregate rather than rejecting it.
    pub fn process_commit(&mut self, msg: SignedMessage<CommitData>, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        msg.validate(1)?;
        let commit_signer = msg.signers[0];
        self.verify_single(commit_signer, msg.data.signing_root(), &msg.signature, signer)?;

        let data = msg.data;
        match self.commits.insert(data.round, commit_signer, msg.clone()) {
            Insert::Equivocation => return Err(Error::Equivocation(commit_signer)),
            Insert::Accepted => {}
        }

        let expected_root = if let Some(decided) = &self.decided {
            decided.root
        } else if let Some((round, _, root)) = &self.accepted_proposal {
            if *round != data.round {
                return Ok(Outcome::default());
            }
            *root
        } else {
            return Ok(Outcome::default());
        };
        if data.root != expected_root {
            return Ok(Outcome::default());
        }

        let matching: Vec<SignedMessage<CommitData>> = self
            .commits
            .messages_for_round(data.round)
            .filter(|(_, c)| c.data.root == expected_root)
            .map(|(_, c)| c.clone())
            .collect();
        if matching.len() < self.quorum() {
            return Ok(Outcome::default());
        }

        let already_decided = self.state == InstanceState::Decided;
        let Some((_, value, _)) = &self.accepted_proposal else {
            return Ok(Outcome::default());
        };

        let signatures: Vec<Signature> = matching
            .iter()
            .filter_map(|c| Signature::from_bytes(c.signature.as_bytes()).ok())
            .collect();
        let aggregated = Signature::aggregate(&signatures)
            .map(|s| AggregateSignature::new(s.to_bytes()))
            .unwrap_or(AggregateSignature::new([0u8; 96]));

        let decided = DecidedValue {
            value: value.clone(),
            root: expected_root,
            aggregated_signature: aggregated,
            signers: matching.iter().map(|c| c.signers[0]).collect(),
        };
        self.decided = Some(decided.clone());
        self.state = InstanceState::Decided;

        if already_decided {
            debug!(height = %self.height, "decided aggregate enlarged by late commit");
            Ok(Outcome::default())
        } else {
            info!(height = %self.height, round = %data.round, "decided");
            Ok(Outcome {
                broadcast: vec![],
                newly_decided: Some(decided),
            })
        }
    }

    /// Processes an incoming RoundChange, per spec §4.1's fast-forward and
    /// re-proposal rules.
    pub fn process_round_change(&mut self, msg: SignedMessage<RoundChangeData>, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        msg.validate(1)?;
        let rc_signer = msg.signers[0];
        let prepared_root = msg.data.prepared_value.as_ref().map(|v| v.hash_tree_root());
        self.verify_single(rc_signer, msg.data.signing_root(prepared_root), &msg.signature, signer)?;

        if msg.data.prepared_round.is_some() && msg.data.prepare_justification.len() < self.quorum() {
            warn!(signer = %rc_signer, "round-change prepared claim missing quorum justification");
            return Err(Error::ValueCheck("round-change prepared claim missing justification".into()));
        }

        let round = msg.data.round;
        match self.round_changes.insert(round, rc_signer, msg.clone()) {
            Insert::Equivocation => return Err(Error::Equivocation(rc_signer)),
            Insert::Accepted => {}
        }

        let mut outcome = Outcome::default();

        // Fast-forward: f+1 round-changes for rounds strictly greater than current.
        let mut higher_round_signers: HashMap<OperatorId, Round> = HashMap::new();
        for r in self.round_changes.rounds_above(self.current_round) {
            for s in self.round_changes.signers_for_round(r) {
                higher_round_signers.entry(s).or_insert(r);
            }
        }
        if higher_round_signers.len() >= self.max_faulty() + 1 {
            if let Some(&min_round) = higher_round_signers.values().min() {
                if min_round > self.current_round {
                    self.current_round = min_round;
                    info!(height = %self.height, round = %min_round, "fast-forwarding round");
                }
            }
        }

        // Re-proposal: quorum of round-changes for the current round, and we're its proposer.
        if self.designated_proposer(self.current_round) == self.self_id && self.state != InstanceState::Decided {
            let count = self.round_changes.count_for_round(self.current_round);
            if count >= self.quorum() {
                if let Some(proposal_outcome) = self.build_reproposal(signer)? {
                    outcome.broadcast.extend(proposal_outcome.broadcast);
                }
            }
        }

        Ok(outcome)
    }

    fn build_reproposal(&mut self, signer: &dyn QbftSigner) -> Result<Option<Outcome>, Error> {
        let round = self.current_round;
        let mut max_prepared: Option<(Round, ConsensusData, [u8; 32])> = None;
        let mut round_changes = Vec::new();
        let mut prepares = Vec::new();

        for (_, rc) in self.round_changes.messages_for_round(round) {
            round_changes.push(rc.clone());
            if let (Some(pr), Some(pv)) = (rc.data.prepared_round, &rc.data.prepared_value) {
                if max_prepared.as_ref().map_or(true, |(best, ..)| pr > *best) {
                    let root = pv.hash_tree_root();
                    max_prepared = Some((pr, pv.clone(), root));
                    prepares = rc.data.prepare_justification.clone();
                }
            }
        }

        let value = match (&max_prepared, &self.initial_value) {
            (Some((_, value, _)), _) => value.clone(),
            (None, Some(initial)) => initial.clone(),
            (None, None) => return Ok(None),
        };

        let proposal = ProposalData {
            height: self.height,
            round,
            value,
            justification: Some(RoundChangeJustification { round_changes, prepares }),
        };
        Ok(Some(self.broadcast_own_proposal(proposal, signer)?))
    }

    /// Called by the embedder when this instance's per-round timer fires.
    /// Produces a RoundChange for `current_round + 1`, carrying this
    /// operator's prepared claim if it has one.
    pub fn timeout(&mut self, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        if self.state == InstanceState::Decided {
            return Ok(Outcome::default());
        }
        let next_round = self.current_round.next();
        let (prepared_round, prepared_value, prepare_justification) = match &self.prepared {
            Some((round, value, root)) => {
                let justification: Vec<_> = self
                    .prepares
                    .messages_for_round(*round)
                    .filter(|(_, p)| p.data.root == *root)
                    .map(|(_, p)| p.clone())
                    .collect();
                (Some(*round), Some(value.clone()), justification)
            }
            None => (None, None, vec![]),
        };

        let data = RoundChangeData {
            height: self.height,
            round: next_round,
            prepared_round,
            prepared_value,
            prepare_justification,
        };
        let prepared_root = data.prepared_value.as_ref().map(|v| v.hash_tree_root());
        let sig = signer.sign(data.signing_root(prepared_root));
        let signed = SignedMessage::single(self.self_id, AggregateSignature::new(sig.to_bytes()), data);

        self.round_changes.insert(next_round, self.self_id, signed.clone());
        self.current_round = next_round;
        info!(height = %self.height, round = %next_round, "round timed out, broadcasting round-change");

        Ok(Outcome {
            broadcast: vec![QbftMessage::RoundChange(signed)],
            newly_decided: None,
        })
    }
}
