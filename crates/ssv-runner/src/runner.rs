//! `BaseRunner` — the duty-execution pipeline of spec §3/§4.3: pre-consensus
//! signing, QBFT consensus, post-consensus signing, beacon submission.
//!
//! Grounded on the teacher's `consensus::Executor` shape (a small struct
//! owning one state machine, exposing one `process_*` method per external
//! input and routing through an internal `apply`), generalized from QBFT's
//! single round-state-machine dispatch to a five-stage pipeline spanning two
//! partial-signature phases around one QBFT controller.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use ssv_crypto::{compute_domain, signing_root, DomainType, PublicKeyShare, Share, Signature};
use ssv_partial_sig::{Insert as PartialInsert, PartialSignatureContainer};
use ssv_qbft::{Controller, Outcome, QbftMessage, ShareSigner, ValueCheck, ValueCheckFactory};
use ssv_types::{ConsensusData, Duty, Error, Height, MessageId, MsgType, SsvMessage};

use crate::beacon_node::BeaconNode;
use crate::message::{PartialSigPhase, PartialSignatureMessage};
use crate::network::Network;
use crate::role::RoleBehavior;
use crate::state::RunnerState;
use crate::storage::Storage;

/// Adapts a [`RoleBehavior`] into the `ssv-qbft` [`ValueCheck`] seam, closing
/// over the validator index fixed for this runner's whole lifetime — not the
/// "current" duty, since `ConsensusData` already carries its own duty.
struct RoleValueCheck {
    role: Arc<dyn RoleBehavior>,
    validator_index: u64,
}

impl ValueCheck for RoleValueCheck {
    fn check(&self, value: &ConsensusData) -> Result<(), Error> {
        self.role.value_check(value, self.validator_index)
    }
}

/// One runner per (validator, role), per spec §3. Owns the QBFT controller
/// for this duty's height sequence and the partial-signature containers for
/// both signing phases of the currently running duty.
pub struct BaseRunner {
    role: Arc<dyn RoleBehavior>,
    share: Share,
    /// The validator's own (reconstructed-key) public key, distinct from any
    /// single operator's `PublicKeyShare` — this is what a fully
    /// reconstructed threshold signature verifies against.
    validator_pubkey: PublicKeyShare,
    validator_index: u64,
    fork_tag: [u8; 28],
    beacon: Arc<dyn BeaconNode>,
    network: Arc<dyn Network>,
    storage: Option<Arc<dyn Storage>>,
    controller: Controller,
    state: RunnerState,
}

impl BaseRunner {
    pub fn new(
        role: Arc<dyn RoleBehavior>,
        share: Share,
        validator_index: u64,
        fork_tag: [u8; 28],
        controller_config: ssv_config::ControllerConfig,
        beacon: Arc<dyn BeaconNode>,
        network: Arc<dyn Network>,
        storage: Option<Arc<dyn Storage>>,
    ) -> Self {
        let factory: ValueCheckFactory = {
            let role = role.clone();
            Box::new(move || {
                Box::new(RoleValueCheck {
                    role: role.clone(),
                    validator_index,
                }) as Box<dyn ValueCheck>
            })
        };
        let controller = Controller::new(share.operator_id, share.committee.clone(), controller_config, factory);
        let validator_pubkey = PublicKeyShare::from_bytes(share.validator_public_key.as_bytes())
            .expect("share's validator public key must be a valid compressed G1 point");

        let mut runner = Self {
            role,
            share,
            validator_pubkey,
            validator_index,
            fork_tag,
            beacon,
            network,
            storage,
            controller,
            state: RunnerState::default(),
        };

        if let Some(storage) = &runner.storage {
            if let Ok(Some(height)) = storage.get_highest_decided(runner.share.validator_public_key, runner.role.role()) {
                runner.controller.resume_from_height(height);
            }
        }
        runner
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    fn quorum(&self) -> usize {
        self.share.threshold()
    }

    /// The actual, domain-separated root a partial signature is produced
    /// over, mixing the duty-scoped object root returned by a
    /// [`RoleBehavior`] with the per-phase signing domain (spec §4.4).
    fn domain_root(&self, object_root: [u8; 32], domain_type: DomainType) -> [u8; 32] {
        signing_root(object_root, compute_domain(domain_type, self.fork_tag))
    }

    /// Starts a new duty. Errors if a previous duty hasn't reached a
    /// terminal state (spec §3's lifecycle: one duty in flight at a time).
    pub fn start_new_duty(&mut self, duty: Duty) -> Result<(), Error> {
        if !self.state.is_idle() {
            return Err(Error::ValueCheck("a duty is already in progress".into()));
        }
        if duty.role != self.role.role() {
            return Err(Error::ValueCheck(format!(
                "duty invalid: runner is scoped to {}, got {}",
                self.role.role(),
                duty.role
            )));
        }

        self.state = RunnerState {
            duty: Some(duty.clone()),
            ..RunnerState::default()
        };

        if self.role.requires_pre_consensus() {
            self.sign_and_broadcast_pre_consensus(&duty)
        } else {
            self.execute_duty(&duty)
        }
    }

    fn sign_and_broadcast_pre_consensus(&mut self, duty: &Duty) -> Result<(), Error> {
        for object_root in self.role.pre_consensus_roots(duty) {
            let signing_root = self.domain_root(object_root, self.role.pre_consensus_domain());
            let sig = self.share.secret_share().sign(&signing_root);
            self.state.pre_consensus.add(signing_root, self.share.operator_id, sig);
            self.broadcast_partial_signature(PartialSigPhase::PreConsensus, signing_root, sig)?;
        }
        Ok(())
    }

    /// Assembles this duty's consensus value (pulling reconstructed
    /// pre-consensus signatures in if the role needs them) and starts the
    /// QBFT instance at `Height::new(duty.slot)`.
    fn execute_duty(&mut self, duty: &Duty) -> Result<(), Error> {
        let pre_consensus_sigs = if self.role.requires_pre_consensus() {
            Some(self.state.reconstructed_pre_consensus_signatures())
        } else {
            None
        };

        let value = self.role.build_consensus_input(duty, self.beacon.as_ref(), pre_consensus_sigs.as_ref())?;
        self.role.value_check(&value, self.validator_index)?;

        let height = Height::new(duty.slot);
        let signer = ShareSigner::new(&self.share);
        let outcome = self.controller.start_instance(height, value, &signer)?;
        self.handle_consensus_outcome(outcome)
    }

    /// Feeds an incoming pre-consensus partial signature message. Once every
    /// root this role requires has reached quorum, reconstructs all of them
    /// and proceeds straight to consensus.
    pub fn process_pre_consensus(&mut self, msg: PartialSignatureMessage) -> Result<(), Error> {
        if msg.phase != PartialSigPhase::PreConsensus {
            return Err(Error::MalformedMsg("expected pre-consensus phase".into()));
        }
        let Some(duty) = self.state.duty.clone() else {
            return Err(Error::ValueCheck("no duty in progress".into()));
        };

        self.ingest_partial_signature(msg, true)?;

        let expected_roots = self.role.pre_consensus_roots(&duty);
        let quorum = self.quorum();
        let all_reconstructed = expected_roots.iter().all(|&object_root| {
            let signing_root = self.domain_root(object_root, self.role.pre_consensus_domain());
            self.state.pre_consensus.has_quorum(signing_root, quorum)
        });
        if !all_reconstructed || !self.state.reconstructed_pre_consensus.is_empty() {
            return Ok(());
        }

        for object_root in &expected_roots {
            let signing_root = self.domain_root(*object_root, self.role.pre_consensus_domain());
            let sig = self
                .state
                .pre_consensus
                .reconstruct(signing_root, quorum, &self.validator_pubkey)?;
            self.state.reconstructed_pre_consensus.insert(*object_root, sig.to_bytes());
        }

        info!(role = %self.role.role(), slot = duty.slot, "pre-consensus quorum reached");
        self.execute_duty(&duty)
    }

    /// Feeds an incoming QBFT consensus message.
    pub fn process_consensus(&mut self, msg: QbftMessage) -> Result<(), Error> {
        let signer = ShareSigner::new(&self.share);
        let outcome = self.controller.process_message(msg, &signer)?;
        self.handle_consensus_outcome(outcome)
    }

    /// Forwards a round-timer fire for the currently running duty's height.
    pub fn timeout(&mut self) -> Result<(), Error> {
        let Some(duty) = &self.state.duty else {
            return Ok(());
        };
        let height = Height::new(duty.slot);
        let signer = ShareSigner::new(&self.share);
        let outcome = self.controller.timeout(height, &signer)?;
        self.handle_consensus_outcome(outcome)
    }

    fn handle_consensus_outcome(&mut self, outcome: Outcome) -> Result<(), Error> {
        for message in outcome.broadcast {
            self.broadcast_consensus_message(message)?;
        }
        if let Some(decided) = outcome.newly_decided {
            self.state.decided_value = Some(decided.value.clone());
            info!(role = %self.role.role(), root = %hex::encode(decided.root), "consensus decided");
            self.sign_and_broadcast_post_consensus(&decided.value)?;
        }
        Ok(())
    }

    fn sign_and_broadcast_post_consensus(&mut self, decided: &ConsensusData) -> Result<(), Error> {
        for object_root in self.role.post_consensus_roots(decided) {
            let signing_root = self.domain_root(object_root, self.role.post_consensus_domain());
            let sig = self.share.secret_share().sign(&signing_root);
            self.state.post_consensus.add(signing_root, self.share.operator_id, sig);
            self.broadcast_partial_signature(PartialSigPhase::PostConsensus, signing_root, sig)?;
        }
        Ok(())
    }

    /// Feeds an incoming post-consensus partial signature message. Once
    /// every root the decided value requires has reached quorum,
    /// reconstructs them all, submits the final beacon artifact, and
    /// retires the duty.
    pub fn process_post_consensus(&mut self, msg: PartialSignatureMessage) -> Result<(), Error> {
        if msg.phase != PartialSigPhase::PostConsensus {
            return Err(Error::MalformedMsg("expected post-consensus phase".into()));
        }
        let Some(decided) = self.state.decided_value.clone() else {
            return Err(Error::ValueCheck("no decided value yet".into()));
        };
        if self.state.finished {
            return Ok(());
        }

        self.ingest_partial_signature(msg, false)?;

        let expected_roots = self.role.post_consensus_roots(&decided);
        let quorum = self.quorum();
        let ready = expected_roots.iter().all(|&object_root| {
            let signing_root = self.domain_root(object_root, self.role.post_consensus_domain());
            self.state.post_consensus.has_quorum(signing_root, quorum)
        });
        if !ready {
            return Ok(());
        }

        let mut post_consensus_sigs = HashMap::new();
        for object_root in &expected_roots {
            let signing_root = self.domain_root(*object_root, self.role.post_consensus_domain());
            let sig = self
                .state
                .post_consensus
                .reconstruct(signing_root, quorum, &self.validator_pubkey)?;
            post_consensus_sigs.insert(*object_root, sig);
        }
        let pre_consensus_sigs = self.state.reconstructed_pre_consensus_signatures();

        match self.role.submit(&decided, &post_consensus_sigs, &pre_consensus_sigs, self.beacon.as_ref()) {
            Ok(()) => {
                self.state.finished = true;
                if let Some(storage) = &self.storage {
                    storage.save_highest_decided(self.share.validator_public_key, self.role.role(), Height::new(decided.duty.slot))?;
                }
                info!(role = %self.role.role(), slot = decided.duty.slot, "duty finished");
                Ok(())
            }
            Err(error) => {
                warn!(role = %self.role.role(), error = %error, "duty submission failed");
                self.state.failed = Some(error.to_string());
                Err(error)
            }
        }
    }

    fn ingest_partial_signature(&mut self, msg: PartialSignatureMessage, pre_consensus: bool) -> Result<(), Error> {
        if !self.share.committee.contains(msg.signer) {
            return Err(Error::UnknownSigner(msg.signer));
        }
        let pubkey = self.share.public_key_share(msg.signer).map_err(|_| Error::UnknownSigner(msg.signer))?;
        let sig = Signature::from_bytes(&msg.signature).map_err(|_| Error::MalformedMsg("bad signature encoding".into()))?;
        if !sig.verify(&msg.root, pubkey.point()) {
            return Err(Error::WrongSignature);
        }

        let container: &mut PartialSignatureContainer = if pre_consensus {
            &mut self.state.pre_consensus
        } else {
            &mut self.state.post_consensus
        };
        match container.add(msg.root, msg.signer, sig) {
            PartialInsert::Accepted => Ok(()),
            PartialInsert::Equivocation => Err(Error::Equivocation(msg.signer)),
        }
    }

    fn broadcast_partial_signature(&self, phase: PartialSigPhase, root: [u8; 32], signature: Signature) -> Result<(), Error> {
        let message = PartialSignatureMessage {
            phase,
            signer: self.share.operator_id,
            root,
            signature: signature.to_bytes(),
        };
        let data = serde_json::to_vec(&message).map_err(|error| Error::MalformedMsg(error.to_string()))?;
        let msg_id = MessageId::new(self.share.validator_public_key, self.role.role());
        self.network.broadcast(SsvMessage::new(MsgType::PartialSignature, msg_id, data))
    }

    fn broadcast_consensus_message(&self, message: QbftMessage) -> Result<(), Error> {
        let data = ethereum_ssz::Encode::as_ssz_bytes(&message);
        let msg_id = MessageId::new(self.share.validator_public_key, self.role.role());
        self.network.broadcast(SsvMessage::new(MsgType::Consensus, msg_id, data))
    }
}
