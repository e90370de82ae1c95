//! Integration scenarios from the top-level specification's testable-properties
//! section: the attester happy path (scenario 1), a Byzantine proposer
//! forcing a round-change fast-forward with a prepared-value justification
//! (scenario 2), late-commit repair after an instance has already decided
//! (scenario 3), and equivocation detection (scenario 4).

use std::collections::HashMap;

use ssv_crypto::{PublicKeyShare, SecretKeyShare, Signature};
use ssv_qbft::{Controller, Instance, QbftSigner, ValueCheck};
use ssv_types::{
    AttestationData, Checkpoint, Committee, ConsensusData, Duty, BeaconRole, Error, Height, OperatorId, Round,
};

struct AlwaysValid;
impl ValueCheck for AlwaysValid {
    fn check(&self, _value: &ConsensusData) -> Result<(), Error> {
        Ok(())
    }
}

struct TestSigner<'a> {
    id: OperatorId,
    secret: &'a SecretKeyShare,
    public_keys: &'a HashMap<OperatorId, PublicKeyShare>,
}

impl QbftSigner for TestSigner<'_> {
    fn operator_id(&self) -> OperatorId {
        self.id
    }

    fn sign(&self, root: [u8; 32]) -> Signature {
        self.secret.sign(&root)
    }

    fn public_key_share(&self, operator: OperatorId) -> Option<PublicKeyShare> {
        self.public_keys.get(&operator).copied()
    }
}

fn committee(n: u64) -> Committee {
    Committee::new((1..=n).map(OperatorId::new))
}

fn sample_value(root_byte: u8) -> ConsensusData {
    ConsensusData {
        duty: Duty {
            role: BeaconRole::Attester,
            validator_index: 1,
            slot: 100,
            committee_index: 0,
            validator_committee_index: 0,
            committee_length: 4,
            subcommittee_indices: vec![],
        },
        payload: ssv_types::DutyPayload::Attestation(AttestationData {
            slot: 100,
            index: 0,
            beacon_block_root: [root_byte; 32],
            source: Checkpoint { epoch: 1, root: [0u8; 32] },
            target: Checkpoint { epoch: 2, root: [1u8; 32] },
        }),
    }
}

fn keys(n: u64) -> (HashMap<OperatorId, SecretKeyShare>, HashMap<OperatorId, PublicKeyShare>) {
    let mut rng = rand::rngs::OsRng;
    let mut secrets = HashMap::new();
    let mut publics = HashMap::new();
    for id in 1..=n {
        let sk = SecretKeyShare::random(&mut rng);
        publics.insert(OperatorId::new(id), sk.public_key_share());
        secrets.insert(OperatorId::new(id), sk);
    }
    (secrets, publics)
}

#[test]
fn attester_happy_path_four_operators_quorum_three() {
    let n = 4;
    let (secrets, publics) = keys(n);
    let committee_set = committee(n);
    let value = sample_value(7);

    let mut instances: HashMap<OperatorId, Instance> = HashMap::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        instances.insert(id, Instance::new(Height::new(1), committee_set.clone(), id, Box::new(AlwaysValid)));
    }

    let proposer = committee_set.proposer(1, 0);
    let proposer_signer = TestSigner {
        id: proposer,
        secret: &secrets[&proposer],
        public_keys: &publics,
    };
    let outcome = instances.get_mut(&proposer).unwrap().start(value.clone(), &proposer_signer).unwrap();
    assert_eq!(outcome.broadcast.len(), 1);
    let ssv_qbft::QbftMessage::Proposal(proposal_msg) = outcome.broadcast.into_iter().next().unwrap() else {
        panic!("expected proposal broadcast");
    };

    // Every operator (including the proposer, for a realistic self-delivery
    // broadcast model) processes the proposal and emits a Prepare.
    let mut prepares = Vec::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        let signer = TestSigner {
            id,
            secret: &secrets[&id],
            public_keys: &publics,
        };
        let outcome = instances.get_mut(&id).unwrap().process_proposal(proposal_msg.clone(), &signer).unwrap();
        prepares.extend(outcome.broadcast);
    }
    assert_eq!(prepares.len(), n as usize);

    let mut commits = Vec::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        let signer = TestSigner {
            id,
            secret: &secrets[&id],
            public_keys: &publics,
        };
        for prepare in &prepares {
            let ssv_qbft::QbftMessage::Prepare(p) = prepare.clone() else { unreachable!() };
            let outcome = instances.get_mut(&id).unwrap().process_prepare(p, &signer).unwrap();
            commits.extend(outcome.broadcast);
        }
    }
    assert_eq!(commits.len(), n as usize);

    let mut decided_roots = Vec::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        let signer = TestSigner {
            id,
            secret: &secrets[&id],
            public_keys: &publics,
        };
        for commit in &commits {
            let ssv_qbft::QbftMessage::Commit(c) = commit.clone() else { unreachable!() };
            let outcome = instances.get_mut(&id).unwrap().process_commit(c, &signer).unwrap();
            if let Some(decided) = outcome.newly_decided {
                decided_roots.push(decided.root);
            }
        }
    }

    assert_eq!(decided_roots.len(), n as usize);
    assert!(decided_roots.windows(2).all(|w| w[0] == w[1]), "all operators must decide the same value");
}

#[test]
fn equivocating_prepare_is_rejected() {
    let n = 4;
    let (secrets, publics) = keys(n);
    let committee_set = committee(n);
    let mut instance = Instance::new(Height::new(1), committee_set.clone(), OperatorId::new(1), Box::new(AlwaysValid));

    let proposer = committee_set.proposer(1, 0);
    let proposer_signer = TestSigner {
        id: proposer,
        secret: &secrets[&proposer],
        public_keys: &publics,
    };
    let mut proposer_instance = Instance::new(Height::new(1), committee_set.clone(), proposer, Box::new(AlwaysValid));
    let outcome = proposer_instance.start(sample_value(1), &proposer_signer).unwrap();
    let ssv_qbft::QbftMessage::Proposal(proposal_msg) = outcome.broadcast.into_iter().next().unwrap() else {
        panic!()
    };

    let signer1 = TestSigner {
        id: OperatorId::new(2),
        secret: &secrets[&OperatorId::new(2)],
        public_keys: &publics,
    };
    instance.process_proposal(proposal_msg, &signer1).unwrap();

    let equivocator_signer = TestSigner {
        id: OperatorId::new(3),
        secret: &secrets[&OperatorId::new(3)],
        public_keys: &publics,
    };
    let prepare_a = ssv_qbft::PrepareData {
        height: Height::new(1),
        round: Round::FIRST,
        root: [1u8; 32],
    };
    let sig_a = equivocator_signer.sign(prepare_a.signing_root());
    let msg_a = ssv_types::SignedMessage::single(OperatorId::new(3), ssv_types::AggregateSignature::new(sig_a.to_bytes()), prepare_a);
    instance.process_prepare(msg_a, &equivocator_signer).unwrap();

    let prepare_b = ssv_qbft::PrepareData {
        height: Height::new(1),
        round: Round::FIRST,
        root: [2u8; 32],
    };
    let sig_b = equivocator_signer.sign(prepare_b.signing_root());
    let msg_b = ssv_types::SignedMessage::single(OperatorId::new(3), ssv_types::AggregateSignature::new(sig_b.to_bytes()), prepare_b);
    let result = instance.process_prepare(msg_b, &equivocator_signer);
    assert!(matches!(result, Err(Error::Equivocation(_))));
}

/// Spec §8 scenario 2: a proposer who never follows up at round 1 leaves
/// three of four operators prepared but undecided. All four time out,
/// broadcast round-changes for round 2, and the round-2 proposer gathers a
/// quorum of them — fast-forwarding every operator to round 2 and
/// reproposing the already-prepared value under a round-change
/// justification, which the rest of the committee must accept.
#[test]
fn byzantine_proposer_round_change_fast_forwards_with_prepared_justification() {
    let n = 4;
    let (secrets, publics) = keys(n);
    let committee_set = committee(n);
    let value = sample_value(7);

    let mut instances: HashMap<OperatorId, Instance> = HashMap::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        instances.insert(id, Instance::new(Height::new(1), committee_set.clone(), id, Box::new(AlwaysValid)));
    }
    let signer_for = |id: OperatorId| TestSigner {
        id,
        secret: &secrets[&id],
        public_keys: &publics,
    };

    let proposer1 = committee_set.proposer(1, 0);
    let outcome = instances.get_mut(&proposer1).unwrap().start(value.clone(), &signer_for(proposer1)).unwrap();
    let ssv_qbft::QbftMessage::Proposal(proposal_msg) = outcome.broadcast.into_iter().next().unwrap() else {
        panic!("expected proposal broadcast");
    };

    let mut prepares = Vec::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        let outcome = instances.get_mut(&id).unwrap().process_proposal(proposal_msg.clone(), &signer_for(id)).unwrap();
        prepares.extend(outcome.broadcast);
    }
    assert_eq!(prepares.len(), n as usize);

    // Operators 1-3 hear a quorum of prepares and become Prepared at round
    // 1; operator 4 is partitioned off and never sees them, mirroring a
    // stalling proposer that leaves the committee stuck.
    let prepared_operators: Vec<OperatorId> = (1..=3).map(OperatorId::new).collect();
    for &id in &prepared_operators {
        for prepare in &prepares {
            let ssv_qbft::QbftMessage::Prepare(p) = prepare.clone() else { unreachable!() };
            instances.get_mut(&id).unwrap().process_prepare(p, &signer_for(id)).unwrap();
        }
        assert_eq!(instances[&id].state(), ssv_qbft::InstanceState::Prepared);
    }
    assert_eq!(instances[&OperatorId::new(4)].state(), ssv_qbft::InstanceState::ProposalAccepted);

    // Every operator's round-1 timer fires; each broadcasts a RoundChange
    // for round 2, the three prepared operators carrying their prepared claim.
    let mut round_changes = Vec::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        let outcome = instances.get_mut(&id).unwrap().timeout(&signer_for(id)).unwrap();
        round_changes.extend(outcome.broadcast);
    }
    assert_eq!(round_changes.len(), n as usize);

    let proposer2 = committee_set.proposer(1, 1);
    let mut reproposal = None;
    for id in 1..=n {
        let id = OperatorId::new(id);
        for rc in &round_changes {
            let ssv_qbft::QbftMessage::RoundChange(m) = rc.clone() else { unreachable!() };
            let outcome = instances.get_mut(&id).unwrap().process_round_change(m, &signer_for(id)).unwrap();
            if id == proposer2 {
                for broadcast in outcome.broadcast {
                    if let ssv_qbft::QbftMessage::Proposal(p) = broadcast {
                        reproposal = Some(p);
                    }
                }
            }
        }
        assert_eq!(
            instances[&id].current_round(),
            Round::new(2),
            "operator {id} must fast-forward past the stalled proposer's round"
        );
    }

    let reproposal =
        reproposal.expect("a quorum of round-changes at round 2 must trigger a reproposal from its designated proposer");
    assert_eq!(reproposal.data.round, Round::new(2));
    assert_eq!(reproposal.data.value, value, "reproposal must carry the already-prepared value forward");
    assert!(
        reproposal.data.justification.is_some(),
        "reproposal must carry a round-change justification proving the prepared-value claim"
    );

    // Every operator, including the reproposing proposer, must accept the
    // justified round-2 proposal.
    for id in 1..=n {
        let id = OperatorId::new(id);
        let result = instances.get_mut(&id).unwrap().process_proposal(reproposal.clone(), &signer_for(id));
        assert!(result.is_ok(), "operator {id} must accept the justified round-2 reproposal: {result:?}");
    }
}

/// Spec §8 scenario 3: once an instance has decided with a bare quorum of
/// commits, a late-arriving commit from the remaining operator must be
/// folded into the decided aggregate rather than rejected or re-fired as a
/// fresh decision.
#[test]
fn late_commit_after_decision_enlarges_decided_aggregate() {
    let n = 4;
    let (secrets, publics) = keys(n);
    let committee_set = committee(n);
    let value = sample_value(3);

    let mut instances: HashMap<OperatorId, Instance> = HashMap::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        instances.insert(id, Instance::new(Height::new(1), committee_set.clone(), id, Box::new(AlwaysValid)));
    }
    let signer_for = |id: OperatorId| TestSigner {
        id,
        secret: &secrets[&id],
        public_keys: &publics,
    };

    let proposer = committee_set.proposer(1, 0);
    let outcome = instances.get_mut(&proposer).unwrap().start(value.clone(), &signer_for(proposer)).unwrap();
    let ssv_qbft::QbftMessage::Proposal(proposal_msg) = outcome.broadcast.into_iter().next().unwrap() else {
        panic!("expected proposal broadcast");
    };

    let mut prepares = Vec::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        let outcome = instances.get_mut(&id).unwrap().process_proposal(proposal_msg.clone(), &signer_for(id)).unwrap();
        prepares.extend(outcome.broadcast);
    }

    let mut commits = Vec::new();
    for id in 1..=n {
        let id = OperatorId::new(id);
        for prepare in &prepares {
            let ssv_qbft::QbftMessage::Prepare(p) = prepare.clone() else { unreachable!() };
            let outcome = instances.get_mut(&id).unwrap().process_prepare(p, &signer_for(id)).unwrap();
            commits.extend(outcome.broadcast);
        }
    }
    assert_eq!(commits.len(), n as usize);

    // Operator 1 only hears the first three commits at first — a bare
    // quorum — and decides without operator 4's.
    let watched = OperatorId::new(1);
    let mut newly_decided = None;
    for commit in &commits[..3] {
        let ssv_qbft::QbftMessage::Commit(c) = commit.clone() else { unreachable!() };
        let outcome = instances.get_mut(&watched).unwrap().process_commit(c, &signer_for(watched)).unwrap();
        if let Some(decided) = outcome.newly_decided {
            newly_decided = Some(decided);
        }
    }
    let decided = newly_decided.expect("a bare quorum of three commits must decide");
    assert_eq!(decided.signers.len(), 3);

    // Operator 4's commit now arrives late, after the decision. It must be
    // folded into the decided aggregate rather than rejected or re-decided.
    let ssv_qbft::QbftMessage::Commit(late_commit) = commits[3].clone() else { unreachable!() };
    let outcome = instances.get_mut(&watched).unwrap().process_commit(late_commit, &signer_for(watched)).unwrap();
    assert!(outcome.newly_decided.is_none(), "a late commit after decision must not re-fire newly_decided");
    let final_decided = instances[&watched].decided_value().expect("instance remains decided");
    assert_eq!(final_decided.signers.len(), 4, "late commit must enlarge the decided aggregate's signer set");
}

fn signed_commit(height: Height, signer_id: OperatorId) -> ssv_qbft::QbftMessage {
    let commit = ssv_qbft::CommitData {
        height,
        round: Round::FIRST,
        root: [0u8; 32],
    };
    let signed = ssv_types::SignedMessage::single(signer_id, ssv_types::AggregateSignature::new([0u8; 96]), commit);
    ssv_qbft::QbftMessage::Commit(signed)
}

/// A past-height message older than the controller's history window is
/// rejected outright, even though the instance that once lived at that
/// height has long since been pruned from memory. The controller is walked
/// forward through the future-height catch-up path rather than
/// `start_instance`, since catch-up (unlike `start_instance`) never requires
/// the skipped-over heights to have actually decided.
#[test]
fn controller_rejects_message_past_history_window() {
    let n = 4;
    let (secrets, publics) = keys(n);
    let committee_set = committee(n);
    let mut controller = Controller::new(
        OperatorId::new(1),
        committee_set,
        ssv_config::ControllerConfig {
            history_window: 1,
            future_height_buffer_signers: 1,
        },
        Box::new(|| Box::new(AlwaysValid) as Box<dyn ValueCheck>),
    );
    let signer = TestSigner {
        id: OperatorId::new(1),
        secret: &secrets[&OperatorId::new(1)],
        public_keys: &publics,
    };

    // Two distinct signers showing interest in height 2 is a committee of 4's
    // max-faulty-plus-one (1 + 1 = 2), enough for the controller to catch up
    // to it without height 1 ever running.
    let _ = controller.process_message(signed_commit(Height::new(2), OperatorId::new(2)), &signer);
    let _ = controller.process_message(signed_commit(Height::new(2), OperatorId::new(3)), &signer);
    assert_eq!(controller.current_height(), Height::new(2));

    // The same catch-up rule carries the controller on to height 4, which —
    // with a history window of 1 — prunes height 2 out of memory.
    let _ = controller.process_message(signed_commit(Height::new(4), OperatorId::new(2)), &signer);
    let _ = controller.process_message(signed_commit(Height::new(4), OperatorId::new(3)), &signer);
    assert_eq!(controller.current_height(), Height::new(4));

    // A message for height 2 is now two heights behind the current height,
    // outside the window, and must be rejected outright.
    let result = controller.process_message(signed_commit(Height::new(2), OperatorId::new(2)), &signer);
    assert!(matches!(result, Err(Error::Past(2))), "expected Error::Past(2), got {result:?}");
}
