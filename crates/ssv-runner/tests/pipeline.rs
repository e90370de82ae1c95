//! Integration coverage for `BaseRunner` beyond what the per-role unit
//! tests exercise in isolation: a duty rejected at value-check before any
//! consensus message is broadcast (spec §8 scenario 6), and a full
//! attester happy path driven end-to-end through four `BaseRunner`s
//! sharing one in-memory message bus, mirroring scenario 1.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use blstrs::Scalar;
use ff::Field;

use ssv_config::{BeaconNetwork, ControllerConfig};
use ssv_crypto::{PublicKeyShare, SecretKeyShare, Share};
use ssv_runner::{AttesterRole, BaseRunner, ProposerRole};
use ssv_types::{
    Attestation, AttestationData, BeaconBlockHeader, BeaconRole, Committee, ConsensusData, Duty, Error, MsgType,
    OperatorId, SignedAggregateAndProof, SignedBeaconBlock, SignedContributionAndProof, SsvMessage,
    SyncCommitteeContribution, SyncCommitteeMessage, ValidatorPublicKey,
};

/// Deals `n` Shamir shares of a fresh degree-`(t-1)` polynomial (same
/// construction `ssv-partial-sig` and `ssv-dkg`'s own tests use) and
/// returns one `ssv_crypto::Share` per operator, all dealt for the same
/// validator public key.
fn dealt_committee(n: u64, t: usize) -> Vec<Share> {
    let mut rng = rand::rngs::OsRng;
    let secret = Scalar::random(&mut rng);
    let mut coeffs = vec![secret];
    for _ in 1..t {
        coeffs.push(Scalar::random(&mut rng));
    }
    let eval = |x: u64| -> Scalar {
        let x = Scalar::from(x);
        let mut acc = Scalar::ZERO;
        let mut power = Scalar::ONE;
        for c in &coeffs {
            acc += *c * power;
            power *= x;
        }
        acc
    };

    let committee = Committee::new((1..=n).map(OperatorId::new));
    let secrets: BTreeMap<OperatorId, SecretKeyShare> = (1..=n)
        .map(|id| (OperatorId::new(id), SecretKeyShare::from_scalar(eval(id))))
        .collect();
    let publics: BTreeMap<OperatorId, PublicKeyShare> =
        secrets.iter().map(|(id, sk)| (*id, sk.public_key_share())).collect();
    let validator_public_key = ValidatorPublicKey::new(SecretKeyShare::from_scalar(secret).public_key_share().to_bytes());

    (1..=n)
        .map(|id| {
            let id = OperatorId::new(id);
            Share::new(id, validator_public_key, committee.clone(), secrets[&id].clone(), publics.clone())
        })
        .collect()
}

/// Records every broadcast `SsvMessage` it's handed, for the test to
/// inspect or redeliver; never fails.
#[derive(Default)]
struct RecordingNetwork {
    sent: RefCell<Vec<SsvMessage>>,
}

impl ssv_runner::Network for RecordingNetwork {
    fn broadcast(&self, message: SsvMessage) -> Result<(), Error> {
        self.sent.borrow_mut().push(message);
        Ok(())
    }
}

struct StubBeacon;

impl ssv_runner::BeaconNode for StubBeacon {
    fn get_attestation_data(&self, slot: u64, committee_index: u64) -> Result<AttestationData, Error> {
        Ok(AttestationData {
            slot,
            index: committee_index,
            beacon_block_root: [9u8; 32],
            source: ssv_types::Checkpoint { epoch: 1, root: [0u8; 32] },
            target: ssv_types::Checkpoint { epoch: 2, root: [1u8; 32] },
        })
    }

    fn get_aggregate_attestation(&self, _slot: u64, _committee_index: u64) -> Result<Attestation, Error> {
        unimplemented!("not exercised by this test")
    }

    fn get_beacon_block(&self, slot: u64, _randao_reveal: [u8; 96], _graffiti: [u8; 32]) -> Result<BeaconBlockHeader, Error> {
        Ok(BeaconBlockHeader {
            slot,
            proposer_index: 99,
            parent_root: [0u8; 32],
            state_root: [0u8; 32],
            body_root: [0u8; 32],
            body_reveal_root: [0u8; 32],
        })
    }

    fn get_sync_message_block_root(&self, _slot: u64) -> Result<[u8; 32], Error> {
        unimplemented!("not exercised by this test")
    }

    fn get_sync_committee_contribution(
        &self,
        _slot: u64,
        _subcommittee_index: u64,
        _beacon_block_root: [u8; 32],
    ) -> Result<SyncCommitteeContribution, Error> {
        unimplemented!("not exercised by this test")
    }

    fn submit_attestation(&self, _attestation: &Attestation) -> Result<(), Error> {
        Ok(())
    }

    fn submit_beacon_block(&self, _block: &SignedBeaconBlock) -> Result<(), Error> {
        Ok(())
    }

    fn submit_aggregate_and_proof(&self, _message: &SignedAggregateAndProof) -> Result<(), Error> {
        Ok(())
    }

    fn submit_sync_committee_message(&self, _message: &SyncCommitteeMessage) -> Result<(), Error> {
        Ok(())
    }

    fn submit_contribution_and_proof(&self, _message: &SignedContributionAndProof) -> Result<(), Error> {
        Ok(())
    }
}

fn new_runner<R: ssv_runner::RoleBehavior + Default + 'static>(
    share: Share,
    validator_index: u64,
    network: Arc<RecordingNetwork>,
) -> BaseRunner {
    BaseRunner::new(
        Arc::new(R::default()),
        share,
        validator_index,
        BeaconNetwork::Mainnet.fork_tag(),
        ControllerConfig::default(),
        Arc::new(StubBeacon),
        network,
        None,
    )
}

/// Spec §8 scenario 6: a Proposer duty whose `validator_index` doesn't
/// match the index this share actually belongs to is rejected at
/// value-check, and no consensus message is ever broadcast — only the
/// pre-consensus (randao) partial signature goes out, since pre-consensus
/// signing has no validator-index check to perform.
#[test]
fn proposer_duty_with_wrong_validator_index_is_rejected_before_consensus() {
    let shares = dealt_committee(4, 3);
    let network = Arc::new(RecordingNetwork::default());
    let mut runner = new_runner::<ProposerRole>(shares[0].clone(), 7, network.clone());

    let duty = Duty {
        role: BeaconRole::Proposer,
        validator_index: 99,
        slot: 100,
        committee_index: 0,
        validator_committee_index: 0,
        committee_length: 4,
        subcommittee_indices: vec![],
    };

    runner.start_new_duty(duty.clone()).expect("pre-consensus signing itself never fails");
    assert_eq!(network.sent.borrow().len(), 1);
    assert_eq!(network.sent.borrow()[0].msg_type, MsgType::PartialSignature);

    // Feed pre-consensus quorum from operators 2 and 3 so the runner
    // proceeds to `execute_duty`, which is where the value-check fires.
    let role = ProposerRole;
    let root = ssv_runner::RoleBehavior::pre_consensus_roots(&role, &duty)[0];
    let domain = ssv_crypto::compute_domain(ssv_crypto::DomainType::RANDAO, BeaconNetwork::Mainnet.fork_tag());
    let signing_root = ssv_crypto::signing_root(root, domain);

    for share in &shares[1..3] {
        let sig = share.secret_share().sign(&signing_root);
        let msg = ssv_runner::PartialSignatureMessage {
            phase: ssv_runner::PartialSigPhase::PreConsensus,
            signer: share.operator_id,
            root: signing_root,
            signature: sig.to_bytes(),
        };
        let result = runner.process_pre_consensus(msg);
        if share.operator_id == shares[2].operator_id {
            // Third contribution reaches quorum (t=3) and triggers
            // `execute_duty`, whose value-check rejects the mismatched
            // validator index.
            assert!(matches!(result, Err(Error::ValueCheck(ref m)) if m == "duty invalid: wrong validator index"));
        } else {
            assert!(result.is_ok());
        }
    }

    // No consensus message was ever broadcast — only the one pre-consensus
    // partial signature from the start of the duty.
    let consensus_messages = network.sent.borrow().iter().filter(|m| m.msg_type == MsgType::Consensus).count();
    assert_eq!(consensus_messages, 0);
}

/// Spec §8 scenario 1: four `BaseRunner`s (one per operator) run the same
/// Attester duty end-to-end over a shared bus — proposal, prepares,
/// commits, and both post-consensus partial signatures — and every
/// operator ends up `finished` having submitted the same attestation
/// signature.
#[test]
fn attester_happy_path_reaches_quorum_and_finishes() {
    let n = 4;
    let shares = dealt_committee(n, 3);
    let networks: Vec<Arc<RecordingNetwork>> = (0..n).map(|_| Arc::new(RecordingNetwork::default())).collect();
    let mut runners: Vec<BaseRunner> = shares
        .iter()
        .zip(&networks)
        .map(|(share, net)| new_runner::<AttesterRole>(share.clone(), share.operator_id.value(), net.clone()))
        .collect();

    let duty = Duty {
        role: BeaconRole::Attester,
        validator_index: 1,
        slot: 100,
        committee_index: 0,
        validator_committee_index: 0,
        committee_length: n as u64,
        subcommittee_indices: vec![],
    };

    for runner in &mut runners {
        runner.start_new_duty(duty.clone()).unwrap();
    }

    // Drain every recorded broadcast and redeliver it to all runners
    // (including its own sender, matching the self-delivery model the
    // `ssv-qbft` tests use) until no runner produces any new traffic.
    loop {
        let mut batch = Vec::new();
        for net in &networks {
            batch.append(&mut net.sent.borrow_mut());
        }
        if batch.is_empty() {
            break;
        }
        for message in batch {
            for runner in &mut runners {
                match message.msg_type {
                    MsgType::Consensus => {
                        let qbft_msg: ssv_qbft::QbftMessage =
                            <ssv_qbft::QbftMessage as ethereum_ssz::Decode>::from_ssz_bytes(&message.data).unwrap();
                        let _ = runner.process_consensus(qbft_msg);
                    }
                    MsgType::PartialSignature => {
                        let partial: ssv_runner::PartialSignatureMessage = serde_json::from_slice(&message.data).unwrap();
                        let _ = runner.process_post_consensus(partial);
                    }
                    MsgType::Dkg => unreachable!("attester duties never carry DKG traffic"),
                }
            }
        }
    }

    for (runner, share) in runners.iter().zip(&shares) {
        assert!(runner.state().finished, "operator {} never finished", share.operator_id);
    }
}
