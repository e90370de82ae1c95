//! Aggregator: signs the duty's slot under `DomainType::SELECTION_PROOF` in
//! pre-consensus, embeds the reconstructed selection proof directly in the
//! `AggregateAndProof` it proposes to consensus (spec §4.3's "Aggregator"
//! role specifics).

use std::collections::HashMap;

use ssv_crypto::{DomainType, HashTreeRoot, Signature};
use ssv_types::{AggregateAndProof, BeaconRole, ConsensusData, Duty, DutyPayload, Error, SignedAggregateAndProof};

use crate::beacon_node::BeaconNode;
use crate::role::RoleBehavior;
use crate::roles::{check_role_and_validator_index, tagged_u64_root};

#[derive(Default)]
pub struct AggregatorRole;

impl RoleBehavior for AggregatorRole {
    fn role(&self) -> BeaconRole {
        BeaconRole::Aggregator
    }

    fn requires_pre_consensus(&self) -> bool {
        true
    }

    fn pre_consensus_roots(&self, duty: &Duty) -> Vec<[u8; 32]> {
        vec![tagged_u64_root(b"slot", duty.slot)]
    }

    fn pre_consensus_domain(&self) -> DomainType {
        DomainType::SELECTION_PROOF
    }

    fn build_consensus_input(
        &self,
        duty: &Duty,
        beacon: &dyn BeaconNode,
        pre_consensus_sigs: Option<&HashMap<[u8; 32], Signature>>,
    ) -> Result<ConsensusData, Error> {
        let root = tagged_u64_root(b"slot", duty.slot);
        let selection_proof = pre_consensus_sigs
            .and_then(|sigs| sigs.get(&root))
            .ok_or(Error::Reconstruction)?
            .to_bytes();

        let aggregate = beacon.get_aggregate_attestation(duty.slot, duty.committee_index)?;

        let aggregate_and_proof = AggregateAndProof {
            aggregator_index: duty.validator_index,
            aggregate,
            selection_proof,
        };
        Ok(ConsensusData {
            duty: duty.clone(),
            payload: DutyPayload::AggregateAndProof(aggregate_and_proof),
        })
    }

    fn post_consensus_roots(&self, decided: &ConsensusData) -> Vec<[u8; 32]> {
        vec![decided.payload.hash_tree_root()]
    }

    fn post_consensus_domain(&self) -> DomainType {
        DomainType::AGGREGATE_AND_PROOF
    }

    fn submit(
        &self,
        decided: &ConsensusData,
        post_consensus_sigs: &HashMap<[u8; 32], Signature>,
        _pre_consensus_sigs: &HashMap<[u8; 32], Signature>,
        beacon: &dyn BeaconNode,
    ) -> Result<(), Error> {
        let DutyPayload::AggregateAndProof(message) = &decided.payload else {
            return Err(Error::ValueCheck("decided value is not an AggregateAndProof payload".into()));
        };
        let root = decided.payload.hash_tree_root();
        let signature = post_consensus_sigs.get(&root).ok_or(Error::Reconstruction)?;

        let signed = SignedAggregateAndProof {
            message: message.clone(),
            signature: signature.to_bytes(),
        };
        beacon.submit_aggregate_and_proof(&signed)
    }

    fn value_check(&self, value: &ConsensusData, expected_validator_index: u64) -> Result<(), Error> {
        check_role_and_validator_index(value, BeaconRole::Aggregator, expected_validator_index)?;
        let DutyPayload::AggregateAndProof(message) = &value.payload else {
            return Err(Error::ValueCheck("duty invalid: aggregator duty missing AggregateAndProof payload".into()));
        };
        if message.aggregator_index != value.duty.validator_index {
            return Err(Error::ValueCheck("duty invalid: aggregate aggregator index does not match duty".into()));
        }
        if message.aggregate.data.slot != value.duty.slot {
            return Err(Error::ValueCheck("duty invalid: aggregate slot does not match duty slot".into()));
        }
        Ok(())
    }
}
