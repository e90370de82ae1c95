//! Attester: no pre-consensus phase; decides `AttestationData` directly and
//! signs the decided value's root under `DomainType::ATTESTER` (spec
//! §4.3's "Attester" role specifics).

use std::collections::HashMap;

use ssv_crypto::{DomainType, HashTreeRoot, Signature};
use ssv_types::{Attestation, BeaconRole, ConsensusData, Duty, DutyPayload, Error};

use crate::beacon_node::BeaconNode;
use crate::role::RoleBehavior;
use crate::roles::check_role_and_validator_index;

#[derive(Default)]
pub struct AttesterRole;

impl RoleBehavior for AttesterRole {
    fn role(&self) -> BeaconRole {
        BeaconRole::Attester
    }

    fn requires_pre_consensus(&self) -> bool {
        false
    }

    fn pre_consensus_roots(&self, _duty: &Duty) -> Vec<[u8; 32]> {
        Vec::new()
    }

    fn pre_consensus_domain(&self) -> DomainType {
        DomainType::RANDAO
    }

    fn build_consensus_input(
        &self,
        duty: &Duty,
        beacon: &dyn BeaconNode,
        _pre_consensus_sigs: Option<&HashMap<[u8; 32], Signature>>,
    ) -> Result<ConsensusData, Error> {
        let data = beacon.get_attestation_data(duty.slot, duty.committee_index)?;
        Ok(ConsensusData {
            duty: duty.clone(),
            payload: DutyPayload::Attestation(data),
        })
    }

    fn post_consensus_roots(&self, decided: &ConsensusData) -> Vec<[u8; 32]> {
        vec![decided.payload.hash_tree_root()]
    }

    fn post_consensus_domain(&self) -> DomainType {
        DomainType::ATTESTER
    }

    fn submit(
        &self,
        decided: &ConsensusData,
        post_consensus_sigs: &HashMap<[u8; 32], Signature>,
        _pre_consensus_sigs: &HashMap<[u8; 32], Signature>,
        beacon: &dyn BeaconNode,
    ) -> Result<(), Error> {
        let DutyPayload::Attestation(data) = &decided.payload else {
            return Err(Error::ValueCheck("decided value is not an AttestationData payload".into()));
        };
        let root = decided.payload.hash_tree_root();
        let signature = post_consensus_sigs.get(&root).ok_or(Error::Reconstruction)?;

        let committee_length = decided.duty.committee_length as usize;
        let index = decided.duty.validator_committee_index;
        if index >= committee_length {
            return Err(Error::ValueCheck("duty invalid: validator committee index out of range".into()));
        }
        let mut aggregation_bits = vec![false; committee_length];
        aggregation_bits[index] = true;

        let attestation = Attestation {
            aggregation_bits,
            data: *data,
            signature: signature.to_bytes(),
        };
        beacon.submit_attestation(&attestation)
    }

    fn value_check(&self, value: &ConsensusData, expected_validator_index: u64) -> Result<(), Error> {
        check_role_and_validator_index(value, BeaconRole::Attester, expected_validator_index)?;
        let DutyPayload::Attestation(data) = &value.payload else {
            return Err(Error::ValueCheck("duty invalid: attester duty missing AttestationData payload".into()));
        };
        if data.slot != value.duty.slot {
            return Err(Error::ValueCheck("duty invalid: attestation slot does not match duty slot".into()));
        }
        if data.index != value.duty.committee_index {
            return Err(Error::ValueCheck("duty invalid: attestation committee index does not match duty".into()));
        }
        if value.duty.validator_committee_index >= value.duty.committee_length as usize {
            return Err(Error::ValueCheck("duty invalid: validator committee index out of range".into()));
        }
        Ok(())
    }
}
