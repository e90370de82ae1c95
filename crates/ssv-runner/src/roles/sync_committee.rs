//! SyncCommittee: no pre-consensus phase; decides the beacon block root the
//! validator attests to for this slot's sync committee message (spec §4.3's
//! "SyncCommittee" role specifics).

use std::collections::HashMap;

use ssv_crypto::{DomainType, HashTreeRoot, Signature};
use ssv_types::{BeaconRole, ConsensusData, Duty, DutyPayload, Error, SyncCommitteeMessage};

use crate::beacon_node::BeaconNode;
use crate::role::RoleBehavior;
use crate::roles::check_role_and_validator_index;

#[derive(Default)]
pub struct SyncCommitteeRole;

impl RoleBehavior for SyncCommitteeRole {
    fn role(&self) -> BeaconRole {
        BeaconRole::SyncCommittee
    }

    fn requires_pre_consensus(&self) -> bool {
        false
    }

    fn pre_consensus_roots(&self, _duty: &Duty) -> Vec<[u8; 32]> {
        Vec::new()
    }

    fn pre_consensus_domain(&self) -> DomainType {
        DomainType::SYNC_COMMITTEE
    }

    fn build_consensus_input(
        &self,
        duty: &Duty,
        beacon: &dyn BeaconNode,
        _pre_consensus_sigs: Option<&HashMap<[u8; 32], Signature>>,
    ) -> Result<ConsensusData, Error> {
        let root = beacon.get_sync_message_block_root(duty.slot)?;
        Ok(ConsensusData {
            duty: duty.clone(),
            payload: DutyPayload::SyncCommitteeRoot(root),
        })
    }

    fn post_consensus_roots(&self, decided: &ConsensusData) -> Vec<[u8; 32]> {
        vec![decided.payload.hash_tree_root()]
    }

    fn post_consensus_domain(&self) -> DomainType {
        DomainType::SYNC_COMMITTEE
    }

    fn submit(
        &self,
        decided: &ConsensusData,
        post_consensus_sigs: &HashMap<[u8; 32], Signature>,
        _pre_consensus_sigs: &HashMap<[u8; 32], Signature>,
        beacon: &dyn BeaconNode,
    ) -> Result<(), Error> {
        let DutyPayload::SyncCommitteeRoot(beacon_block_root) = &decided.payload else {
            return Err(Error::ValueCheck("decided value is not a SyncCommitteeRoot payload".into()));
        };
        let root = decided.payload.hash_tree_root();
        let signature = post_consensus_sigs.get(&root).ok_or(Error::Reconstruction)?;

        let message = SyncCommitteeMessage {
            slot: decided.duty.slot,
            beacon_block_root: *beacon_block_root,
            validator_index: decided.duty.validator_index,
            signature: signature.to_bytes(),
        };
        beacon.submit_sync_committee_message(&message)
    }

    fn value_check(&self, value: &ConsensusData, expected_validator_index: u64) -> Result<(), Error> {
        check_role_and_validator_index(value, BeaconRole::SyncCommittee, expected_validator_index)?;
        let DutyPayload::SyncCommitteeRoot(_) = &value.payload else {
            return Err(Error::ValueCheck("duty invalid: sync committee duty missing SyncCommitteeRoot payload".into()));
        };
        Ok(())
    }
}
