//! Proposer: signs the duty's epoch under `DomainType::RANDAO` in
//! pre-consensus so the reconstructed signature can be handed to the beacon
//! node as the block's randao reveal before consensus ever starts (spec
//! §4.3's "Proposer" role specifics).

use std::collections::HashMap;

use ssv_crypto::{DomainType, HashTreeRoot, Signature};
use ssv_types::{BeaconRole, ConsensusData, Duty, DutyPayload, Error, SignedBeaconBlock};

use crate::beacon_node::BeaconNode;
use crate::role::RoleBehavior;
use crate::roles::{check_role_and_validator_index, tagged_u64_root};

#[derive(Default)]
pub struct ProposerRole;

/// Fixed, empty graffiti; block-building embedders that want custom graffiti
/// override at the `BeaconNode` implementation boundary, not here.
const GRAFFITI: [u8; 32] = [0u8; 32];

impl RoleBehavior for ProposerRole {
    fn role(&self) -> BeaconRole {
        BeaconRole::Proposer
    }

    fn requires_pre_consensus(&self) -> bool {
        true
    }

    fn pre_consensus_roots(&self, duty: &Duty) -> Vec<[u8; 32]> {
        vec![tagged_u64_root(b"epoch", duty.epoch())]
    }

    fn pre_consensus_domain(&self) -> DomainType {
        DomainType::RANDAO
    }

    fn build_consensus_input(
        &self,
        duty: &Duty,
        beacon: &dyn BeaconNode,
        pre_consensus_sigs: Option<&HashMap<[u8; 32], Signature>>,
    ) -> Result<ConsensusData, Error> {
        let root = tagged_u64_root(b"epoch", duty.epoch());
        let randao_reveal = pre_consensus_sigs
            .and_then(|sigs| sigs.get(&root))
            .ok_or(Error::Reconstruction)?
            .to_bytes();
        let header = beacon.get_beacon_block(duty.slot, randao_reveal, GRAFFITI)?;
        Ok(ConsensusData {
            duty: duty.clone(),
            payload: DutyPayload::Block(header),
        })
    }

    fn post_consensus_roots(&self, decided: &ConsensusData) -> Vec<[u8; 32]> {
        vec![decided.payload.hash_tree_root()]
    }

    fn post_consensus_domain(&self) -> DomainType {
        DomainType::PROPOSER
    }

    fn submit(
        &self,
        decided: &ConsensusData,
        post_consensus_sigs: &HashMap<[u8; 32], Signature>,
        _pre_consensus_sigs: &HashMap<[u8; 32], Signature>,
        beacon: &dyn BeaconNode,
    ) -> Result<(), Error> {
        let DutyPayload::Block(header) = &decided.payload else {
            return Err(Error::ValueCheck("decided value is not a BeaconBlockHeader payload".into()));
        };
        let root = decided.payload.hash_tree_root();
        let signature = post_consensus_sigs.get(&root).ok_or(Error::Reconstruction)?;

        let block = SignedBeaconBlock {
            header: *header,
            signature: signature.to_bytes(),
        };
        beacon.submit_beacon_block(&block)
    }

    fn value_check(&self, value: &ConsensusData, expected_validator_index: u64) -> Result<(), Error> {
        check_role_and_validator_index(value, BeaconRole::Proposer, expected_validator_index)?;
        let DutyPayload::Block(header) = &value.payload else {
            return Err(Error::ValueCheck("duty invalid: proposer duty missing BeaconBlockHeader payload".into()));
        };
        if header.slot != value.duty.slot {
            return Err(Error::ValueCheck("duty invalid: block slot does not match duty slot".into()));
        }
        if header.proposer_index != value.duty.validator_index {
            return Err(Error::ValueCheck("duty invalid: block proposer index does not match duty".into()));
        }
        Ok(())
    }
}
