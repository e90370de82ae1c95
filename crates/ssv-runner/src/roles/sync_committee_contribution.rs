//! SyncCommitteeContribution: the one role that operates on a *batch* of
//! roots rather than a single one, because a validator can sit in more than
//! one sync-committee subnet at once (spec §4.3's "SyncCommitteeContribution"
//! role specifics). Pre-consensus signs one selection proof per subnet;
//! post-consensus signs one contribution root per subnet; `submit` reports
//! one `SignedContributionAndProof` per subnet.

use std::collections::HashMap;

use ssv_crypto::{contribution_roots, DomainType, Signature};
use ssv_types::{BeaconRole, ConsensusData, Duty, DutyPayload, Error};

use crate::beacon_node::{wrap_contribution, BeaconNode};
use crate::role::RoleBehavior;
use crate::roles::{check_role_and_validator_index, tagged_u64_root};

#[derive(Default)]
pub struct SyncCommitteeContributionRole;

/// The root a given subcommittee index's pre-consensus selection proof
/// signs: slot and subnet index, tagged so it can't collide with a plain
/// `tagged_u64_root(b"slot", ...)` used by other roles.
fn selection_proof_root(slot: u64, subcommittee_index: u64) -> [u8; 32] {
    let mut tag = Vec::with_capacity(16);
    tag.extend_from_slice(b"sync-selection");
    tag.extend_from_slice(&subcommittee_index.to_le_bytes());
    tagged_u64_root(&tag, slot)
}

impl RoleBehavior for SyncCommitteeContributionRole {
    fn role(&self) -> BeaconRole {
        BeaconRole::SyncCommitteeContribution
    }

    fn requires_pre_consensus(&self) -> bool {
        true
    }

    fn pre_consensus_roots(&self, duty: &Duty) -> Vec<[u8; 32]> {
        duty.subcommittee_indices
            .iter()
            .map(|&index| selection_proof_root(duty.slot, index))
            .collect()
    }

    fn pre_consensus_domain(&self) -> DomainType {
        DomainType::SYNC_COMMITTEE_SELECTION_PROOF
    }

    fn build_consensus_input(
        &self,
        duty: &Duty,
        beacon: &dyn BeaconNode,
        _pre_consensus_sigs: Option<&HashMap<[u8; 32], Signature>>,
    ) -> Result<ConsensusData, Error> {
        if duty.subcommittee_indices.is_empty() {
            return Err(Error::ValueCheck("duty invalid: no subcommittee indices assigned".into()));
        }
        let block_root = beacon.get_sync_message_block_root(duty.slot)?;
        let contributions = duty
            .subcommittee_indices
            .iter()
            .map(|&index| beacon.get_sync_committee_contribution(duty.slot, index, block_root))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ConsensusData {
            duty: duty.clone(),
            payload: DutyPayload::SyncCommitteeContributions(contributions),
        })
    }

    fn post_consensus_roots(&self, decided: &ConsensusData) -> Vec<[u8; 32]> {
        let DutyPayload::SyncCommitteeContributions(contributions) = &decided.payload else {
            return Vec::new();
        };
        contribution_roots(contributions)
    }

    fn post_consensus_domain(&self) -> DomainType {
        DomainType::CONTRIBUTION_AND_PROOF
    }

    fn submit(
        &self,
        decided: &ConsensusData,
        post_consensus_sigs: &HashMap<[u8; 32], Signature>,
        pre_consensus_sigs: &HashMap<[u8; 32], Signature>,
        beacon: &dyn BeaconNode,
    ) -> Result<(), Error> {
        let DutyPayload::SyncCommitteeContributions(contributions) = &decided.payload else {
            return Err(Error::ValueCheck("decided value is not a SyncCommitteeContributions payload".into()));
        };

        for contribution in contributions {
            let post_root = ssv_crypto::contribution_root(contribution);
            let post_sig = post_consensus_sigs.get(&post_root).ok_or(Error::Reconstruction)?;

            let selection_root = selection_proof_root(decided.duty.slot, contribution.subcommittee_index);
            let selection_sig = pre_consensus_sigs.get(&selection_root).ok_or(Error::Reconstruction)?;

            let message = wrap_contribution(decided.duty.validator_index, contribution.clone(), selection_sig.to_bytes());
            let signed = ssv_types::SignedContributionAndProof {
                message,
                signature: post_sig.to_bytes(),
            };
            beacon.submit_contribution_and_proof(&signed)?;
        }
        Ok(())
    }

    fn value_check(&self, value: &ConsensusData, expected_validator_index: u64) -> Result<(), Error> {
        check_role_and_validator_index(value, BeaconRole::SyncCommitteeContribution, expected_validator_index)?;
        let DutyPayload::SyncCommitteeContributions(contributions) = &value.payload else {
            return Err(Error::ValueCheck(
                "duty invalid: sync committee contribution duty missing SyncCommitteeContributions payload".into(),
            ));
        };
        if contributions.is_empty() {
            return Err(Error::ValueCheck("duty invalid: no contributions in payload".into()));
        }
        if contributions.len() != value.duty.subcommittee_indices.len() {
            return Err(Error::ValueCheck(
                "duty invalid: contribution count does not match duty's subcommittee indices".into(),
            ));
        }
        for contribution in contributions {
            if contribution.slot != value.duty.slot {
                return Err(Error::ValueCheck("duty invalid: contribution slot does not match duty slot".into()));
            }
            if !value.duty.subcommittee_indices.contains(&contribution.subcommittee_index) {
                return Err(Error::ValueCheck("duty invalid: contribution subnet not in duty's subcommittee indices".into()));
            }
        }
        Ok(())
    }
}
