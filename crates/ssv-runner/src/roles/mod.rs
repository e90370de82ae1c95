mod aggregator;
mod attester;
mod proposer;
mod sync_committee;
mod sync_committee_contribution;

pub use aggregator::AggregatorRole;
pub use attester::AttesterRole;
pub use proposer::ProposerRole;
pub use sync_committee::SyncCommitteeRole;
pub use sync_committee_contribution::SyncCommitteeContributionRole;

use sha2::{Digest, Sha256};

/// Roots for pre-consensus objects that have no `HashTreeRoot` impl of
/// their own (a bare `u64` epoch or slot) — domain-separated by a tag so an
/// epoch number and a slot number can never collide into the same root.
pub(crate) fn tagged_u64_root(tag: &[u8], value: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(value.to_le_bytes());
    hasher.finalize().into()
}

pub(crate) fn check_role_and_validator_index(
    value: &ssv_types::ConsensusData,
    role: ssv_types::BeaconRole,
    expected_validator_index: u64,
) -> Result<(), ssv_types::Error> {
    if value.duty.role != role {
        return Err(ssv_types::Error::ValueCheck(format!(
            "duty invalid: expected role {role}, got {}",
            value.duty.role
        )));
    }
    if value.duty.validator_index != expected_validator_index {
        return Err(ssv_types::Error::ValueCheck("duty invalid: wrong validator index".into()));
    }
    Ok(())
}
