//! Hash-tree-root identities for the engine's own consensus values, built on
//! real SSZ merkleization rather than an invented digest.
//!
//! The beacon chain's own SSZ types and their `hash_tree_root` are produced
//! by the beacon node, not this engine (see the top-level specification's
//! note that beacon types are an external collaborator). What QBFT needs
//! internally is a stable, collision-resistant identity for a proposed value
//! so rounds can agree on "the same value" and detect equivocation; `Duty`,
//! `DutyPayload`, and `ConsensusData` implement `tree_hash::TreeHash`
//! directly in `ssv-types`, and `HashTreeRoot` here is a thin, `[u8; 32]`
//! wrapper around that so callers don't have to reach for `tree_hash` or
//! `Hash256` themselves.

use sha2::{Digest, Sha256};
use tree_hash::TreeHash;

use ssv_types::{BeaconRole, ConsensusData, Duty, DutyPayload, SyncCommitteeContribution};

/// Produces a 32-byte SSZ hash-tree-root identifying a value for QBFT purposes.
pub trait HashTreeRoot {
    fn hash_tree_root(&self) -> [u8; 32];
}

impl<T: TreeHash> HashTreeRoot for T {
    fn hash_tree_root(&self) -> [u8; 32] {
        TreeHash::tree_hash_root(self).0
    }
}

/// Domain-separates a role into a digest so that two different roles never
/// collide even if their payload bytes happened to match. This is a
/// signing-domain construction, not a type's `hash_tree_root`, so it stays
/// on plain SHA-256 rather than `tree_hash` — the same convention
/// `ssv-qbft`'s per-message `signing_root` helper uses.
pub fn role_separated_root(role: BeaconRole, payload_root: [u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(role.tag());
    hasher.update(payload_root);
    hasher.finalize().into()
}

/// The signing root of a single sync-committee contribution: binds slot,
/// block root, and subcommittee index, but deliberately excludes
/// `aggregation_bits`/`signature` (those are filled in only once the
/// contribution is assembled, after this root is what gets signed).
pub fn contribution_root(contribution: &SyncCommitteeContribution) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(contribution.slot.to_le_bytes());
    hasher.update(contribution.beacon_block_root);
    hasher.update(contribution.subcommittee_index.to_le_bytes());
    hasher.finalize().into()
}

/// Per-contribution roots in the same order as `contributions`, for callers
/// that need to sign or look up each subnet's root individually.
pub fn contribution_roots(contributions: &[SyncCommitteeContribution]) -> Vec<[u8; 32]> {
    contributions.iter().map(contribution_root).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssv_types::{AttestationData, Checkpoint};

    fn sample_duty() -> Duty {
        Duty {
            role: BeaconRole::Attester,
            validator_index: 7,
            slot: 100,
            committee_index: 0,
            validator_committee_index: 2,
            committee_length: 128,
            subcommittee_indices: vec![],
        }
    }

    #[test]
    fn duty_root_is_stable() {
        let duty = sample_duty();
        assert_eq!(duty.hash_tree_root(), duty.hash_tree_root());
    }

    #[test]
    fn different_slots_produce_different_roots() {
        let mut duty = sample_duty();
        let r1 = duty.hash_tree_root();
        duty.slot += 1;
        let r2 = duty.hash_tree_root();
        assert_ne!(r1, r2);
    }

    #[test]
    fn attestation_payload_root_changes_with_target() {
        let base = AttestationData {
            slot: 100,
            index: 0,
            beacon_block_root: [1u8; 32],
            source: Checkpoint { epoch: 3, root: [2u8; 32] },
            target: Checkpoint { epoch: 4, root: [3u8; 32] },
        };
        let mut other = base;
        other.target.epoch += 1;
        assert_ne!(
            DutyPayload::Attestation(base).hash_tree_root(),
            DutyPayload::Attestation(other).hash_tree_root()
        );
    }

    #[test]
    fn consensus_data_root_changes_with_duty() {
        let payload = DutyPayload::SyncCommitteeRoot([9u8; 32]);
        let a = ConsensusData {
            duty: sample_duty(),
            payload: payload.clone(),
        };
        let mut duty_b = sample_duty();
        duty_b.validator_index += 1;
        let b = ConsensusData { duty: duty_b, payload };
        assert_ne!(a.hash_tree_root(), b.hash_tree_root());
    }
}
