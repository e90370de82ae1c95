//! The `BeaconNode` external-interface boundary (spec §6). A runner never
//! talks to a beacon node process directly; it asks this trait for the
//! duty-specific inputs it needs and hands back the artifact it produced.
//! Every method is a synchronous, prompt call per spec §5 — embedders
//! wanting async I/O wrap their client in a blocking adapter rather than
//! this trait growing an `async fn`.

use ssv_types::{
    Attestation, BeaconBlockHeader, ContributionAndProof, Error, SignedAggregateAndProof, SignedBeaconBlock,
    SignedContributionAndProof, SyncCommitteeContribution, SyncCommitteeMessage,
};

/// Queries and submissions a duty runner needs from a beacon node client.
///
/// `get_aggregate_attestation` has no direct analogue in spec.md §6's
/// enumerated list, which only names the getters spec.md's prose discusses
/// by name; the Aggregator role cannot assemble an `AggregateAndProof`
/// without it, so it is added here as the same kind of external query as
/// its four siblings (see `DESIGN.md`).
pub trait BeaconNode: Send + Sync {
    fn get_attestation_data(&self, slot: u64, committee_index: u64) -> Result<ssv_types::AttestationData, Error>;
    fn get_aggregate_attestation(&self, slot: u64, committee_index: u64) -> Result<Attestation, Error>;
    fn get_beacon_block(&self, slot: u64, randao_reveal: [u8; 96], graffiti: [u8; 32]) -> Result<BeaconBlockHeader, Error>;
    fn get_sync_message_block_root(&self, slot: u64) -> Result<[u8; 32], Error>;
    fn get_sync_committee_contribution(
        &self,
        slot: u64,
        subcommittee_index: u64,
        beacon_block_root: [u8; 32],
    ) -> Result<SyncCommitteeContribution, Error>;

    fn submit_attestation(&self, attestation: &Attestation) -> Result<(), Error>;
    fn submit_beacon_block(&self, block: &SignedBeaconBlock) -> Result<(), Error>;
    fn submit_aggregate_and_proof(&self, message: &SignedAggregateAndProof) -> Result<(), Error>;
    fn submit_sync_committee_message(&self, message: &SyncCommitteeMessage) -> Result<(), Error>;
    fn submit_contribution_and_proof(&self, message: &SignedContributionAndProof) -> Result<(), Error>;
}

/// Convenience wrapper used only by `submit`-side role implementations that
/// build a `ContributionAndProof` before wrapping it into its signed form;
/// kept here rather than re-derived per role.
pub fn wrap_contribution(aggregator_index: u64, contribution: SyncCommitteeContribution, selection_proof: [u8; 96]) -> ContributionAndProof {
    ContributionAndProof {
        aggregator_index,
        contribution,
        selection_proof,
    }
}
