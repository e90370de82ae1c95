//! `RoleBehavior` — the small vtable spec.md §9's design note calls for in
//! place of the source's base-type-plus-interface inheritance: one method
//! group per pipeline stage of spec §4.3, dispatched through a tagged
//! `Arc<dyn RoleBehavior>` rather than five parallel struct hierarchies.

use std::collections::HashMap;

use ssv_crypto::{DomainType, Signature};
use ssv_types::{BeaconRole, ConsensusData, Duty, Error};

use crate::beacon_node::BeaconNode;

/// Behavior specific to one of the five beacon-chain duty roles. A
/// `BaseRunner` holds exactly one `Arc<dyn RoleBehavior>` for its lifetime;
/// switching roles means constructing a new runner, matching spec §3's
/// "one runner per (validator, role)" scoping.
pub trait RoleBehavior: Send + Sync {
    fn role(&self) -> BeaconRole;

    /// Whether this role has a pre-consensus signing phase at all (spec
    /// §4.3: Proposer, Aggregator, SyncCommitteeContribution do; Attester,
    /// SyncCommittee don't).
    fn requires_pre_consensus(&self) -> bool;

    /// Roots to sign under `pre_consensus_domain` before consensus starts.
    /// Empty when `requires_pre_consensus` is false.
    fn pre_consensus_roots(&self, duty: &Duty) -> Vec<[u8; 32]>;

    fn pre_consensus_domain(&self) -> DomainType;

    /// Assembles the value to run through QBFT. `pre_consensus_sigs` holds
    /// one reconstructed signature per `pre_consensus_roots` entry once
    /// pre-consensus quorum is reached, or is `None` for roles with no
    /// pre-consensus phase.
    fn build_consensus_input(
        &self,
        duty: &Duty,
        beacon: &dyn BeaconNode,
        pre_consensus_sigs: Option<&HashMap<[u8; 32], Signature>>,
    ) -> Result<ConsensusData, Error>;

    /// Roots to sign under `post_consensus_domain` once `decided` value is
    /// reached (usually one root — `decided`'s own hash-tree root — except
    /// `SyncCommitteeContribution`, which signs one root per subnet).
    fn post_consensus_roots(&self, decided: &ConsensusData) -> Vec<[u8; 32]>;

    fn post_consensus_domain(&self) -> DomainType;

    /// Assembles the role's final beacon artifact from the decided value
    /// and both phases' reconstructed signatures, and submits it.
    /// `pre_consensus_sigs` is empty for roles with no pre-consensus phase.
    fn submit(
        &self,
        decided: &ConsensusData,
        post_consensus_sigs: &HashMap<[u8; 32], Signature>,
        pre_consensus_sigs: &HashMap<[u8; 32], Signature>,
        beacon: &dyn BeaconNode,
    ) -> Result<(), Error>;

    /// Role-specific duty and payload validation (spec §4.3), called both
    /// by the controller before accepting a Proposal and by the runner
    /// before calling `decide`.
    fn value_check(&self, value: &ConsensusData, expected_validator_index: u64) -> Result<(), Error>;
}
