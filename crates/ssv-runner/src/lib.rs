//! Duty runner: pre-consensus, consensus, and post-consensus orchestration
//! for the five beacon-chain duty roles, built on `ssv-qbft` and
//! `ssv-partial-sig`.

pub mod beacon_node;
pub mod message;
pub mod network;
pub mod role;
pub mod roles;
pub mod runner;
pub mod state;
pub mod storage;

pub use beacon_node::{wrap_contribution, BeaconNode};
pub use message::{PartialSigPhase, PartialSignatureMessage};
pub use network::Network;
pub use role::RoleBehavior;
pub use roles::{AggregatorRole, AttesterRole, ProposerRole, SyncCommitteeContributionRole, SyncCommitteeRole};
pub use runner::BaseRunner;
pub use state::RunnerState;
pub use storage::Storage;
