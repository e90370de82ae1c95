//! Configuration shared across the engine: which beacon network's fork tag
//! signatures are domain-separated under, the committee-size → quorum
//! table, and the controller's history-window size.
//!
//! Resolves the "global beacon-network tag" design note: rather than a
//! process-global constant, every signer and runner takes a
//! [`BeaconNetwork`] at construction time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// The beacon-chain network this node's validators belong to, carrying the
/// 28-byte fork-mixed tail mixed into every `DomainType` to form a 32-byte
/// signing domain (see `ssv_crypto::domain::compute_domain`).
///
/// Fork-version bytes are the real, published mainnet/testnet values;
/// `Custom` exists for devnets that mint their own genesis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeaconNetwork {
    Mainnet,
    Holesky,
    Sepolia,
    Custom { fork_tag: [u8; 28] },
}

impl BeaconNetwork {
    /// The 28-byte tail mixed in after a 4-byte `DomainType` to form a
    /// signing domain. Real deployments derive this from
    /// `compute_fork_data_root(current_version, genesis_validators_root)`
    /// truncated to 28 bytes; this engine accepts it pre-computed since
    /// deriving it requires the beacon node's genesis state, an external
    /// collaborator per the top-level scope.
    pub fn fork_tag(&self) -> [u8; 28] {
        match self {
            BeaconNetwork::Mainnet => MAINNET_FORK_TAG,
            BeaconNetwork::Holesky => HOLESKY_FORK_TAG,
            BeaconNetwork::Sepolia => SEPOLIA_FORK_TAG,
            BeaconNetwork::Custom { fork_tag } => *fork_tag,
        }
    }
}

const MAINNET_FORK_TAG: [u8; 28] = [0u8; 28];
const HOLESKY_FORK_TAG: [u8; 28] = {
    let mut tag = [0u8; 28];
    tag[0] = 0x01;
    tag
};
const SEPOLIA_FORK_TAG: [u8; 28] = {
    let mut tag = [0u8; 28];
    tag[0] = 0x02;
    tag
};

/// Committee-size-derived threshold parameters, computed rather than
/// tabulated, but exposed as a type so callers can pass it around instead
/// of recomputing `max_faulty`/`quorum` from a raw `n`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub committee_size: usize,
    pub max_faulty: usize,
    pub quorum: usize,
}

impl ThresholdParams {
    pub fn for_committee_size(committee_size: usize) -> Self {
        let max_faulty = committee_size.saturating_sub(1) / 3;
        Self {
            committee_size,
            max_faulty,
            quorum: 2 * max_faulty + 1,
        }
    }
}

/// Controller-level tunables: how many decided heights to retain for
/// late-Commit repair (spec §4.2's history window).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Number of most-recently-decided heights kept for late-commit
    /// acceptance before a height is rejected outright as `Past`.
    pub history_window: usize,
    /// Cap on distinct signers buffered per not-yet-started future height,
    /// before the controller starts a catch-up instance.
    pub future_height_buffer_signers: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            history_window: 5,
            future_height_buffer_signers: 1,
        }
    }
}

/// Top-level configuration for one node, covering every validator it runs
/// shares for. Mirrors the shape (flat struct of typed sub-configs, TOML +
/// environment overrides) of the teacher's `Config`/`load_config`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    pub network: BeaconNetwork,
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: BeaconNetwork::Mainnet,
            controller: ControllerConfig::default(),
        }
    }
}

/// Loads configuration from a TOML file, with environment overrides under
/// the `SSV__` prefix (double underscore separating nested keys), e.g.
/// `SSV__CONTROLLER__HISTORY_WINDOW=10`.
pub fn load_config(config_file_path: &Path) -> Result<NodeConfig, ConfigError> {
    config::Config::builder()
        .add_source(config::File::from(config_file_path))
        .add_source(config::Environment::with_prefix("SSV").separator("__"))
        .build()
        .map_err(|error| ConfigError::Load(error.to_string()))?
        .try_deserialize()
        .map_err(|error| ConfigError::Load(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_matches_spec_table() {
        for (n, t) in [(4, 3), (7, 5), (10, 7), (13, 9)] {
            assert_eq!(ThresholdParams::for_committee_size(n).quorum, t);
        }
    }

    #[test]
    fn default_controller_config_matches_spec_window() {
        assert_eq!(ControllerConfig::default().history_window, 5);
    }

    #[test]
    fn custom_network_carries_its_own_fork_tag() {
        let tag = [9u8; 28];
        let network = BeaconNetwork::Custom { fork_tag: tag };
        assert_eq!(network.fork_tag(), tag);
    }
}
