//! `RunnerState` — spec §3: the per-duty orchestration state a runner
//! persists between messages, and its canonical `GetRoot` (spec §6: "a
//! decoded RunnerState is canonically JSON-serializable; GetRoot is
//! SHA-256 of its canonical encoding").

use std::collections::BTreeMap;

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use ssv_crypto::Signature;
use ssv_partial_sig::PartialSignatureContainer;
use ssv_types::{ConsensusData, Duty, Error};

/// Per-duty orchestration state. `finished` and `failed` are mutually
/// exclusive terminal markers: a duty that fails (fatal reconstruction or
/// value-check-after-decide, spec §7) never also becomes `finished`.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct RunnerState {
    pub duty: Option<Duty>,
    pub decided_value: Option<ConsensusData>,
    pub pre_consensus: PartialSignatureContainer,
    pub post_consensus: PartialSignatureContainer,
    #[serde(with = "sig_map_serde")]
    pub reconstructed_pre_consensus: BTreeMap<[u8; 32], [u8; 96]>,
    pub finished: bool,
    pub failed: Option<String>,
}

impl RunnerState {
    /// Whether a new duty may be started: no duty is running, or the
    /// previous one reached a terminal state (spec §3's lifecycle note:
    /// "destroyed (or reset) only after the post-consensus submission
    /// succeeds and a new duty arrives" — a failed duty is equally
    /// replaceable, since the spec never says a failure is un-abandonable).
    pub fn is_idle(&self) -> bool {
        self.duty.is_none() || self.finished || self.failed.is_some()
    }

    /// SHA-256 of this state's canonical JSON encoding (spec §6).
    pub fn get_root(&self) -> Result<[u8; 32], Error> {
        let encoded = serde_json::to_vec(self).map_err(|error| Error::MalformedMsg(error.to_string()))?;
        Ok(Sha256::digest(encoded).into())
    }

    /// Decodes the persisted pre-consensus signatures back into
    /// `ssv_crypto::Signature`s keyed by their object root, for
    /// `RoleBehavior::build_consensus_input`/`submit` to consume. Bytes were
    /// only ever stored here after passing `PartialSignatureContainer::reconstruct`'s
    /// verification, so decoding failure would indicate on-disk corruption
    /// rather than a case callers need to handle gracefully.
    pub fn reconstructed_pre_consensus_signatures(&self) -> HashMap<[u8; 32], Signature> {
        self.reconstructed_pre_consensus
            .iter()
            .filter_map(|(root, bytes)| Signature::from_bytes(bytes).ok().map(|sig| (*root, sig)))
            .collect()
    }
}

/// Same hex-map-of-pairs trick as `ssv_partial_sig::container::root_map_serde`:
/// `serde_json` map keys must be strings, so `[u8; 32]` roots are carried as
/// hex strings in a vec of pairs.
mod sig_map_serde {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(map: &BTreeMap<[u8; 32], [u8; 96]>, s: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<(String, String)> = map
            .iter()
            .map(|(root, sig)| (hex::encode(root), hex::encode(sig)))
            .collect();
        entries.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<[u8; 32], [u8; 96]>, D::Error> {
        let entries: Vec<(String, String)> = Vec::deserialize(d)?;
        entries
            .into_iter()
            .map(|(root_hex, sig_hex)| {
                let root: [u8; 32] = hex::decode(&root_hex)
                    .map_err(serde::de::Error::custom)?
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("wrong root length"))?;
                let sig: [u8; 96] = hex::decode(&sig_hex)
                    .map_err(serde::de::Error::custom)?
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("wrong signature length"))?;
                Ok((root, sig))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert!(RunnerState::default().is_idle());
    }

    #[test]
    fn get_root_is_stable_and_sensitive_to_finished_flag() {
        let mut state = RunnerState::default();
        let r1 = state.get_root().unwrap();
        assert_eq!(r1, state.get_root().unwrap());
        state.finished = true;
        let r2 = state.get_root().unwrap();
        assert_ne!(r1, r2);
    }
}
