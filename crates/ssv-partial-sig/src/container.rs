//! `PartialSignatureContainer` — spec §4.4.
//!
//! Grounded on `ssv-qbft::container::MessageContainer`'s per-key
//! store-once-detect-equivocation shape, re-keyed by signing-root instead of
//! (round, signer) since partial signatures carry no round at all: a
//! pre-consensus partial (e.g. a randao-reveal share) and a post-consensus
//! partial (e.g. an attestation-data share) are just two different roots in
//! the same kind of container.

use std::collections::BTreeMap;

use tracing::warn;

use ssv_crypto::{reconstruct_signature, PublicKeyShare, Signature};
use ssv_types::{Error, OperatorId};

/// Outcome of inserting a partial signature for a given (root, signer).
#[derive(Debug, PartialEq, Eq)]
pub enum Insert {
    /// First contribution from this signer for this root, or an exact
    /// duplicate of what was already recorded.
    Accepted,
    /// A different signature was already recorded for this (root, signer) —
    /// a slashable equivocation.
    Equivocation,
}

/// Maps signing-root to the set of operators that have contributed a
/// partial signature over it. One container instance serves exactly one
/// phase (pre-consensus or post-consensus) of exactly one duty, per spec
/// §3's `RunnerState`.
#[derive(Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct PartialSignatureContainer {
    #[serde(with = "root_map_serde")]
    by_root: BTreeMap<[u8; 32], BTreeMap<OperatorId, Signature>>,
}

/// `serde_json` only implements `Serialize`/`Deserialize` for map keys that
/// are strings (or a handful of primitives); `[u8; 32]` isn't one, so the
/// outer map is carried as a vec of (hex root, inner map) pairs instead.
mod root_map_serde {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use ssv_crypto::Signature;
    use ssv_types::OperatorId;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<[u8; 32], BTreeMap<OperatorId, Signature>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<(String, &BTreeMap<OperatorId, Signature>)> =
            map.iter().map(|(root, signers)| (hex::encode(root), signers)).collect();
        entries.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<[u8; 32], BTreeMap<OperatorId, Signature>>, D::Error> {
        let entries: Vec<(String, BTreeMap<OperatorId, Signature>)> = Vec::deserialize(d)?;
        entries
            .into_iter()
            .map(|(root_hex, signers)| {
                let bytes = hex::decode(&root_hex).map_err(serde::de::Error::custom)?;
                let root: [u8; 32] = bytes.try_into().map_err(|_| serde::de::Error::custom("wrong root length"))?;
                Ok((root, signers))
            })
            .collect()
    }
}

impl PartialSignatureContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `signer`'s partial signature over `root`. Idempotent for an
    /// identical repeat; a divergent signature for the same (root, signer)
    /// is rejected as [`Insert::Equivocation`] without overwriting the
    /// first-seen contribution.
    pub fn add(&mut self, root: [u8; 32], signer: OperatorId, signature: Signature) -> Insert {
        let signers = self.by_root.entry(root).or_default();
        match signers.get(&signer) {
            None => {
                signers.insert(signer, signature);
                Insert::Accepted
            }
            Some(existing) if *existing == signature => Insert::Accepted,
            Some(_) => {
                warn!(signer = %signer, "divergent partial signature for same root");
                Insert::Equivocation
            }
        }
    }

    /// Number of distinct signers that have contributed a partial signature
    /// for `root`.
    pub fn count(&self, root: [u8; 32]) -> usize {
        self.by_root.get(&root).map_or(0, |m| m.len())
    }

    /// Whether at least `quorum` distinct signers have contributed for `root`.
    pub fn has_quorum(&self, root: [u8; 32], quorum: usize) -> bool {
        self.count(root) >= quorum
    }

    pub fn signers_for_root(&self, root: [u8; 32]) -> impl Iterator<Item = OperatorId> + '_ {
        self.by_root.get(&root).into_iter().flat_map(|m| m.keys().copied())
    }

    /// Every root that currently has at least one contribution, in
    /// insertion-independent (sorted) order — used by post-consensus roles
    /// with more than one expected root (e.g. `SyncCommitteeContribution`)
    /// to iterate "every expected root" per spec §4.3 step 5.
    pub fn roots(&self) -> impl Iterator<Item = [u8; 32]> + '_ {
        self.by_root.keys().copied()
    }

    /// Reconstructs the full validator signature over `root` via Lagrange
    /// interpolation of at least `quorum` partial signatures (spec §4.4),
    /// and verifies the result against `validator_pubkey` before returning
    /// it. Returns [`Error::Reconstruction`] if quorum has not been reached
    /// or the reconstructed signature fails verification.
    pub fn reconstruct(&self, root: [u8; 32], quorum: usize, validator_pubkey: &PublicKeyShare) -> Result<Signature, Error> {
        if !self.has_quorum(root, quorum) {
            return Err(Error::Reconstruction);
        }
        let shares: Vec<(OperatorId, Signature)> = self
            .by_root
            .get(&root)
            .into_iter()
            .flat_map(|m| m.iter().map(|(id, sig)| (*id, *sig)))
            .collect();

        let signature = reconstruct_signature(&shares).map_err(|_| Error::Reconstruction)?;
        if !signature.verify(&root, validator_pubkey.point()) {
            warn!("reconstructed signature failed verification");
            return Err(Error::Reconstruction);
        }
        Ok(signature)
    }
}
