//! The `KeyManager` external-interface boundary.
//!
//! A runner never touches raw key material directly; it asks a `KeyManager`
//! to sign a root under a given domain and validator identity. Production
//! deployments back this with a remote signer or an encrypted local vault —
//! out of scope here — so this crate only defines the trait and a bare
//! in-memory implementation useful for tests and single-process demos.

use std::collections::HashMap;

use ssv_types::{Error, ValidatorPublicKey};

use crate::bls::{SecretKeyShare, Signature};
use crate::domain::{compute_domain, signing_root, DomainType};

/// Signs beacon-chain objects and arbitrary roots on behalf of the shares
/// this process holds, without ever exposing the underlying secret scalars.
pub trait KeyManager: Send + Sync {
    /// Signs the hash-tree root of a beacon object under `domain_type`,
    /// returning the 96-byte compressed signature share.
    fn sign_beacon_object(
        &self,
        object_root: [u8; 32],
        domain_type: DomainType,
        fork_tag: [u8; 28],
        validator_public_key: ValidatorPublicKey,
    ) -> Result<Signature, Error>;

    /// Signs an arbitrary 32-byte root directly, bypassing `compute_domain`.
    /// Used for roots that already embed their own domain separation, such
    /// as a QBFT proposal's justification root.
    fn sign_root(
        &self,
        root: [u8; 32],
        validator_public_key: ValidatorPublicKey,
    ) -> Result<Signature, Error>;
}

/// A `KeyManager` backed by plaintext in-memory shares, keyed by validator.
/// Intended for tests and local development; production operators must
/// supply their own `KeyManager` backed by a hardened signer.
#[derive(Default)]
pub struct InMemoryKeyManager {
    shares: HashMap<ValidatorPublicKey, SecretKeyShare>,
}

impl InMemoryKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, validator_public_key: ValidatorPublicKey, share: SecretKeyShare) {
        self.shares.insert(validator_public_key, share);
    }

    fn share_for(&self, validator_public_key: ValidatorPublicKey) -> Result<&SecretKeyShare, Error> {
        self.shares
            .get(&validator_public_key)
            .ok_or_else(|| Error::BeaconOrNetwork(format!("no share for validator {validator_public_key}")))
    }
}

impl KeyManager for InMemoryKeyManager {
    fn sign_beacon_object(
        &self,
        object_root: [u8; 32],
        domain_type: DomainType,
        fork_tag: [u8; 28],
        validator_public_key: ValidatorPublicKey,
    ) -> Result<Signature, Error> {
        let domain = compute_domain(domain_type, fork_tag);
        let root = signing_root(object_root, domain);
        Ok(self.share_for(validator_public_key)?.sign(&root))
    }

    fn sign_root(&self, root: [u8; 32], validator_public_key: ValidatorPublicKey) -> Result<Signature, Error> {
        Ok(self.share_for(validator_public_key)?.sign(&root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_with_registered_share() {
        let mut rng = rand::rngs::OsRng;
        let share = SecretKeyShare::random(&mut rng);
        let pk = share.public_key_share();
        let validator_public_key = ValidatorPublicKey::new([9u8; 48]);

        let mut km = InMemoryKeyManager::new();
        km.insert(validator_public_key, share);

        let sig = km
            .sign_beacon_object([1u8; 32], DomainType::ATTESTER, [0u8; 28], validator_public_key)
            .unwrap();

        let domain = compute_domain(DomainType::ATTESTER, [0u8; 28]);
        let root = signing_root([1u8; 32], domain);
        assert!(sig.verify(&root, pk.point()));
    }

    #[test]
    fn errors_for_unknown_validator() {
        let km = InMemoryKeyManager::new();
        let result = km.sign_root([0u8; 32], ValidatorPublicKey::new([1u8; 48]));
        assert!(result.is_err());
    }
}
