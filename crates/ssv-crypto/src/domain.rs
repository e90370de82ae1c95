use sha2::{Digest, Sha256};

/// A 4-byte beacon-chain domain type, mixed into the signing root of every
/// object a share signs. Values match the `DomainType` constants used by the
/// beacon-chain spec; the fork-version/genesis-validators-root components of
/// the real `compute_domain` algorithm are folded into [`BeaconNetwork`] by
/// `ssv-config` rather than hardcoded here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DomainType(pub [u8; 4]);

impl DomainType {
    pub const ATTESTER: DomainType = DomainType(*b"\x01\x00\x00\x00");
    pub const PROPOSER: DomainType = DomainType(*b"\x00\x00\x00\x00");
    pub const RANDAO: DomainType = DomainType(*b"\x02\x00\x00\x00");
    pub const SELECTION_PROOF: DomainType = DomainType(*b"\x05\x00\x00\x00");
    pub const AGGREGATE_AND_PROOF: DomainType = DomainType(*b"\x06\x00\x00\x00");
    pub const SYNC_COMMITTEE: DomainType = DomainType(*b"\x07\x00\x00\x00");
    pub const SYNC_COMMITTEE_SELECTION_PROOF: DomainType = DomainType(*b"\x08\x00\x00\x00");
    pub const CONTRIBUTION_AND_PROOF: DomainType = DomainType(*b"\x09\x00\x00\x00");
}

/// The IETF ciphersuite domain-separation tag used to hash messages onto
/// G2, matching the BLS signature scheme used on Ethereum mainnet.
pub const BLS_CIPHERSUITE_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Computes the 32-byte signing root of an object given its hash-tree root
/// and the (fork-mixed) 32-byte signing domain.
///
/// This mirrors the beacon-chain `compute_signing_root(object, domain)`
/// shape, simplified to a single domain-separated SHA-256 rather than the
/// full SSZ `SigningData` container, since the exact beacon-chain byte
/// layout is out of this engine's scope (see `ssv-crypto::ssz`).
pub fn signing_root(object_root: [u8; 32], domain: [u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(object_root);
    hasher.update(domain);
    hasher.finalize().into()
}

/// Mixes a [`DomainType`] with a beacon-network fork tag to produce the
/// 32-byte domain used by [`signing_root`]. `fork_tag` is supplied by
/// `ssv-config::BeaconNetwork` so that the network identity stays
/// configuration, never process-global state.
pub fn compute_domain(domain_type: DomainType, fork_tag: [u8; 28]) -> [u8; 32] {
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(&domain_type.0);
    domain[4..].copy_from_slice(&fork_tag);
    domain
}
