//! BLS12-381 share cryptography, signing-domain computation, and the
//! simplified hash-tree-root used to identify QBFT values.

pub mod bls;
pub mod domain;
pub mod error;
pub mod interpolate;
pub mod key_manager;
pub mod share;
pub mod ssz;

pub use bls::{PublicKeyShare, SecretKeyShare, Signature};
pub use domain::{compute_domain, signing_root, DomainType, BLS_CIPHERSUITE_DST};
pub use error::CryptoError;
pub use interpolate::{interpolate_g1, interpolate_g2, interpolate_scalar, lagrange_coefficients, reconstruct_signature};
pub use key_manager::{InMemoryKeyManager, KeyManager};
pub use share::Share;
pub use ssz::{contribution_root, contribution_roots, role_separated_root, HashTreeRoot};
