//! Collects per-root partial BLS signatures and reconstructs the full
//! validator signature once a quorum of distinct signers has contributed —
//! spec §4.4.

pub mod container;

pub use container::PartialSignatureContainer;
