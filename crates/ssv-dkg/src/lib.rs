//! FROST-style Pedersen verifiable secret sharing distributed key
//! generation: three rounds (Commit, Shares, Verify & Output) that let a
//! committee jointly derive a BLS12-381 validator key without any single
//! party ever holding the whole secret (spec §4.5).

pub mod error;
pub mod message;
pub mod polynomial;
pub mod schnorr;
pub mod session;

pub use error::DkgError;
pub use message::{Blame, CommitMessage, ShareMessage};
pub use schnorr::ProofOfKnowledge;
pub use session::DkgSession;
