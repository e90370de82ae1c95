//! The signing/verification capability an `Instance` needs to participate
//! in consensus: producing its own signature over a message root, and
//! looking up a peer's public-key share to verify theirs.
//!
//! Kept distinct from `ssv_crypto::KeyManager`, which signs *beacon
//! objects* under a beacon domain; QBFT messages sign plain 32-byte roots
//! with no beacon-chain domain attached.

use ssv_crypto::{PublicKeyShare, Signature};
use ssv_types::OperatorId;

pub trait QbftSigner {
    fn operator_id(&self) -> OperatorId;
    fn sign(&self, root: [u8; 32]) -> Signature;
    fn public_key_share(&self, operator: OperatorId) -> Option<PublicKeyShare>;
}

/// A `QbftSigner` backed directly by an `ssv_crypto::Share`.
pub struct ShareSigner<'a> {
    share: &'a ssv_crypto::Share,
}

impl<'a> ShareSigner<'a> {
    pub fn new(share: &'a ssv_crypto::Share) -> Self {
        Self { share }
    }
}

impl QbftSigner for ShareSigner<'_> {
    fn operator_id(&self) -> OperatorId {
        self.share.operator_id
    }

    fn sign(&self, root: [u8; 32]) -> Signature {
        self.share.secret_share().sign(&root)
    }

    fn public_key_share(&self, operator: OperatorId) -> Option<PublicKeyShare> {
        self.share.public_key_share(operator).ok().copied()
    }
}
