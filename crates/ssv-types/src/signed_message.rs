use crate::error::Error;
use crate::operator::OperatorId;
use ethereum_ssz::{Decode as _, Encode as _};
use ethereum_ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Length in bytes of an aggregated BLS12-381 signature in compressed form.
pub const SIGNATURE_LEN: usize = 96;

/// An aggregated BLS signature, stored as raw compressed bytes.
#[derive(Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AggregateSignature(#[serde(with = "hex::serde")] [u8; SIGNATURE_LEN]);

impl AggregateSignature {
    pub const fn new(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl core::fmt::Debug for AggregateSignature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AggregateSignature({}...)", hex::encode(&self.0[..8]))
    }
}

impl ethereum_ssz::Encode for AggregateSignature {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        SIGNATURE_LEN
    }

    fn ssz_bytes_len(&self) -> usize {
        SIGNATURE_LEN
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }
}

impl ethereum_ssz::Decode for AggregateSignature {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        SIGNATURE_LEN
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(ethereum_ssz::DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: SIGNATURE_LEN,
            });
        }
        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(bytes);
        Ok(Self(signature))
    }
}

impl tree_hash::TreeHash for AggregateSignature {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Vector
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("vector type is not packed")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("vector type is not packed")
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.0, 0)
    }
}

/// Wraps an inner payload with the list of operators that signed it and the
/// aggregated BLS signature over the payload's root.
///
/// Invariants, enforced by [`SignedMessage::validate`]: signers are sorted
/// ascending, unique, and non-empty.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, Encode, Decode, TreeHash)]
pub struct SignedMessage<T: ethereum_ssz::Encode + ethereum_ssz::Decode + tree_hash::TreeHash> {
    pub signers: Vec<OperatorId>,
    pub signature: AggregateSignature,
    pub data: T,
}

impl<T: ethereum_ssz::Encode + ethereum_ssz::Decode + tree_hash::TreeHash> SignedMessage<T> {
    pub fn new(signers: Vec<OperatorId>, signature: AggregateSignature, data: T) -> Self {
        Self {
            signers,
            signature,
            data,
        }
    }

    /// Single-signer convenience constructor, used for per-operator partial
    /// messages (Proposal, Prepare, Commit, RoundChange are each signed by
    /// exactly one operator before being aggregated or counted individually).
    pub fn single(signer: OperatorId, signature: AggregateSignature, data: T) -> Self {
        Self::new(vec![signer], signature, data)
    }

    /// Check the structural invariants of a signed message: non-empty,
    /// strictly ascending (hence unique) signer list, and that every signer
    /// belongs to `committee_size` (i.e. signers don't exceed the committee).
    pub fn validate(&self, committee_size: usize) -> Result<(), Error> {
        if self.signers.is_empty() {
            return Err(Error::MalformedMsg("empty signers".into()));
        }
        if self.signers.len() > committee_size {
            return Err(Error::MalformedMsg(
                "signers exceed committee size".into(),
            ));
        }
        if !self.signers.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(Error::MalformedMsg(
                "signers must be sorted ascending and unique".into(),
            ));
        }
        Ok(())
    }

    pub fn is_single_signer(&self) -> bool {
        self.signers.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> AggregateSignature {
        AggregateSignature::new([0u8; SIGNATURE_LEN])
    }

    #[test]
    fn rejects_empty_signers() {
        let msg: SignedMessage<u8> = SignedMessage::new(vec![], sig(), 0);
        assert!(msg.validate(4).is_err());
    }

    #[test]
    fn rejects_unsorted_signers() {
        let signers = vec![OperatorId::new(2), OperatorId::new(1)];
        let msg = SignedMessage::new(signers, sig(), 0u8);
        assert!(msg.validate(4).is_err());
    }

    #[test]
    fn rejects_duplicate_signers() {
        let signers = vec![OperatorId::new(1), OperatorId::new(1)];
        let msg = SignedMessage::new(signers, sig(), 0u8);
        assert!(msg.validate(4).is_err());
    }

    #[test]
    fn accepts_sorted_unique_signers() {
        let signers = vec![OperatorId::new(1), OperatorId::new(2), OperatorId::new(3)];
        let msg = SignedMessage::new(signers, sig(), 0u8);
        assert!(msg.validate(4).is_ok());
    }
}
