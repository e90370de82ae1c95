use core::fmt;
use ethereum_ssz::{Decode as _, Encode as _};
use tree_hash::TreeHash as _;

/// The logical index of a consensus instance; one height is opened per duty.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Height(u64);

impl Height {
    pub const fn new(height: u64) -> Self {
        Self(height)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The retry counter within a height. Rounds are 1-indexed; `Round::FIRST` is the
/// initial round of every instance. A round only ever increases within an instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Round(u64);

impl Round {
    pub const FIRST: Round = Round(1);

    pub const fn new(round: u64) -> Self {
        Self(round)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Round {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Transparent SSZ/tree-hash delegation to the inner `u64`, matching how
/// `Slot`/`Epoch`-style wrappers are wired to `ssz`/`tree_hash` in the
/// beacon-chain type ecosystem this crate depends on.
macro_rules! impl_u64_newtype_ssz {
    ($ty:ty) => {
        impl ethereum_ssz::Encode for $ty {
            fn is_ssz_fixed_len() -> bool {
                <u64 as ethereum_ssz::Encode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as ethereum_ssz::Encode>::ssz_fixed_len()
            }

            fn ssz_bytes_len(&self) -> usize {
                self.0.ssz_bytes_len()
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                self.0.ssz_append(buf)
            }
        }

        impl ethereum_ssz::Decode for $ty {
            fn is_ssz_fixed_len() -> bool {
                <u64 as ethereum_ssz::Decode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as ethereum_ssz::Decode>::ssz_fixed_len()
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
                Ok(Self(u64::from_ssz_bytes(bytes)?))
            }
        }

        impl tree_hash::TreeHash for $ty {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                <u64 as tree_hash::TreeHash>::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                self.0.tree_hash_packed_encoding()
            }

            fn tree_hash_packing_factor() -> usize {
                <u64 as tree_hash::TreeHash>::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                self.0.tree_hash_root()
            }
        }
    };
}

impl_u64_newtype_ssz!(Height);
impl_u64_newtype_ssz!(Round);
