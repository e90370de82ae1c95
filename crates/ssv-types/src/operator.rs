use core::fmt;
use ethereum_ssz::{Decode as _, Encode as _};
use tree_hash::TreeHash as _;

/// Identifies one of the `n` operators holding a share of a validator key.
///
/// Operator IDs are 1-indexed and densely allocated within a committee:
/// a committee of size `n` uses the IDs `1..=n`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct OperatorId(u64);

impl OperatorId {
    /// Construct an `OperatorId`. Panics if `id` is zero: operator IDs are 1-indexed.
    pub const fn new(id: u64) -> Self {
        assert!(id != 0, "operator id must be non-zero");
        Self(id)
    }

    /// Returns the raw numeric value of this operator ID.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for OperatorId {
    type Error = &'static str;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        if id == 0 {
            Err("operator id must be non-zero")
        } else {
            Ok(Self(id))
        }
    }
}

/// Transparent SSZ/tree-hash delegation to the inner `u64`: an `OperatorId`
/// is wire- and merkle-identical to its raw value, just like `Height`/`Round`.
impl ethereum_ssz::Encode for OperatorId {
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

impl ethereum_ssz::Decode for OperatorId {
    fn is_ssz_fixed_len() -> bool {
        <u64 as ethereum_ssz::Decode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u64 as ethereum_ssz::Decode>::ssz_fixed_len()
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ethereum_ssz::DecodeError> {
        let value = u64::from_ssz_bytes(bytes)?;
        OperatorId::try_from(value).map_err(|e| ethereum_ssz::DecodeError::BytesInvalid(e.to_string()))
    }
}

impl tree_hash::TreeHash for OperatorId {
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

/// The ordered, deduplicated set of operators participating in a committee,
/// together with the quorum threshold derived from its size.
///
/// Invariant: exactly one entry per [`OperatorId`], sorted ascending.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Committee {
    operators: Vec<OperatorId>,
}

impl Committee {
    /// Build a committee from an iterator of operator IDs, sorting and deduplicating them.
    pub fn new(operators: impl IntoIterator<Item = OperatorId>) -> Self {
        let mut operators: Vec<_> = operators.into_iter().collect();
        operators.sort_unstable();
        operators.dedup();
        Self { operators }
    }

    /// Number of operators in the committee (`n`).
    pub fn size(&self) -> usize {
        self.operators.len()
    }

    /// Maximum number of Byzantine operators this committee can tolerate: `f = floor((n-1)/3)`.
    pub fn max_faulty(&self) -> usize {
        (self.size().saturating_sub(1)) / 3
    }

    /// Quorum threshold `t = 2f+1 = floor(2*(n-1)/3)+1`.
    pub fn quorum(&self) -> usize {
        2 * self.max_faulty() + 1
    }

    /// Whether the given operator is a member of this committee.
    pub fn contains(&self, id: OperatorId) -> bool {
        self.operators.binary_search(&id).is_ok()
    }

    /// Iterate over the committee's operators in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = OperatorId> + '_ {
        self.operators.iter().copied()
    }

    /// The designated proposer for a given height and round: `operators[(height + round - 1) mod n]`.
    ///
    /// `height` and `round` are both taken as their raw numeric values; round is 0-indexed here.
    pub fn proposer(&self, height: u64, round: u64) -> OperatorId {
        let n = self.size() as u64;
        let idx = (height.wrapping_add(round).wrapping_sub(1)) % n;
        self.operators[idx as usize]
    }

    /// Slice view of the committee's operators.
    pub fn as_slice(&self) -> &[OperatorId] {
        &self.operators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committee(n: u64) -> Committee {
        Committee::new((1..=n).map(OperatorId::new))
    }

    #[test]
    fn quorum_constants() {
        for (n, t) in [(4, 3), (7, 5), (10, 7), (13, 9)] {
            assert_eq!(committee(n).quorum(), t, "n={n}");
        }
    }

    #[test]
    fn proposer_rotates() {
        let c = committee(4);
        let p0 = c.proposer(10, 0);
        let p1 = c.proposer(10, 1);
        assert_ne!(p0, p1);
    }

    #[test]
    fn dedup_and_sort() {
        let c = Committee::new([OperatorId::new(3), OperatorId::new(1), OperatorId::new(3)]);
        assert_eq!(c.size(), 2);
        assert_eq!(c.as_slice(), &[OperatorId::new(1), OperatorId::new(3)]);
    }
}
