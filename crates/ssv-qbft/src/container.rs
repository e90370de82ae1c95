//! Per-round, per-signer message storage with equivocation detection and
//! root-keyed quorum counting.
//!
//! Grounded on the teacher's `core-driver::ProposalKeeper`/`EvidenceMap`
//! (store-once-per-(round,signer), detect and record conflicting content as
//! equivocation evidence) merged with `core-votekeeper::VoteCount`'s
//! weight-tally-per-value approach (here: count of distinct signers per
//! root, since every operator carries equal weight in this engine, unlike
//! malachite's stake-weighted votes).

use std::collections::BTreeMap;
use std::ops::Bound;

use ssv_types::{OperatorId, Round};

/// Stores one message kind's instances across all rounds of an `Instance`,
/// keyed by `(round, signer)`. A second insertion for the same key is a
/// no-op if identical, or flagged as equivocation if the extracted root
/// differs from the first.
#[derive(Clone, Debug)]
pub struct MessageContainer<M> {
    by_round: BTreeMap<Round, BTreeMap<OperatorId, M>>,
}

impl<M> Default for MessageContainer<M> {
    fn default() -> Self {
        Self {
            by_round: BTreeMap::new(),
        }
    }
}

/// Outcome of attempting to insert a message into a [`MessageContainer`].
pub enum Insert {
    /// First time this (round, signer) pair has been seen, or an exact
    /// duplicate of what was already stored.
    Accepted,
    /// A different message was already stored for this (round, signer).
    Equivocation,
}

impl<M> MessageContainer<M>
where
    M: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `message` for `(round, signer)`. Returns [`Insert::Equivocation`]
    /// without overwriting the original entry if a divergent message for the
    /// same (round, signer) was already recorded — the first-seen message is
    /// authoritative, matching the teacher's "store each unique message once"
    /// rule in `ProposalKeeper::add`.
    pub fn insert(&mut self, round: Round, signer: OperatorId, message: M) -> Insert {
        let per_round = self.by_round.entry(round).or_default();
        match per_round.get(&signer) {
            None => {
                per_round.insert(signer, message);
                Insert::Accepted
            }
            Some(existing) if *existing == message => Insert::Accepted,
            Some(_) => Insert::Equivocation,
        }
    }

    pub fn get(&self, round: Round, signer: OperatorId) -> Option<&M> {
        self.by_round.get(&round)?.get(&signer)
    }

    pub fn signers_for_round(&self, round: Round) -> impl Iterator<Item = OperatorId> + '_ {
        self.by_round
            .get(&round)
            .into_iter()
            .flat_map(|m| m.keys().copied())
    }

    pub fn messages_for_round(&self, round: Round) -> impl Iterator<Item = (&OperatorId, &M)> {
        self.by_round.get(&round).into_iter().flatten()
    }

    pub fn count_for_round(&self, round: Round) -> usize {
        self.by_round.get(&round).map_or(0, |m| m.len())
    }

    /// Every round strictly greater than `round` that holds at least one
    /// message, in ascending order. An exact range scan over `by_round`
    /// rather than a fixed-size window, so no amount of round-gap (a
    /// network partition or a stalling Byzantine minority) can hide
    /// round-change evidence from the caller.
    pub fn rounds_above(&self, round: Round) -> impl Iterator<Item = Round> + '_ {
        self.by_round.range((Bound::Excluded(round), Bound::Unbounded)).map(|(r, _)| *r)
    }
}

/// Tallies, within a single round, how many distinct signers have sent a
/// message whose extracted root matches each candidate root. Quorum over a
/// root is `count >= quorum`.
pub fn count_matching_root<M>(
    container: &MessageContainer<M>,
    round: Round,
    root: [u8; 32],
    extract_root: impl Fn(&M) -> [u8; 32],
) -> usize
where
    M: Clone + PartialEq,
{
    container
        .messages_for_round(round)
        .filter(|(_, message)| extract_root(message) == root)
        .count()
}
