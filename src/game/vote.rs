//! Voting
//!
//! Ballot collection for one voting round and the ejection rule.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::core::id::PlayerId;
use crate::game::meeting::RoundToken;

/// Voter -> target, `None` meaning skip.
pub type Ballots = BTreeMap<PlayerId, Option<PlayerId>>;

/// Decide who, if anyone, is ejected.
///
/// - Partial ballots are fine (the timer may have run out).
/// - If at least half of the alive players skipped, nobody is ejected.
/// - Otherwise the top target is ejected only if it is unique and holds more
///   than half of the non-skip electorate (`alive - skips`).
///
/// Ballots naming a target that is not alive are ignored.
pub fn resolve_vote(ballots: &Ballots, alive: &BTreeSet<PlayerId>) -> Option<PlayerId> {
    let alive_count = alive.len();
    let skip_count = ballots.values().filter(|target| target.is_none()).count();

    // skip_count >= alive / 2, ties favour skipping
    if skip_count * 2 >= alive_count {
        return None;
    }

    let mut tally: BTreeMap<PlayerId, usize> = BTreeMap::new();
    for target in ballots.values().flatten() {
        if alive.contains(target) {
            *tally.entry(*target).or_insert(0) += 1;
        }
    }

    let max_votes = tally.values().copied().max().unwrap_or(0);
    // max_votes > (alive - skips) / 2, without leaving integers
    if max_votes * 2 <= alive_count - skip_count {
        return None;
    }

    let mut leaders = tally.iter().filter(|(_, votes)| **votes == max_votes);
    match (leaders.next(), leaders.next()) {
        (Some((target, _)), None) => Some(*target),
        _ => None,
    }
}

/// An open voting window.
#[derive(Clone, Debug)]
pub struct VotingRound {
    token: RoundToken,
    deadline: Instant,
    ballots: Ballots,
}

impl VotingRound {
    /// Open a round with empty ballots.
    pub fn open(token: RoundToken, now: Instant, duration: Duration) -> Self {
        Self {
            token,
            deadline: now + duration,
            ballots: Ballots::new(),
        }
    }

    /// Record a ballot, replacing any earlier one from the same voter.
    pub fn cast(&mut self, voter: PlayerId, target: Option<PlayerId>) {
        self.ballots.insert(voter, target);
    }

    /// Forget a voter's ballot and any ballots naming them.
    pub fn withdraw(&mut self, player: &PlayerId) {
        self.ballots.remove(player);
        for target in self.ballots.values_mut() {
            if target.as_ref() == Some(player) {
                *target = None;
            }
        }
    }

    /// Have all alive players voted?
    pub fn all_voted(&self, alive: &BTreeSet<PlayerId>) -> bool {
        alive.iter().all(|id| self.ballots.contains_key(id))
    }

    /// Whole seconds left, rounded up.
    pub fn time_left(&self, now: Instant) -> u32 {
        let left = self.deadline.saturating_duration_since(now);
        let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
        secs.min(u64::from(u32::MAX)) as u32
    }

    /// Has the window closed?
    pub fn expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Token of the meeting this vote belongs to.
    pub fn token(&self) -> RoundToken {
        self.token
    }

    /// Ballots so far.
    pub fn ballots(&self) -> &Ballots {
        &self.ballots
    }

    /// Number of distinct voters.
    pub fn voter_count(&self) -> usize {
        self.ballots.len()
    }
}
