//! Reputation Scorer (SPEC-02 Section 4.6)
//!
//! Tracks a per-peer score in `[0, 100]`, starting at 50, nudged by network
//! events. A score at or below [`AUTOBAN_THRESHOLD`] should trigger a ban in
//! the peer registry; [`ReputationScorer::decay_all`] pulls every score back
//! toward the neutral baseline over time so a peer that stops misbehaving
//! eventually recovers.

use std::collections::HashMap;

use crate::domain::NodeId;

/// Starting score for a newly observed peer.
pub const BASELINE_SCORE: i32 = 50;
/// Score at/below which a peer should be autobanned.
pub const AUTOBAN_THRESHOLD: i32 = 10;
const MIN_SCORE: i32 = 0;
const MAX_SCORE: i32 = 100;
const DECAY_TARGET: i32 = 100;

/// Network events that adjust a peer's reputation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReputationEvent {
    ValidBlock,
    InvalidBlock,
    ValidTx,
    InvalidTx,
    ValidVote,
    InvalidVote,
    TimelyResponse,
    Timeout,
    ProtocolViolation,
    SuccessfulHandshake,
    FailedHandshake,
    DuplicateMessage,
}

impl ReputationEvent {
    fn delta(self) -> i32 {
        match self {
            Self::ValidBlock => 5,
            Self::InvalidBlock => -50,
            Self::ValidTx => 1,
            Self::InvalidTx => -10,
            Self::ValidVote => 3,
            Self::InvalidVote => -30,
            Self::TimelyResponse => 2,
            Self::Timeout => -5,
            Self::ProtocolViolation => -20,
            Self::SuccessfulHandshake => 10,
            Self::FailedHandshake => -15,
            Self::DuplicateMessage => -1,
        }
    }
}

/// Per-peer reputation, with a configurable decay step for periodic recovery.
pub struct ReputationScorer {
    scores: HashMap<NodeId, i32>,
    decay_step: i32,
}

impl ReputationScorer {
    pub fn new() -> Self {
        Self::with_decay_step(1)
    }

    pub fn with_decay_step(decay_step: i32) -> Self {
        Self {
            scores: HashMap::new(),
            decay_step,
        }
    }

    /// Apply an event's delta, clamping to `[0, 100]`. Returns the new score.
    pub fn record(&mut self, node_id: NodeId, event: ReputationEvent) -> i32 {
        let score = self.scores.entry(node_id).or_insert(BASELINE_SCORE);
        *score = (*score + event.delta()).clamp(MIN_SCORE, MAX_SCORE);
        *score
    }

    /// Current score, or the baseline if the peer has no recorded events yet.
    pub fn score(&self, node_id: &NodeId) -> i32 {
        self.scores.get(node_id).copied().unwrap_or(BASELINE_SCORE)
    }

    /// Whether this peer's score has dropped to the autoban threshold.
    pub fn should_autoban(&self, node_id: &NodeId) -> bool {
        self.scores
            .get(node_id)
            .map(|s| *s <= AUTOBAN_THRESHOLD)
            .unwrap_or(false)
    }

    /// Pull every tracked score one decay step toward the neutral baseline.
    pub fn decay_all(&mut self) {
        for score in self.scores.values_mut() {
            match (*score).cmp(&DECAY_TARGET) {
                std::cmp::Ordering::Less => *score = (*score + self.decay_step).min(DECAY_TARGET),
                std::cmp::Ordering::Greater => {
                    *score = (*score - self.decay_step).max(DECAY_TARGET)
                }
                std::cmp::Ordering::Equal => {}
            }
        }
    }

    /// Stop tracking a peer (e.g. on eviction from the registry).
    pub fn remove(&mut self, node_id: &NodeId) {
        self.scores.remove(node_id);
    }
}

impl Default for ReputationScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u8) -> NodeId {
        NodeId::new([n; 32])
    }

    #[test]
    fn valid_block_increments_from_baseline() {
        let mut scorer = ReputationScorer::new();
        let score = scorer.record(node(1), ReputationEvent::ValidBlock);
        assert_eq!(score, BASELINE_SCORE + 5);
    }

    #[test]
    fn repeated_invalid_blocks_clamp_at_zero() {
        let mut scorer = ReputationScorer::new();
        for _ in 0..5 {
            scorer.record(node(1), ReputationEvent::InvalidBlock);
        }
        assert_eq!(scorer.score(&node(1)), 0);
    }

    #[test]
    fn score_autobans_at_threshold() {
        let mut scorer = ReputationScorer::new();
        scorer.record(node(1), ReputationEvent::InvalidBlock);
        assert!(scorer.should_autoban(&node(1)));
        assert_eq!(scorer.score(&node(1)), 0);
    }

    #[test]
    fn decay_pulls_low_score_toward_baseline_cap() {
        let mut scorer = ReputationScorer::with_decay_step(3);
        scorer.record(node(1), ReputationEvent::InvalidBlock);
        assert_eq!(scorer.score(&node(1)), 0);
        scorer.decay_all();
        assert_eq!(scorer.score(&node(1)), 3);
    }

    #[test]
    fn decay_does_not_overshoot_target() {
        let mut scorer = ReputationScorer::with_decay_step(50);
        scorer.record(node(1), ReputationEvent::ValidBlock); // 55
        scorer.decay_all();
        assert_eq!(scorer.score(&node(1)), 100);
    }

    #[test]
    fn unknown_peer_defaults_to_baseline_and_never_autobans() {
        let scorer = ReputationScorer::new();
        assert_eq!(scorer.score(&node(9)), BASELINE_SCORE);
        assert!(!scorer.should_autoban(&node(9)));
    }
}
