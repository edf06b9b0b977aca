//! # Double-Sign Detector
//!
//! Records the first proposal hash seen per `(view, proposer)` pair. A
//! second, conflicting proposal for the same pair is evidence of
//! equivocation and is reported to the caller; the detector itself does not
//! act on it (slashing is an external collaborator's job).

use basalt_types::Hash;
use std::collections::HashMap;
use std::sync::Mutex;

/// Evidence that a proposer signed two conflicting blocks for the same view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleSignEvidence {
    pub view: u64,
    pub proposer: [u8; 32],
    pub first_hash: Hash,
    pub conflicting_hash: Hash,
}

/// Tracks `(view, proposer) -> block_hash` to detect equivocating proposers.
#[derive(Default)]
pub struct DoubleSignDetector {
    seen: Mutex<HashMap<(u64, [u8; 32]), Hash>>,
}

impl DoubleSignDetector {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record a proposal, returning evidence if it conflicts with one
    /// already recorded for the same `(view, proposer)`.
    pub fn record(
        &self,
        view: u64,
        proposer: [u8; 32],
        block_hash: Hash,
    ) -> Option<DoubleSignEvidence> {
        let mut seen = self.seen.lock().expect("double-sign lock poisoned");
        match seen.get(&(view, proposer)) {
            Some(first_hash) if *first_hash != block_hash => Some(DoubleSignEvidence {
                view,
                proposer,
                first_hash: *first_hash,
                conflicting_hash: block_hash,
            }),
            Some(_) => None,
            None => {
                seen.insert((view, proposer), block_hash);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_proposal_is_not_evidence() {
        let detector = DoubleSignDetector::new();
        assert!(detector.record(1, [1u8; 32], [2u8; 32]).is_none());
    }

    #[test]
    fn repeating_same_hash_is_not_evidence() {
        let detector = DoubleSignDetector::new();
        detector.record(1, [1u8; 32], [2u8; 32]);
        assert!(detector.record(1, [1u8; 32], [2u8; 32]).is_none());
    }

    #[test]
    fn conflicting_hash_is_evidence() {
        let detector = DoubleSignDetector::new();
        detector.record(1, [1u8; 32], [2u8; 32]);
        let evidence = detector.record(1, [1u8; 32], [3u8; 32]).unwrap();
        assert_eq!(evidence.first_hash, [2u8; 32]);
        assert_eq!(evidence.conflicting_hash, [3u8; 32]);
    }

    #[test]
    fn different_views_are_independent() {
        let detector = DoubleSignDetector::new();
        detector.record(1, [1u8; 32], [2u8; 32]);
        assert!(detector.record(2, [1u8; 32], [3u8; 32]).is_none());
    }
}
