//! Invariant checks for the two-tier gossip engine.

use super::{GossipConfig, MessageId, PeerGossipState, SeenCache};

/// INVARIANT-1: Deduplication.
/// The same message id is never handed to the sink more than once.
pub fn invariant_not_seen(cache: &SeenCache, id: &MessageId) -> bool {
    !cache.has_seen(id)
}

/// INVARIANT-2: IWANT admission.
/// We only serve an `IWANT` for ids we previously told the requester about
/// via `IHAVE` — prevents unsolicited peers from probing the cache.
pub fn invariant_ihave_was_sent(peer: &PeerGossipState, id: &MessageId) -> bool {
    peer.was_told_about(id)
}

/// INVARIANT-3: Rate limiting.
/// No peer may exceed the configured `IWANT` request rate.
pub fn invariant_iwant_admitted(peer: &mut PeerGossipState, config: &GossipConfig) -> bool {
    peer.admit_iwant(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PeerId, PeerTier};
    use std::time::Duration;

    #[test]
    fn invariant_not_seen_rejects_known_ids() {
        let cache = SeenCache::new(100, 100, Duration::from_secs(60));
        let id = [1u8; 32];
        assert!(invariant_not_seen(&cache, &id));
        cache.mark_seen(id, vec![]);
        assert!(!invariant_not_seen(&cache, &id));
    }

    #[test]
    fn invariant_ihave_was_sent_requires_prior_announcement() {
        let config = GossipConfig::default();
        let mut peer = PeerGossipState::new(PeerId::new([1u8; 32]), PeerTier::Lazy, &config);
        let id = [1u8; 32];
        assert!(!invariant_ihave_was_sent(&peer, &id));
        peer.record_ihave_sent(id, config.max_ihave_per_peer);
        assert!(invariant_ihave_was_sent(&peer, &id));
    }
}
