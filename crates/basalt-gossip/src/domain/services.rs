//! Domain services: peer-tier assignment and rebalance selection for the
//! two-tier gossip engine.

use super::{GossipConfig, PeerGossipState, PeerId, PeerTier};
use std::collections::HashMap;

/// Assign a newly connected peer to eager if there's room, else lazy.
pub fn assign_new_peer_tier(eager_count: usize, config: &GossipConfig) -> PeerTier {
    if eager_count < config.eager_target {
        PeerTier::Eager
    } else {
        PeerTier::Lazy
    }
}

/// Pick the highest-reputation lazy peer to graft into the eager tier, if
/// the eager tier has room.
pub fn select_graft_candidate<'a>(
    peers: &'a HashMap<PeerId, PeerGossipState>,
    eager_count: usize,
    config: &GossipConfig,
) -> Option<PeerId> {
    if eager_count >= config.eager_target {
        return None;
    }
    peers
        .values()
        .filter(|p| matches!(p.tier, PeerTier::Lazy))
        .max_by(|a, b| a.reputation.total_cmp(&b.reputation))
        .map(|p| p.peer_id)
}

/// Pick the lowest-reputation eager peer to prune to the lazy tier, if the
/// eager tier is over its hard cap.
pub fn select_prune_candidate<'a>(
    peers: &'a HashMap<PeerId, PeerGossipState>,
    eager_count: usize,
    config: &GossipConfig,
) -> Option<PeerId> {
    if eager_count <= config.eager_cap {
        return None;
    }
    peers
        .values()
        .filter(|p| matches!(p.tier, PeerTier::Eager))
        .min_by(|a, b| a.reputation.total_cmp(&b.reputation))
        .map(|p| p.peer_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: u8, tier: PeerTier, reputation: f64) -> PeerGossipState {
        let config = GossipConfig::default();
        let mut p = PeerGossipState::new(PeerId::new([id; 32]), tier, &config);
        p.reputation = reputation;
        p
    }

    #[test]
    fn new_peer_goes_eager_until_target_reached() {
        let config = GossipConfig::default();
        assert_eq!(assign_new_peer_tier(0, &config), PeerTier::Eager);
        assert_eq!(assign_new_peer_tier(5, &config), PeerTier::Eager);
        assert_eq!(assign_new_peer_tier(6, &config), PeerTier::Lazy);
    }

    #[test]
    fn graft_picks_highest_reputation_lazy_peer() {
        let config = GossipConfig::default();
        let mut peers = HashMap::new();
        peers.insert(PeerId::new([1; 32]), peer(1, PeerTier::Lazy, 0.3));
        peers.insert(PeerId::new([2; 32]), peer(2, PeerTier::Lazy, 0.9));
        peers.insert(PeerId::new([3; 32]), peer(3, PeerTier::Eager, 0.99));

        let candidate = select_graft_candidate(&peers, 3, &config);
        assert_eq!(candidate, Some(PeerId::new([2; 32])));
    }

    #[test]
    fn graft_returns_none_when_eager_tier_is_full() {
        let config = GossipConfig::default();
        let peers = HashMap::new();
        assert_eq!(select_graft_candidate(&peers, 6, &config), None);
    }

    #[test]
    fn prune_picks_lowest_reputation_eager_peer_over_cap() {
        let config = GossipConfig::default();
        let mut peers = HashMap::new();
        peers.insert(PeerId::new([1; 32]), peer(1, PeerTier::Eager, 0.8));
        peers.insert(PeerId::new([2; 32]), peer(2, PeerTier::Eager, 0.1));

        let candidate = select_prune_candidate(&peers, 13, &config);
        assert_eq!(candidate, Some(PeerId::new([2; 32])));
    }

    #[test]
    fn prune_returns_none_under_cap() {
        let config = GossipConfig::default();
        let peers = HashMap::new();
        assert_eq!(select_prune_candidate(&peers, 10, &config), None);
    }
}
