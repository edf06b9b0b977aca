//! Value objects for the two-tier gossip engine's configuration and state.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use super::{MessageId, PeerId, PeerTier};

/// Gossip engine tuning parameters.
#[derive(Clone, Debug)]
pub struct GossipConfig {
    /// Eager peers are grafted until this many are held.
    pub eager_target: usize,
    /// Eager peers are pruned once this many are held.
    pub eager_cap: usize,
    /// Lazy peers are grafted until this many are held.
    pub lazy_target: usize,
    /// Dedup seen-set capacity.
    pub seen_capacity: usize,
    /// Dedup seen-set entry lifetime.
    pub seen_ttl: Duration,
    /// Maximum number of full messages cached for `IWANT` replies.
    pub message_cache_capacity: usize,
    /// Maximum `IHAVE` ids tracked per peer.
    pub max_ihave_per_peer: usize,
    /// Maximum `IWANT` requests served per peer per second.
    pub iwant_max_per_second: u32,
    /// Minimum spacing between `IWANT` batches from one peer.
    pub iwant_min_interval: Duration,
    /// Requested ids beyond this count in one `IWANT` are dropped.
    pub iwant_max_ids: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            eager_target: 6,
            eager_cap: 12,
            lazy_target: 12,
            seen_capacity: 200_000,
            seen_ttl: Duration::from_secs(120),
            message_cache_capacity: 50_000,
            max_ihave_per_peer: 1_000,
            iwant_max_per_second: 10,
            iwant_min_interval: Duration::from_millis(100),
            iwant_max_ids: 100,
        }
    }
}

/// Per-peer bookkeeping: tier, reputation, and rate-limit state.
#[derive(Clone, Debug)]
pub struct PeerGossipState {
    pub peer_id: PeerId,
    pub tier: PeerTier,
    /// Reputation score driving rebalance grafts/prunes (higher is better).
    pub reputation: f64,
    /// Ids we've told this peer about via `IHAVE` (bounded, FIFO eviction).
    ihave_sent: Vec<MessageId>,
    /// Token bucket for `IWANT` requests from this peer.
    iwant_tokens: u32,
    iwant_last_refill: Instant,
    iwant_last_request: Option<Instant>,
}

impl PeerGossipState {
    pub fn new(peer_id: PeerId, tier: PeerTier, config: &GossipConfig) -> Self {
        Self {
            peer_id,
            tier,
            reputation: 0.5,
            ihave_sent: Vec::new(),
            iwant_tokens: config.iwant_max_per_second,
            iwant_last_refill: Instant::now(),
            iwant_last_request: None,
        }
    }

    pub fn update_reputation(&mut self, delta: f64) {
        self.reputation = (self.reputation + delta).clamp(0.0, 1.0);
    }

    /// Record that we sent this peer an `IHAVE` for `id`, evicting the
    /// oldest entry once `max_ihave_per_peer` is exceeded.
    pub fn record_ihave_sent(&mut self, id: MessageId, max_per_peer: usize) {
        if self.ihave_sent.contains(&id) {
            return;
        }
        if self.ihave_sent.len() >= max_per_peer {
            self.ihave_sent.remove(0);
        }
        self.ihave_sent.push(id);
    }

    /// Whether we told this peer about `id` via `IHAVE` (a prerequisite for
    /// serving an `IWANT` from them — prevents unsolicited cache probing).
    pub fn was_told_about(&self, id: &MessageId) -> bool {
        self.ihave_sent.contains(id)
    }

    /// Token-bucket admission check for an incoming `IWANT` batch. Refills
    /// one second's worth of tokens whenever at least `min_interval` has
    /// elapsed since the last request, and rejects a batch arriving sooner
    /// than `min_interval` after the previous one.
    pub fn admit_iwant(&mut self, config: &GossipConfig) -> bool {
        let now = Instant::now();
        if let Some(last) = self.iwant_last_request {
            if now.duration_since(last) < config.iwant_min_interval {
                return false;
            }
        }
        if now.duration_since(self.iwant_last_refill) >= Duration::from_secs(1) {
            self.iwant_tokens = config.iwant_max_per_second;
            self.iwant_last_refill = now;
        }
        if self.iwant_tokens == 0 {
            return false;
        }
        self.iwant_tokens -= 1;
        self.iwant_last_request = Some(now);
        true
    }
}

struct SeenEntry {
    seen_at: Instant,
}

/// Deduplication cache of recently seen message ids, with a parallel cache
/// of the serialized message bytes so `IWANT` replies can be served without
/// re-fetching from the application layer.
pub struct SeenCache {
    entries: RwLock<HashMap<MessageId, SeenEntry>>,
    messages: RwLock<HashMap<MessageId, Vec<u8>>>,
    capacity: usize,
    message_capacity: usize,
    ttl: Duration,
    /// Per-message source count, used by `HandleIHave` (fallback sources,
    /// not re-requests, once one source is already recorded).
    sources: RwLock<HashMap<MessageId, HashSet<PeerId>>>,
}

impl SeenCache {
    pub fn new(capacity: usize, message_capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            capacity,
            message_capacity,
            ttl,
            sources: RwLock::new(HashMap::new()),
        }
    }

    pub fn has_seen(&self, id: &MessageId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Mark `id` seen and cache its bytes. Returns `true` if this is the
    /// first time we've seen it.
    pub fn mark_seen(&self, id: MessageId, body: Vec<u8>) -> bool {
        let mut entries = self.entries.write();
        let first_seen = !entries.contains_key(&id);
        if first_seen {
            if entries.len() >= self.capacity {
                Self::evict_oldest(&mut entries);
            }
            entries.insert(id, SeenEntry { seen_at: Instant::now() });

            let mut messages = self.messages.write();
            if messages.len() >= self.message_capacity {
                if let Some(&victim) = messages.keys().next() {
                    messages.remove(&victim);
                }
            }
            messages.insert(id, body);
        }
        first_seen
    }

    fn evict_oldest(entries: &mut HashMap<MessageId, SeenEntry>) {
        if let Some(&oldest) = entries
            .iter()
            .min_by_key(|(_, e)| e.seen_at)
            .map(|(id, _)| id)
        {
            entries.remove(&oldest);
        }
    }

    pub fn cached_message(&self, id: &MessageId) -> Option<Vec<u8>> {
        self.messages.read().get(id).cloned()
    }

    /// Record `peer` as a source for `id`. Returns the number of sources
    /// recorded for `id` after this call (including this one, if newly
    /// added).
    pub fn record_source(&self, id: MessageId, peer: PeerId, max_sources: usize) -> usize {
        let mut sources = self.sources.write();
        let set = sources.entry(id).or_default();
        if set.len() < max_sources {
            set.insert(peer);
        }
        set.len()
    }

    /// Drop seen/message/source entries whose seen timestamp has expired.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let expired: Vec<MessageId> = entries
            .iter()
            .filter(|(_, e)| now.duration_since(e.seen_at) > self.ttl)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            entries.remove(id);
        }
        drop(entries);

        if expired.is_empty() {
            return;
        }
        let mut messages = self.messages.write();
        let mut sources = self.sources.write();
        for id in &expired {
            messages.remove(id);
            sources.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gossip_config_defaults_match_the_two_tier_targets() {
        let config = GossipConfig::default();
        assert_eq!(config.eager_target, 6);
        assert_eq!(config.eager_cap, 12);
        assert_eq!(config.lazy_target, 12);
    }

    #[test]
    fn seen_cache_marks_first_seen_only_once() {
        let cache = SeenCache::new(100, 100, Duration::from_secs(60));
        let id = [1u8; 32];
        assert!(cache.mark_seen(id, vec![1, 2, 3]));
        assert!(!cache.mark_seen(id, vec![1, 2, 3]));
        assert_eq!(cache.cached_message(&id), Some(vec![1, 2, 3]));
    }

    #[test]
    fn seen_cache_evicts_oldest_past_capacity() {
        let cache = SeenCache::new(2, 2, Duration::from_secs(60));
        cache.mark_seen([1u8; 32], vec![]);
        std::thread::sleep(Duration::from_millis(5));
        cache.mark_seen([2u8; 32], vec![]);
        std::thread::sleep(Duration::from_millis(5));
        cache.mark_seen([3u8; 32], vec![]);
        assert_eq!(cache.len(), 2);
        assert!(!cache.has_seen(&[1u8; 32]));
        assert!(cache.has_seen(&[3u8; 32]));
    }

    #[test]
    fn peer_ihave_tracking_is_bounded() {
        let config = GossipConfig {
            max_ihave_per_peer: 2,
            ..Default::default()
        };
        let mut peer = PeerGossipState::new(PeerId::new([1u8; 32]), PeerTier::Lazy, &config);
        peer.record_ihave_sent([1u8; 32], 2);
        peer.record_ihave_sent([2u8; 32], 2);
        peer.record_ihave_sent([3u8; 32], 2);
        assert!(!peer.was_told_about(&[1u8; 32]));
        assert!(peer.was_told_about(&[3u8; 32]));
    }

    #[test]
    fn iwant_rate_limiting_rejects_too_frequent_batches() {
        let config = GossipConfig {
            iwant_min_interval: Duration::from_millis(50),
            ..Default::default()
        };
        let mut peer = PeerGossipState::new(PeerId::new([1u8; 32]), PeerTier::Eager, &config);
        assert!(peer.admit_iwant(&config));
        assert!(!peer.admit_iwant(&config));
    }

    #[test]
    fn reputation_is_clamped() {
        let config = GossipConfig::default();
        let mut peer = PeerGossipState::new(PeerId::new([1u8; 32]), PeerTier::Eager, &config);
        peer.update_reputation(10.0);
        assert_eq!(peer.reputation, 1.0);
        peer.update_reputation(-10.0);
        assert_eq!(peer.reputation, 0.0);
    }
}
