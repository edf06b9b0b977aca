//! # Two-Tier Gossip Engine
//!
//! Disseminates application messages (transaction/block announcements,
//! consensus control frames) across a peer mesh split into an eager tier
//! (full-message push) and a lazy tier (`IHAVE` announcements only),
//! following the plumtree-style epidemic broadcast tree.
//!
//! ## Thread Safety
//!
//! Shared across async tasks via `Arc`. Per-peer and seen-cache state is
//! protected by `parking_lot` locks held only for the duration of a single
//! map operation.
//!
//! ## Dependencies
//!
//! Requires two port implementations:
//! - `T: PeerTransport` — sends frames to peers
//! - `M: MessageReceivedSink` — receives deduplicated full messages

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use basalt_consensus::GossipSink;
use basalt_types::Hash;

use crate::domain::{
    assign_new_peer_tier, invariant_ihave_was_sent, invariant_iwant_admitted, invariant_not_seen,
    select_graft_candidate, select_prune_candidate, GossipConfig, MessageId, PeerGossipState,
    PeerId, PeerTier, SeenCache,
};
use crate::ports::inbound::{GossipApi, MessageReceivedSink};
use crate::ports::outbound::{GossipFrame, PeerTransport};

/// The two-tier gossip engine.
pub struct GossipEngine<T: PeerTransport, M: MessageReceivedSink> {
    config: GossipConfig,
    transport: Arc<T>,
    sink: Arc<M>,
    seen: SeenCache,
    peers: RwLock<HashMap<PeerId, PeerGossipState>>,
}

impl<T: PeerTransport, M: MessageReceivedSink> GossipEngine<T, M> {
    pub fn new(config: GossipConfig, transport: Arc<T>, sink: Arc<M>) -> Self {
        let seen = SeenCache::new(
            config.seen_capacity,
            config.message_cache_capacity,
            config.seen_ttl,
        );
        Self {
            config,
            transport,
            sink,
            seen,
            peers: RwLock::new(HashMap::new()),
        }
    }

    fn eager_count(&self) -> usize {
        self.peers
            .read()
            .values()
            .filter(|p| matches!(p.tier, PeerTier::Eager))
            .count()
    }

    fn eager_peers(&self) -> Vec<PeerId> {
        self.peers
            .read()
            .values()
            .filter(|p| matches!(p.tier, PeerTier::Eager))
            .map(|p| p.peer_id)
            .collect()
    }

    fn all_peers(&self) -> Vec<PeerId> {
        self.peers.read().keys().copied().collect()
    }

    /// Handle an inbound full message, whether pushed eagerly or served as
    /// an `IWANT` reply. Returns `true` if this was the first time we saw
    /// it (the caller decides whether to re-broadcast).
    pub fn handle_full_message(&self, sender: PeerId, id: MessageId, body: Vec<u8>) -> bool {
        if !invariant_not_seen(&self.seen, &id) {
            return false;
        }
        let first_seen = self.seen.mark_seen(id, body.clone());
        if !first_seen {
            return false;
        }
        self.sink.on_message_received(id, body);

        let mut peers = self.peers.write();
        let is_lazy = peers
            .get(&sender)
            .map(|p| matches!(p.tier, PeerTier::Lazy))
            .unwrap_or(false);
        if is_lazy {
            let eager_count = peers
                .values()
                .filter(|p| matches!(p.tier, PeerTier::Eager))
                .count();
            if eager_count < self.config.eager_cap {
                if let Some(p) = peers.get_mut(&sender) {
                    p.tier = PeerTier::Eager;
                }
            }
        }
        true
    }
}

impl<T: PeerTransport, M: MessageReceivedSink> GossipApi for GossipEngine<T, M> {
    fn broadcast_priority(&self, id: MessageId, body: Vec<u8>) {
        if !self.seen.mark_seen(id, body.clone()) {
            return;
        }

        let eager = self.eager_peers();
        self.transport.broadcast(
            &eager,
            GossipFrame::FullMessage { id, body },
        );

        let mut peers = self.peers.write();
        for peer in peers.values_mut() {
            if matches!(peer.tier, PeerTier::Lazy) {
                peer.record_ihave_sent(id, self.config.max_ihave_per_peer);
                self.transport.send_to_peer(
                    peer.peer_id,
                    GossipFrame::IHave { ids: vec![id] },
                ).ok();
            }
        }
    }

    fn broadcast_standard(&self, id: MessageId, body: Vec<u8>) {
        if !self.seen.mark_seen(id, body) {
            return;
        }

        let mut peers = self.peers.write();
        for peer in peers.values_mut() {
            peer.record_ihave_sent(id, self.config.max_ihave_per_peer);
            self.transport.send_to_peer(
                peer.peer_id,
                GossipFrame::IHave { ids: vec![id] },
            ).ok();
        }
    }

    fn connect_peer(&self, peer: PeerId) {
        let mut peers = self.peers.write();
        if peers.contains_key(&peer) {
            return;
        }
        let eager_count = peers
            .values()
            .filter(|p| matches!(p.tier, PeerTier::Eager))
            .count();
        let tier = assign_new_peer_tier(eager_count, &self.config);
        peers.insert(peer, PeerGossipState::new(peer, tier, &self.config));
    }

    fn disconnect_peer(&self, peer: PeerId) {
        self.peers.write().remove(&peer);
    }

    fn rebalance(&self) {
        loop {
            let eager_count = self.eager_count();
            let peers = self.peers.read();
            let Some(candidate) = select_graft_candidate(&peers, eager_count, &self.config)
            else {
                break;
            };
            drop(peers);
            if let Some(p) = self.peers.write().get_mut(&candidate) {
                p.tier = PeerTier::Eager;
            }
            self.transport.send_to_peer(candidate, GossipFrame::Graft).ok();
        }

        loop {
            let eager_count = self.eager_count();
            let peers = self.peers.read();
            let Some(candidate) = select_prune_candidate(&peers, eager_count, &self.config)
            else {
                break;
            };
            drop(peers);
            if let Some(p) = self.peers.write().get_mut(&candidate) {
                p.tier = PeerTier::Lazy;
            }
            self.transport.send_to_peer(candidate, GossipFrame::Prune).ok();
        }
    }

    fn cleanup(&self) {
        self.seen.cleanup_expired();
    }
}

/// Delegate for the gossip-tier control messages the consensus dispatcher
/// routes (§4.7's `IHAVE`/`IWANT`/`GRAFT`/`PRUNE`).
impl<T: PeerTransport, M: MessageReceivedSink> GossipSink for GossipEngine<T, M> {
    fn handle_ihave(&self, from: [u8; 32], msg_ids: Vec<Hash>) {
        let from = PeerId::new(from);
        for id in msg_ids {
            if self.seen.has_seen(&id) {
                continue;
            }
            let sources = self.seen.record_source(id, from, 3);
            if sources == 1 {
                self.transport
                    .send_to_peer(from, GossipFrame::IWant { ids: vec![id] })
                    .ok();
            }
        }
    }

    fn handle_iwant(&self, from: [u8; 32], msg_ids: Vec<Hash>) {
        let from = PeerId::new(from);
        let mut peers = self.peers.write();
        let Some(peer) = peers.get_mut(&from) else {
            warn!(?from, "IWANT from unknown peer, ignoring");
            return;
        };
        if !invariant_iwant_admitted(peer, &self.config) {
            warn!(?from, "IWANT rejected by rate limiter");
            return;
        }
        let truncated: Vec<Hash> = msg_ids.into_iter().take(self.config.iwant_max_ids).collect();
        for id in truncated {
            if !invariant_ihave_was_sent(peer, &id) {
                continue;
            }
            if let Some(body) = self.seen.cached_message(&id) {
                self.transport
                    .send_to_peer(from, GossipFrame::FullMessage { id, body })
                    .ok();
            }
        }
    }

    fn handle_graft(&self, from: [u8; 32]) {
        let from = PeerId::new(from);
        let mut peers = self.peers.write();
        if let Some(peer) = peers.get_mut(&from) {
            peer.tier = PeerTier::Eager;
        }
    }

    fn handle_prune(&self, from: [u8; 32]) {
        let from = PeerId::new(from);
        let mut peers = self.peers.write();
        if let Some(peer) = peers.get_mut(&from) {
            peer.tier = PeerTier::Lazy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GossipError;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<(PeerId, GossipFrame)>>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self { sent: Mutex::new(Vec::new()) }
        }
    }

    impl PeerTransport for RecordingTransport {
        fn send_to_peer(&self, peer: PeerId, frame: GossipFrame) -> Result<(), GossipError> {
            self.sent.lock().unwrap().push((peer, frame));
            Ok(())
        }
    }

    struct RecordingSink {
        received: Mutex<Vec<(MessageId, Vec<u8>)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { received: Mutex::new(Vec::new()) }
        }
    }

    impl MessageReceivedSink for RecordingSink {
        fn on_message_received(&self, id: MessageId, body: Vec<u8>) {
            self.received.lock().unwrap().push((id, body));
        }
    }

    fn engine() -> GossipEngine<RecordingTransport, RecordingSink> {
        GossipEngine::new(
            GossipConfig::default(),
            Arc::new(RecordingTransport::new()),
            Arc::new(RecordingSink::new()),
        )
    }

    #[test]
    fn first_six_peers_go_eager_rest_go_lazy() {
        let engine = engine();
        for i in 0..8u8 {
            engine.connect_peer(PeerId::new([i; 32]));
        }
        assert_eq!(engine.eager_count(), 6);
        assert_eq!(engine.all_peers().len(), 8);
    }

    #[test]
    fn broadcast_priority_pushes_eager_and_ihaves_lazy() {
        let engine = engine();
        for i in 0..8u8 {
            engine.connect_peer(PeerId::new([i; 32]));
        }
        engine.broadcast_priority([1u8; 32], vec![9, 9]);
        let sent = engine.transport.sent.lock().unwrap();
        let full_pushes = sent
            .iter()
            .filter(|(_, f)| matches!(f, GossipFrame::FullMessage { .. }))
            .count();
        let ihaves = sent
            .iter()
            .filter(|(_, f)| matches!(f, GossipFrame::IHave { .. }))
            .count();
        assert_eq!(full_pushes, 6);
        assert_eq!(ihaves, 2);
    }

    #[test]
    fn handle_ihave_requests_only_the_first_source() {
        let engine = engine();
        let peer_a = PeerId::new([1u8; 32]);
        let peer_b = PeerId::new([2u8; 32]);
        engine.connect_peer(peer_a);
        engine.connect_peer(peer_b);

        engine.handle_ihave(peer_a.0, vec![[5u8; 32]]);
        engine.handle_ihave(peer_b.0, vec![[5u8; 32]]);

        let sent = engine.transport.sent.lock().unwrap();
        let iwants = sent
            .iter()
            .filter(|(_, f)| matches!(f, GossipFrame::IWant { .. }))
            .count();
        assert_eq!(iwants, 1);
    }

    #[test]
    fn handle_iwant_only_serves_previously_announced_ids() {
        let engine = engine();
        let peer = PeerId::new([1u8; 32]);
        engine.connect_peer(peer);
        engine.broadcast_standard([7u8; 32], vec![1, 2, 3]);

        engine.handle_iwant(peer.0, vec![[7u8; 32]]);
        engine.handle_iwant(peer.0, vec![[8u8; 32]]);

        let sent = engine.transport.sent.lock().unwrap();
        let pushes: Vec<_> = sent
            .iter()
            .filter(|(_, f)| matches!(f, GossipFrame::FullMessage { .. }))
            .collect();
        assert_eq!(pushes.len(), 1);
    }

    #[test]
    fn handle_full_message_is_idempotent() {
        let engine = engine();
        let peer = PeerId::new([1u8; 32]);
        engine.connect_peer(peer);
        assert!(engine.handle_full_message(peer, [3u8; 32], vec![1]));
        assert!(!engine.handle_full_message(peer, [3u8; 32], vec![1]));
    }

    #[test]
    fn handle_full_message_promotes_lazy_sender() {
        let engine = engine();
        for i in 0..6u8 {
            engine.connect_peer(PeerId::new([i; 32]));
        }
        let lazy_peer = PeerId::new([200u8; 32]);
        engine.connect_peer(lazy_peer);
        assert_eq!(
            engine.peers.read().get(&lazy_peer).unwrap().tier,
            PeerTier::Lazy
        );

        engine.handle_full_message(lazy_peer, [4u8; 32], vec![1]);
        assert_eq!(
            engine.peers.read().get(&lazy_peer).unwrap().tier,
            PeerTier::Eager
        );
    }

    #[test]
    fn rebalance_grafts_up_to_target_after_disconnects() {
        let engine = engine();
        for i in 0..8u8 {
            engine.connect_peer(PeerId::new([i; 32]));
        }
        for i in 0..3u8 {
            engine.disconnect_peer(PeerId::new([i; 32]));
        }
        assert_eq!(engine.eager_count(), 3);
        engine.rebalance();
        assert_eq!(engine.eager_count(), 5);
    }

    #[test]
    fn cleanup_expires_seen_entries_past_ttl() {
        let mut config = GossipConfig::default();
        config.seen_ttl = std::time::Duration::from_millis(1);
        let engine = GossipEngine::new(
            config,
            Arc::new(RecordingTransport::new()),
            Arc::new(RecordingSink::new()),
        );
        engine.broadcast_standard([1u8; 32], vec![]);
        std::thread::sleep(std::time::Duration::from_millis(5));
        engine.cleanup();
        assert!(engine.seen.is_empty());
    }
}
