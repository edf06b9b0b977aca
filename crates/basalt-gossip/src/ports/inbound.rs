//! Inbound ports (API) for the gossip engine.

use crate::domain::{MessageId, PeerId};

/// Primary API for broadcasting an application message into the network.
pub trait GossipApi: Send + Sync {
    /// Broadcast with priority: full push to the eager tier, `IHAVE` to the
    /// lazy tier. Used for latency-sensitive messages (consensus frames).
    fn broadcast_priority(&self, id: MessageId, body: Vec<u8>);

    /// Broadcast standard: `IHAVE` to every connected peer. Used for
    /// messages where eventual delivery is enough (transaction gossip).
    fn broadcast_standard(&self, id: MessageId, body: Vec<u8>);

    /// Register a newly connected peer, assigning it a tier.
    fn connect_peer(&self, peer: PeerId);

    /// Drop all bookkeeping for a disconnected peer.
    fn disconnect_peer(&self, peer: PeerId);

    /// Graft/prune peers to bring the eager tier back within target/cap.
    fn rebalance(&self);

    /// Expire seen entries, cached messages, and per-peer IHAVE tracking
    /// past their TTL.
    fn cleanup(&self);
}

/// Sink for messages newly received in full (deduplicated, handed off
/// exactly once per message id).
pub trait MessageReceivedSink: Send + Sync {
    fn on_message_received(&self, id: MessageId, body: Vec<u8>);
}
