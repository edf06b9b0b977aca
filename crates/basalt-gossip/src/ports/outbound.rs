//! Outbound port (SPI) for the gossip engine: sending frames to peers.

use crate::domain::{MessageId, PeerId};
use crate::events::GossipError;

/// A gossip-tier control or data frame, ready for wire encoding by the
/// transport layer.
#[derive(Clone, Debug)]
pub enum GossipFrame {
    /// Full message push (priority broadcast to the eager tier, or a
    /// served `IWANT` reply).
    FullMessage { id: MessageId, body: Vec<u8> },
    /// Announce that we have these messages, without sending their bodies.
    IHave { ids: Vec<MessageId> },
    /// Request these messages from a peer that announced them.
    IWant { ids: Vec<MessageId> },
    /// Ask to be promoted into the peer's eager tier.
    Graft,
    /// Ask to be demoted into the peer's lazy tier.
    Prune,
}

/// Peer transport the gossip engine sends frames through. The two-tier
/// engine doesn't know or care how frames reach the wire — only that they
/// do.
pub trait PeerTransport: Send + Sync {
    /// Send one frame to a single peer.
    fn send_to_peer(&self, peer: PeerId, frame: GossipFrame) -> Result<(), GossipError>;

    /// Send one frame to every peer in `peers`.
    fn broadcast(&self, peers: &[PeerId], frame: GossipFrame) {
        for &peer in peers {
            let _ = self.send_to_peer(peer, frame.clone());
        }
    }
}
