//! # Gossip Transport & Routing Adapters
//!
//! Bridges `basalt-gossip`'s `GossipEngine` to the node's real TCP transport
//! (`basalt-net`'s `ConnectionRegistry`) and peer registry, so the
//! composition root can wire the actual two-tier gossip engine into the
//! consensus dispatcher instead of the in-memory Noop stubs.

use std::sync::{Arc, OnceLock};

use basalt_consensus::ports::PeerRouting;
use basalt_consensus::Dispatcher;
use basalt_gossip::{GossipEngine, GossipError, GossipFrame, MessageReceivedSink, PeerId, PeerTransport};
use basalt_net::{ConnectionRegistry, NodeId, PeerRegistry};
use basalt_types::{MessageTag, WireMessage};
use parking_lot::RwLock;
use tracing::warn;

/// The concrete two-tier gossip engine this node wires into the dispatcher
/// and drives from the P2P connection loop.
pub type NodeGossipEngine = GossipEngine<NetGossipTransport, DispatcherMessageSink>;

/// Wire tag bytes for [`GossipFrame`] variants, distinct from
/// `basalt_types::MessageTag` (which tags the gossiped payload itself).
const FRAME_FULL_MESSAGE: u8 = 0;
const FRAME_IHAVE: u8 = 1;
const FRAME_IWANT: u8 = 2;
const FRAME_GRAFT: u8 = 3;
const FRAME_PRUNE: u8 = 4;

fn encode_frame(frame: &GossipFrame) -> Vec<u8> {
    match frame {
        GossipFrame::FullMessage { id, body } => {
            let mut out = Vec::with_capacity(1 + 32 + body.len());
            out.push(FRAME_FULL_MESSAGE);
            out.extend_from_slice(id);
            out.extend_from_slice(body);
            out
        }
        GossipFrame::IHave { ids } => encode_id_list(FRAME_IHAVE, ids),
        GossipFrame::IWant { ids } => encode_id_list(FRAME_IWANT, ids),
        GossipFrame::Graft => vec![FRAME_GRAFT],
        GossipFrame::Prune => vec![FRAME_PRUNE],
    }
}

fn encode_id_list(tag: u8, ids: &[[u8; 32]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 4 + ids.len() * 32);
    out.push(tag);
    out.extend_from_slice(&(ids.len() as u32).to_be_bytes());
    for id in ids {
        out.extend_from_slice(id);
    }
    out
}

/// [`PeerTransport`] backed by the node's live TCP connections. Sends are
/// fire-and-forget: gossip delivery is best-effort by design, and a failed
/// send just drops the connection on the next broadcast pass.
pub struct NetGossipTransport {
    registry: Arc<ConnectionRegistry>,
    runtime: tokio::runtime::Handle,
}

impl NetGossipTransport {
    pub fn new(registry: Arc<ConnectionRegistry>, runtime: tokio::runtime::Handle) -> Self {
        Self { registry, runtime }
    }
}

impl PeerTransport for NetGossipTransport {
    fn send_to_peer(&self, peer: PeerId, frame: GossipFrame) -> Result<(), GossipError> {
        let registry = self.registry.clone();
        let node_id = NodeId::new(peer.0);
        let wire = encode_frame(&frame);
        let _ = self.runtime.spawn(async move {
            if let Err(err) = registry.send_to(&node_id, &wire).await {
                warn!(?peer, %err, "gossip frame send failed");
            }
        });
        Ok(())
    }
}

/// Forwards gossip-delivered full messages back into the dispatcher, as if
/// they had arrived directly over the wire from the peer that relayed them.
/// The dispatcher is supplied after construction (it in turn holds this
/// sink's engine), so lookups go through a [`OnceLock`] set once during
/// composition-root wiring.
pub struct DispatcherMessageSink {
    dispatcher: OnceLock<Arc<Dispatcher>>,
}

impl DispatcherMessageSink {
    pub fn new() -> Self {
        Self {
            dispatcher: OnceLock::new(),
        }
    }

    /// Complete the wiring once the dispatcher that owns this engine exists.
    /// Must be called exactly once; a second call is a no-op (logged).
    pub fn bind(&self, dispatcher: Arc<Dispatcher>) {
        if self.dispatcher.set(dispatcher).is_err() {
            warn!("DispatcherMessageSink already bound, ignoring duplicate bind");
        }
    }
}

impl Default for DispatcherMessageSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageReceivedSink for DispatcherMessageSink {
    fn on_message_received(&self, id: basalt_gossip::MessageId, body: Vec<u8>) {
        let Some(dispatcher) = self.dispatcher.get() else {
            warn!(?id, "gossip message received before dispatcher was bound, dropping");
            return;
        };
        let Some((tag_byte, inner_body)) = body.split_first() else {
            warn!(?id, "gossip message body empty, dropping");
            return;
        };
        let Some(tag) = MessageTag::from_byte(*tag_byte) else {
            warn!(?id, tag_byte, "gossip message carries an unrecognized tag, dropping");
            return;
        };
        let msg = WireMessage {
            tag,
            sender_id: [0u8; 32],
            timestamp_ms: 0,
            body: inner_body.to_vec(),
        };
        if let Err(err) = dispatcher.dispatch(&msg, [0u8; 32]) {
            warn!(?id, %err, "dispatch of gossip-relayed message failed");
        }
    }
}

/// [`PeerRouting`] backed by the live peer registry's XOR-closest lookup.
pub struct NetPeerRouting {
    registry: Arc<RwLock<PeerRegistry>>,
}

impl NetPeerRouting {
    pub fn new(registry: Arc<RwLock<PeerRegistry>>) -> Self {
        Self { registry }
    }
}

impl PeerRouting for NetPeerRouting {
    fn closest_peers(&self, target: [u8; 32]) -> Vec<[u8; 32]> {
        self.registry
            .read()
            .closest_connected(NodeId::new(target), 20)
            .into_iter()
            .map(|peer| *peer.node_id.as_bytes())
            .collect()
    }
}
