//! # TCP Connection Accept/Dial Loop
//!
//! Owns the node's listening socket and outbound dial attempts, drives the
//! Hello/HelloAck handshake over each connection using `basalt-net`'s pure
//! handshake functions and frame codec, and once a connection resolves a
//! verified peer identity, registers it with the peer registry and the
//! two-tier gossip engine and hands its frames to the consensus dispatcher.
//!
//! Message ordering itself — who sends `Hello` first, how a simultaneous
//! inbound+outbound connection to the same peer is resolved — lives here,
//! per `basalt-net`'s handshake module doc: the transport layer drives it,
//! the domain layer only describes the message shapes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use basalt_consensus::{DispatchOutcome, Dispatcher};
use basalt_crypto::X25519KeyPair;
use basalt_gossip::{GossipApi, PeerId as GossipPeerId};
use basalt_net::{
    bind, build_hello, build_hello_ack, build_hello_reject, derive_session_keys, split,
    temporary_connection_id, verify_hello, verify_hello_ack, AesGcmDuplex, ChainContext, ChainTip,
    ConnectionRegistry, FrameReader, HandshakeIdentity, HandshakeRole, Hello, HelloAck, NodeId,
    PeerIdentity, PeerRegistry, TransportError,
};
use basalt_types::WireMessage;
use parking_lot::RwLock;
use rand::RngCore;
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::adapters::gossip_transport::NodeGossipEngine;

/// Collaborators the connection loop needs, shared across every accepted
/// and dialed connection.
pub struct P2pContext {
    pub identity: HandshakeIdentity,
    pub chain_context: ChainContext,
    pub listen_port: u16,
    pub connections: Arc<ConnectionRegistry>,
    pub peer_registry: Arc<RwLock<PeerRegistry>>,
    pub dispatcher: Arc<Dispatcher>,
    pub gossip: Arc<NodeGossipEngine>,
    pub self_node_id: NodeId,
}

impl P2pContext {
    fn chain_tip(&self) -> ChainTip {
        // No live chain-tip query port exists yet; the handshake advertises
        // the genesis tip until one is wired in.
        ChainTip {
            best_block_number: 0,
            best_block_hash: self.chain_context.genesis_hash,
        }
    }

    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// BLAKE3 hash of a 32-byte public key, the peer id the Kademlia layer and
/// the connection registry key connections under.
pub fn node_id_for_public_key(public_key: &[u8; 32]) -> NodeId {
    NodeId::new(basalt_crypto::blake3_hash(public_key))
}

/// Bind the listener and spawn the accept loop plus one dial task per
/// configured static peer. Returns immediately; everything else runs as
/// background tasks for the lifetime of the process.
pub async fn spawn(ctx: Arc<P2pContext>, listen_addr: SocketAddr, static_peers: Vec<String>) {
    match bind(listen_addr).await {
        Ok(listener) => {
            info!(%listen_addr, "p2p listener bound");
            let accept_ctx = ctx.clone();
            tokio::spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok((stream, remote_addr)) => {
                            let ctx = accept_ctx.clone();
                            tokio::spawn(async move {
                                handle_inbound(ctx, stream, remote_addr).await;
                            });
                        }
                        Err(err) => {
                            warn!(%err, "p2p accept failed");
                        }
                    }
                }
            });
        }
        Err(err) => {
            warn!(%err, %listen_addr, "failed to bind p2p listener, running without inbound connections");
        }
    }

    for peer in static_peers {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            dial(ctx, peer).await;
        });
    }
}

async fn handle_inbound(ctx: Arc<P2pContext>, stream: TcpStream, remote_addr: SocketAddr) {
    if let Err(err) = ctx.connections.try_reserve(remote_addr.ip()) {
        warn!(%remote_addr, %err, "rejecting inbound connection, accept limit reached");
        return;
    }
    let temp_id = temporary_connection_id(&remote_addr.to_string());
    let (duplex, mut reader) = split(stream);
    ctx.connections.insert_temporary(temp_id, duplex.clone());

    match responder_handshake(&ctx, &duplex, &mut reader).await {
        Ok((peer_id, peer_identity)) => {
            finalize_connection(&ctx, temp_id, peer_id, peer_identity, duplex, reader).await;
        }
        Err(err) => {
            warn!(%remote_addr, %err, "inbound handshake failed");
            ctx.connections.remove(&temp_id);
            ctx.connections.release_ip_slot(remote_addr.ip());
        }
    }
}

async fn dial(ctx: Arc<P2pContext>, endpoint: String) {
    let remote_addr: SocketAddr = match tokio::net::lookup_host(&endpoint).await {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr,
            None => {
                warn!(%endpoint, "static peer address resolved to no addresses, skipping");
                return;
            }
        },
        Err(err) => {
            warn!(%endpoint, %err, "failed to resolve static peer address, skipping");
            return;
        }
    };
    let stream = match TcpStream::connect(remote_addr).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(%remote_addr, %err, "outbound dial failed");
            return;
        }
    };
    if let Err(err) = ctx.connections.try_reserve(remote_addr.ip()) {
        warn!(%remote_addr, %err, "dropping outbound connection, accept limit reached");
        return;
    }
    let temp_id = temporary_connection_id(&endpoint);
    let (duplex, mut reader) = split(stream);
    ctx.connections.insert_temporary(temp_id, duplex.clone());

    match initiator_handshake(&ctx, &duplex, &mut reader).await {
        Ok((peer_id, peer_identity)) => {
            finalize_connection(&ctx, temp_id, peer_id, peer_identity, duplex, reader).await;
        }
        Err(err) => {
            warn!(%remote_addr, %err, "outbound handshake failed");
            ctx.connections.remove(&temp_id);
            ctx.connections.release_ip_slot(remote_addr.ip());
        }
    }
}

/// Errors from the connection-level handshake, flattening the domain
/// layer's `HandshakeError`, an on-wire rejection, and transport failures.
#[derive(Debug)]
enum ConnectError {
    Transport(TransportError),
    Rejected(basalt_net::RejectReason),
    Handshake(basalt_net::HandshakeError),
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::Rejected(r) => write!(f, "peer rejected handshake: {r}"),
            Self::Handshake(e) => write!(f, "{e}"),
        }
    }
}

impl From<TransportError> for ConnectError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<basalt_net::HandshakeError> for ConnectError {
    fn from(e: basalt_net::HandshakeError) -> Self {
        Self::Handshake(e)
    }
}

fn random_nonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

async fn initiator_handshake(
    ctx: &P2pContext,
    duplex: &Arc<AesGcmDuplex>,
    reader: &mut FrameReader,
) -> Result<(NodeId, PeerIdentity), ConnectError> {
    let ephemeral = X25519KeyPair::generate();
    let hello = build_hello(
        &ctx.identity,
        ctx.chain_context,
        ctx.chain_tip(),
        ctx.listen_port,
        random_nonce(),
        ephemeral.public_key(),
    );
    duplex.send(&hello.encode()).await?;

    let ack_bytes = reader.recv().await?;
    let ack = HelloAck::decode(&ack_bytes).map_err(ConnectError::Handshake)?;
    let peer_identity = verify_hello_ack(&ack, &hello, ctx.chain_context)?;

    let session_keys = derive_session_keys(&ephemeral, &ack.x25519_public_key, HandshakeRole::Initiator);
    duplex.install_send_key(session_keys.send_key).await;
    reader.install_recv_key(session_keys.recv_key);

    let peer_id = node_id_for_public_key(&peer_identity.node_public_key);
    Ok((peer_id, peer_identity))
}

async fn responder_handshake(
    ctx: &P2pContext,
    duplex: &Arc<AesGcmDuplex>,
    reader: &mut FrameReader,
) -> Result<(NodeId, PeerIdentity), ConnectError> {
    let hello_bytes = reader.recv().await?;
    let hello = Hello::decode(&hello_bytes).map_err(ConnectError::Handshake)?;

    if let Err(reason) = verify_hello(&hello, ctx.chain_context) {
        let reject = build_hello_reject(ctx.chain_context.genesis_hash, reason);
        let _ = duplex.send(&reject.encode()).await;
        return Err(ConnectError::Rejected(reason));
    }

    let ephemeral = X25519KeyPair::generate();
    let ack = build_hello_ack(
        &ctx.identity,
        ctx.chain_context,
        ctx.chain_tip(),
        ctx.listen_port,
        &hello,
        ephemeral.public_key(),
    );
    duplex.send(&ack.encode()).await?;

    let session_keys = derive_session_keys(&ephemeral, &hello.x25519_public_key, HandshakeRole::Responder);
    duplex.install_send_key(session_keys.send_key).await;
    reader.install_recv_key(session_keys.recv_key);

    let peer_identity = PeerIdentity {
        node_public_key: hello.node_public_key,
        bls_public_key: hello.bls_public_key,
        listen_port: hello.listen_port,
    };
    let peer_id = node_id_for_public_key(&peer_identity.node_public_key);
    Ok((peer_id, peer_identity))
}

async fn finalize_connection(
    ctx: &Arc<P2pContext>,
    temp_id: NodeId,
    peer_id: NodeId,
    peer_identity: PeerIdentity,
    duplex: Arc<AesGcmDuplex>,
    mut reader: FrameReader,
) {
    if !ctx.connections.reassign(temp_id, peer_id) {
        info!(?peer_id, "dropping connection, already connected to this peer");
        return;
    }

    {
        let mut registry = ctx.peer_registry.write();
        if registry.get(&peer_id).is_none() {
            let addr = basalt_net::SocketAddr::new(basalt_net::IpAddr::v4(0, 0, 0, 0), peer_identity.listen_port);
            let _ = registry.add_static(
                peer_id,
                peer_identity.node_public_key,
                addr,
                basalt_net::Timestamp::new(ctx.now_secs()),
            );
        }
        let _ = registry.mark_connected(peer_id, basalt_net::Timestamp::new(ctx.now_secs()));
    }
    ctx.gossip.connect_peer(GossipPeerId::new(*peer_id.as_bytes()));
    info!(?peer_id, "peer connected");

    let ctx = ctx.clone();
    tokio::spawn(async move {
        read_loop(ctx, peer_id, duplex, &mut reader).await;
    });
}

async fn read_loop(
    ctx: Arc<P2pContext>,
    peer_id: NodeId,
    duplex: Arc<AesGcmDuplex>,
    reader: &mut FrameReader,
) {
    loop {
        let frame = match reader.recv().await {
            Ok(frame) => frame,
            Err(err) => {
                info!(?peer_id, %err, "connection closed");
                break;
            }
        };
        let msg = match WireMessage::decode(&frame) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(?peer_id, %err, "malformed wire frame, dropping connection");
                break;
            }
        };
        match ctx.dispatcher.dispatch(&msg, *peer_id.as_bytes()) {
            Ok(DispatchOutcome::NoReply) => {}
            Ok(DispatchOutcome::Reply(tag, body)) => {
                let reply = WireMessage::new(tag, *ctx.self_node_id.as_bytes(), now_ms(), body);
                if let Err(err) = duplex.send(&reply.encode()).await {
                    warn!(?peer_id, %err, "failed to send reply");
                    break;
                }
            }
            Ok(DispatchOutcome::GossipStandard(tag, body)) => {
                let envelope = WireMessage::new(tag, *ctx.self_node_id.as_bytes(), now_ms(), body);
                let encoded = envelope.encode();
                let id = basalt_crypto::blake3_hash(&encoded);
                ctx.gossip.broadcast_standard(id, encoded);
            }
            Ok(DispatchOutcome::TriggerResync) => {
                warn!(?peer_id, "chain gap detected, resync not yet automated");
            }
            Err(err) => {
                warn!(?peer_id, %err, "dispatch failed, dropping connection");
                break;
            }
        }
    }

    ctx.connections.remove(&peer_id);
    ctx.gossip.disconnect_peer(GossipPeerId::new(*peer_id.as_bytes()));
    let mut registry = ctx.peer_registry.write();
    let _ = registry.disconnect(
        peer_id,
        basalt_net::DisconnectReason::Timeout,
        basalt_net::Timestamp::new(ctx.now_secs()),
    );
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_for_public_key_is_deterministic() {
        let key = [9u8; 32];
        assert_eq!(node_id_for_public_key(&key), node_id_for_public_key(&key));
    }
}
