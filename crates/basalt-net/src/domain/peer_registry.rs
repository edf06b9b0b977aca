//! Peer Registry (SPEC-02 Section 4.6)
//!
//! Maps peer id to a record tracking connection lifecycle and reputation.
//! State transitions are one-way except `Disconnected -> Connecting` on
//! reconnect attempts.

use std::collections::HashMap;

use crate::domain::{find_k_closest, BanReason, DisconnectReason, NodeId, PeerInfo, SocketAddr, Timestamp};

/// Default cap on the number of peer records the registry holds.
pub const DEFAULT_MAX_PEERS: usize = 50;

/// Lifecycle state of a registered peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Connecting,
    Connected,
    Disconnected,
    Banned,
}

/// Everything the registry knows about one peer.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub node_id: NodeId,
    pub public_key: [u8; 32],
    pub socket_addr: SocketAddr,
    pub state: PeerState,
    pub reputation: i32,
    pub last_active: Timestamp,
}

impl PeerRecord {
    fn new(node_id: NodeId, public_key: [u8; 32], socket_addr: SocketAddr, now: Timestamp) -> Self {
        Self {
            node_id,
            public_key,
            socket_addr,
            state: PeerState::Connecting,
            reputation: 50,
            last_active: now,
        }
    }
}

/// Errors the registry can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// `max_peers` records already held, and this isn't an existing peer.
    RegistryFull,
    /// No record exists for this node id.
    UnknownPeer,
    /// Reconnect attempted on a record that isn't `Disconnected`.
    NotDisconnected,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegistryFull => write!(f, "peer registry is at capacity"),
            Self::UnknownPeer => write!(f, "no record for this peer"),
            Self::NotDisconnected => write!(f, "peer is not in the disconnected state"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Tracks every peer this node has ever connected to, statically configured,
/// or discovered via the gossip/Kademlia layers.
pub struct PeerRegistry {
    records: HashMap<NodeId, PeerRecord>,
    max_peers: usize,
}

impl PeerRegistry {
    pub fn new(max_peers: usize) -> Self {
        Self {
            records: HashMap::new(),
            max_peers,
        }
    }

    /// Register a peer known in advance (e.g. from config), bypassing the
    /// usual discovery path. Subject to the same capacity limit.
    pub fn add_static(
        &mut self,
        node_id: NodeId,
        public_key: [u8; 32],
        socket_addr: SocketAddr,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        self.register(PeerRecord::new(node_id, public_key, socket_addr, now))
    }

    /// Insert or replace a record, enforcing `max_peers` for genuinely new peers.
    pub fn register(&mut self, record: PeerRecord) -> Result<(), RegistryError> {
        if !self.records.contains_key(&record.node_id) && self.records.len() >= self.max_peers {
            return Err(RegistryError::RegistryFull);
        }
        self.records.insert(record.node_id, record);
        Ok(())
    }

    /// Mark the connection established.
    pub fn mark_connected(&mut self, node_id: NodeId, now: Timestamp) -> Result<(), RegistryError> {
        let record = self.records.get_mut(&node_id).ok_or(RegistryError::UnknownPeer)?;
        record.state = PeerState::Connected;
        record.last_active = now;
        Ok(())
    }

    /// Ban a peer: reputation drops to zero, state becomes `Banned`.
    pub fn ban(&mut self, node_id: NodeId, _reason: BanReason) -> Result<(), RegistryError> {
        let record = self.records.get_mut(&node_id).ok_or(RegistryError::UnknownPeer)?;
        record.state = PeerState::Banned;
        record.reputation = 0;
        Ok(())
    }

    /// Disconnect a peer; the record is retained for a possible reconnect.
    pub fn disconnect(
        &mut self,
        node_id: NodeId,
        _reason: DisconnectReason,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        let record = self.records.get_mut(&node_id).ok_or(RegistryError::UnknownPeer)?;
        if record.state != PeerState::Banned {
            record.state = PeerState::Disconnected;
            record.last_active = now;
        }
        Ok(())
    }

    /// Begin reconnecting to a previously disconnected peer.
    pub fn reconnect(&mut self, node_id: NodeId) -> Result<(), RegistryError> {
        let record = self.records.get_mut(&node_id).ok_or(RegistryError::UnknownPeer)?;
        if record.state != PeerState::Disconnected {
            return Err(RegistryError::NotDisconnected);
        }
        record.state = PeerState::Connecting;
        Ok(())
    }

    /// Drop `Disconnected` records whose `last_active` is older than `timeout_secs`.
    /// Returns the number of records dropped.
    pub fn prune_inactive(&mut self, timeout_secs: u64, now: Timestamp) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| {
            !(record.state == PeerState::Disconnected
                && now.as_secs().saturating_sub(record.last_active.as_secs()) > timeout_secs)
        });
        before - self.records.len()
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&PeerRecord> {
        self.records.get(node_id)
    }

    pub fn is_banned(&self, node_id: &NodeId) -> bool {
        self.records
            .get(node_id)
            .map(|r| r.state == PeerState::Banned)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serve the `k` connected peers closest to `target` by XOR distance,
    /// for the FindNode/FindNodeResponse dispatch action.
    pub fn closest_connected(&self, target: NodeId, k: usize) -> Vec<PeerInfo> {
        let connected: Vec<PeerInfo> = self
            .records
            .values()
            .filter(|r| r.state == PeerState::Connected)
            .map(|r| PeerInfo {
                node_id: r.node_id,
                socket_addr: r.socket_addr,
                last_seen: r.last_active,
                reputation_score: r.reputation.clamp(0, 100) as u8,
            })
            .collect();
        find_k_closest(&connected, &target, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IpAddr;

    fn addr(n: u8) -> SocketAddr {
        SocketAddr::new(IpAddr::v4(10, 0, 0, n), 30303)
    }

    fn node(n: u8) -> NodeId {
        NodeId::new([n; 32])
    }

    #[test]
    fn register_rejects_beyond_capacity() {
        let mut registry = PeerRegistry::new(1);
        registry
            .add_static(node(1), [1; 32], addr(1), Timestamp::new(0))
            .unwrap();
        let err = registry
            .add_static(node(2), [2; 32], addr(2), Timestamp::new(0))
            .unwrap_err();
        assert_eq!(err, RegistryError::RegistryFull);
    }

    #[test]
    fn ban_zeroes_reputation_and_is_terminal() {
        let mut registry = PeerRegistry::new(10);
        registry
            .add_static(node(1), [1; 32], addr(1), Timestamp::new(0))
            .unwrap();
        registry.ban(node(1), BanReason::ManualBan).unwrap();
        assert!(registry.is_banned(&node(1)));
        // Disconnecting a banned peer must not downgrade it back to Disconnected.
        registry
            .disconnect(node(1), DisconnectReason::ExplicitRemoval, Timestamp::new(10))
            .unwrap();
        assert_eq!(registry.get(&node(1)).unwrap().state, PeerState::Banned);
    }

    #[test]
    fn reconnect_only_allowed_from_disconnected() {
        let mut registry = PeerRegistry::new(10);
        registry
            .add_static(node(1), [1; 32], addr(1), Timestamp::new(0))
            .unwrap();
        assert_eq!(
            registry.reconnect(node(1)).unwrap_err(),
            RegistryError::NotDisconnected
        );
        registry
            .disconnect(node(1), DisconnectReason::Timeout, Timestamp::new(1))
            .unwrap();
        registry.reconnect(node(1)).unwrap();
        assert_eq!(registry.get(&node(1)).unwrap().state, PeerState::Connecting);
    }

    #[test]
    fn prune_inactive_drops_only_stale_disconnected_records() {
        let mut registry = PeerRegistry::new(10);
        registry
            .add_static(node(1), [1; 32], addr(1), Timestamp::new(0))
            .unwrap();
        registry
            .add_static(node(2), [2; 32], addr(2), Timestamp::new(0))
            .unwrap();
        registry
            .disconnect(node(1), DisconnectReason::Timeout, Timestamp::new(0))
            .unwrap();

        let dropped = registry.prune_inactive(100, Timestamp::new(50));
        assert_eq!(dropped, 0);

        let dropped = registry.prune_inactive(100, Timestamp::new(500));
        assert_eq!(dropped, 1);
        assert!(registry.get(&node(1)).is_none());
        assert!(registry.get(&node(2)).is_some());
    }
}
