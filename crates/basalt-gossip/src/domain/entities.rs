//! # Core Domain Entities
//!
//! Defines the fundamental identifiers for the two-tier gossip engine.

use basalt_types::Hash;

/// Identifier of a gossiped message (a content hash, not a peer id).
pub type MessageId = Hash;

/// 32-byte peer identifier for P2P communication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Creates a new peer ID from a 32-byte array.
    pub fn new(id: [u8; 32]) -> Self {
        Self(id)
    }

    /// Creates a peer ID from a byte slice.
    ///
    /// Returns `None` if the slice is shorter than 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 32 {
            let mut id = [0u8; 32];
            id.copy_from_slice(&bytes[..32]);
            Some(Self(id))
        } else {
            None
        }
    }
}

/// Which tier a peer is assigned to for message dissemination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerTier {
    /// Receives full messages on priority broadcast.
    Eager,
    /// Receives only `IHAVE` announcements.
    Lazy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_round_trips_through_bytes() {
        let id = PeerId::new([7u8; 32]);
        let bytes = id.0;
        assert_eq!(PeerId::from_bytes(&bytes), Some(id));
    }

    #[test]
    fn peer_id_from_short_slice_is_none() {
        assert_eq!(PeerId::from_bytes(&[1, 2, 3]), None);
    }
}
