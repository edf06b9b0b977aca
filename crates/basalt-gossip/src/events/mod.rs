//! Error types for the gossip engine.

use thiserror::Error;

/// Gossip engine errors.
#[derive(Debug, Error)]
pub enum GossipError {
    #[error("unknown peer: {0:?}")]
    UnknownPeer([u8; 32]),

    #[error("send to peer failed: {0}")]
    SendFailed(String),
}
