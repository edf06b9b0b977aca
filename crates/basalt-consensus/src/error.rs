//! Dispatch error type.

use thiserror::Error;

/// Errors raised while routing a wire frame to its handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A Hello/HelloAck frame arrived after the handshake already completed.
    #[error("handshake message received post-handshake")]
    HandshakeAlreadyComplete,

    /// The frame's body failed to decode for its declared tag.
    #[error("malformed body for tag {0:?}")]
    MalformedBody(basalt_types::MessageTag),

    /// A sync/block/tx request asked for more items than the serving cap allows.
    #[error("requested range exceeds serving cap: requested {requested}, max {max}")]
    RangeTooLarge { requested: usize, max: usize },

    /// The underlying collaborator (mempool, block store, chain, consensus engine) failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// A double-sign was detected for the given (view, proposer) pair.
    #[error("double sign detected for view {view}, proposer {proposer:?}")]
    DoubleSignDetected { view: u64, proposer: [u8; 32] },
}
