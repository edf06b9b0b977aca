//! Transport layer modules.
//!
//! ## Available Transports
//!
//! - `tcp` - length-prefixed framing over TCP with an AES-256-GCM channel
//!   cipher installed once the Hello/HelloAck handshake resolves session keys

pub mod tcp;

pub use tcp::{
    bind, read_frame, split, temporary_connection_id, write_frame, AesGcmDuplex,
    ConnectionRegistry, FrameReader, TransportError, FRAME_IDLE_TIMEOUT, MAX_CONNECTIONS_PER_IP,
    MAX_FRAME_BYTES, MAX_TOTAL_CONNECTIONS,
};
