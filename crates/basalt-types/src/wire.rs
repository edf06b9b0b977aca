//! # Network Wire Message Envelope
//!
//! The header every peer-to-peer message carries, distinct from the
//! internal `AuthenticatedMessage<T>` used for cross-subsystem IPC. This is
//! what goes over the wire inside a length-prefixed transport frame.
//!
//! Header layout: `u8 type | 32B sender_id | i64 timestamp_ms | body`.
//! Body layout is tag-specific; all fields use the binary codec.

use crate::codec::{CodecError, Reader, Writer};

/// Message type tag, one byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageTag {
    Hello = 0x01,
    HelloAck = 0x02,
    Ping = 0x03,
    Pong = 0x04,
    TxAnnounce = 0x10,
    TxRequest = 0x11,
    TxPayload = 0x12,
    BlockAnnounce = 0x20,
    BlockRequest = 0x21,
    BlockPayload = 0x22,
    ConsensusProposal = 0x30,
    ConsensusVote = 0x31,
    ConsensusViewChange = 0x32,
    ConsensusAggregateVote = 0x33,
    SyncRequest = 0x40,
    SyncResponse = 0x41,
    IHave = 0x50,
    IWant = 0x51,
    Graft = 0x52,
    Prune = 0x53,
    FindNode = 0x60,
    FindNodeResponse = 0x61,
}

impl MessageTag {
    /// Map a wire byte to a tag, if recognized.
    pub fn from_byte(byte: u8) -> Option<Self> {
        use MessageTag::*;
        Some(match byte {
            0x01 => Hello,
            0x02 => HelloAck,
            0x03 => Ping,
            0x04 => Pong,
            0x10 => TxAnnounce,
            0x11 => TxRequest,
            0x12 => TxPayload,
            0x20 => BlockAnnounce,
            0x21 => BlockRequest,
            0x22 => BlockPayload,
            0x30 => ConsensusProposal,
            0x31 => ConsensusVote,
            0x32 => ConsensusViewChange,
            0x33 => ConsensusAggregateVote,
            0x40 => SyncRequest,
            0x41 => SyncResponse,
            0x50 => IHave,
            0x51 => IWant,
            0x52 => Graft,
            0x53 => Prune,
            0x60 => FindNode,
            0x61 => FindNodeResponse,
            _ => return None,
        })
    }
}

/// A decoded wire frame: header fields plus the still-encoded body.
///
/// Consumers further decode `body` according to `tag` once they know what
/// shape to expect; the dispatcher itself only needs the header to route.
#[derive(Debug, Clone)]
pub struct WireMessage {
    pub tag: MessageTag,
    pub sender_id: [u8; 32],
    pub timestamp_ms: i64,
    pub body: Vec<u8>,
}

impl WireMessage {
    /// Construct a new wire message with an already-encoded body.
    pub fn new(tag: MessageTag, sender_id: [u8; 32], timestamp_ms: i64, body: Vec<u8>) -> Self {
        Self {
            tag,
            sender_id,
            timestamp_ms,
            body,
        }
    }

    /// Encode the header + body as a single payload, ready to be placed
    /// inside a length-prefixed transport frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(1 + 32 + 8 + self.body.len());
        w.write_u8(self.tag as u8);
        w.write_hash(&self.sender_id);
        w.write_i64(self.timestamp_ms);
        let mut out = w.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }

    /// Decode a payload previously produced by [`WireMessage::encode`].
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(payload);
        let tag_byte = r.read_u8()?;
        let tag = MessageTag::from_byte(tag_byte).ok_or(CodecError::InvalidVarInt)?;
        let sender_id = r.read_hash()?;
        let timestamp_ms = r.read_i64()?;
        let body = payload[payload.len() - r.remaining()..].to_vec();
        Ok(Self {
            tag,
            sender_id,
            timestamp_ms,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let msg = WireMessage::new(MessageTag::Ping, [9u8; 32], 42, vec![1, 2, 3]);
        let encoded = msg.encode();
        let decoded = WireMessage::decode(&encoded).unwrap();
        assert_eq!(decoded.tag, MessageTag::Ping);
        assert_eq!(decoded.sender_id, [9u8; 32]);
        assert_eq!(decoded.timestamp_ms, 42);
        assert_eq!(decoded.body, vec![1, 2, 3]);
    }

    #[test]
    fn unknown_tag_rejected() {
        let mut payload = vec![0xFF];
        payload.extend_from_slice(&[0u8; 32]);
        payload.extend_from_slice(&0i64.to_le_bytes());
        assert!(WireMessage::decode(&payload).is_err());
    }
}
