//! Hello/HelloAck Handshake Protocol (SPEC-02 Section 4.5)
//!
//! Two-message challenge/response: the initiator proves control of its
//! `node_public_key` by signing a fresh nonce, the responder proves the
//! same by signing the initiator's nonce back. Both sides additionally
//! exchange an ephemeral X25519 public key (itself bound to the Ed25519
//! identity by a signature) so the session can derive an AEAD channel key
//! without the identity key ever touching the wire in a reusable form.
//!
//! This module holds the pure message shapes and the build/verify
//! functions; the actual message ordering (including the simultaneous-Hello
//! edge case) is driven by the transport layer, which owns the socket.

use basalt_crypto::{
    blake3_hash, derive_channel_key, derive_directional_key, CryptoError, Ed25519KeyPair,
    Ed25519PublicKey, Ed25519Signature, X25519KeyPair,
};

const HELLO_DOMAIN: &[u8] = b"basalt-hello-v1";
const ACK_DOMAIN: &[u8] = b"basalt-ack-v1";
const CHANNEL_INFO_PREFIX: &[u8] = b"basalt-channel-v1";
const X25519_BINDING_DOMAIN: &[u8] = b"basalt-x25519-binding-v1";

/// Lowest protocol version this node will speak to.
pub const MIN_PROTOCOL_VERSION: u32 = 1;

/// Static identity this node presents during every handshake.
pub struct HandshakeIdentity {
    pub signing_key: Ed25519KeyPair,
    pub bls_public_key: [u8; 48],
}

/// Facts about the local chain that must match on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainContext {
    pub chain_id: u64,
    pub genesis_hash: [u8; 32],
}

/// A node's current chain tip, advertised during the handshake.
#[derive(Debug, Clone, Copy)]
pub struct ChainTip {
    pub best_block_number: u64,
    pub best_block_hash: [u8; 32],
}

/// First message of the handshake, sent by the connection's initiator.
#[derive(Debug, Clone)]
pub struct Hello {
    pub protocol_version: u32,
    pub chain_id: u64,
    pub best_block_number: u64,
    pub best_block_hash: [u8; 32],
    pub genesis_hash: [u8; 32],
    pub node_public_key: [u8; 32],
    pub bls_public_key: [u8; 48],
    pub listen_port: u16,
    pub challenge_nonce: [u8; 32],
    pub auth_signature: [u8; 64],
    pub x25519_public_key: [u8; 32],
    pub x25519_key_signature: [u8; 64],
}

/// Response to a [`Hello`].
#[derive(Debug, Clone)]
pub struct HelloAck {
    pub accepted: bool,
    pub reject_reason: Option<RejectReason>,
    pub node_public_key: [u8; 32],
    pub bls_public_key: [u8; 48],
    pub listen_port: u16,
    pub best_block_number: u64,
    pub best_block_hash: [u8; 32],
    pub challenge_response: [u8; 64],
    pub genesis_hash: [u8; 32],
    pub x25519_public_key: [u8; 32],
    pub x25519_key_signature: [u8; 64],
}

/// Fixed wire length of an encoded [`Hello`] (every field is fixed-width).
pub const HELLO_WIRE_LEN: usize = 358;
/// Fixed wire length of an encoded [`HelloAck`].
pub const HELLO_ACK_WIRE_LEN: usize = 316;

impl Hello {
    /// Encode to the fixed-width wire format the transport frames.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HELLO_WIRE_LEN);
        out.extend_from_slice(&self.protocol_version.to_be_bytes());
        out.extend_from_slice(&self.chain_id.to_be_bytes());
        out.extend_from_slice(&self.best_block_number.to_be_bytes());
        out.extend_from_slice(&self.best_block_hash);
        out.extend_from_slice(&self.genesis_hash);
        out.extend_from_slice(&self.node_public_key);
        out.extend_from_slice(&self.bls_public_key);
        out.extend_from_slice(&self.listen_port.to_be_bytes());
        out.extend_from_slice(&self.challenge_nonce);
        out.extend_from_slice(&self.auth_signature);
        out.extend_from_slice(&self.x25519_public_key);
        out.extend_from_slice(&self.x25519_key_signature);
        debug_assert_eq!(out.len(), HELLO_WIRE_LEN);
        out
    }

    /// Decode from the fixed-width wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, HandshakeError> {
        if bytes.len() != HELLO_WIRE_LEN {
            return Err(HandshakeError::MalformedSignature);
        }
        let mut r = ByteReader::new(bytes);
        Ok(Hello {
            protocol_version: r.u32(),
            chain_id: r.u64(),
            best_block_number: r.u64(),
            best_block_hash: r.arr32(),
            genesis_hash: r.arr32(),
            node_public_key: r.arr32(),
            bls_public_key: r.arr48(),
            listen_port: r.u16(),
            challenge_nonce: r.arr32(),
            auth_signature: r.arr64(),
            x25519_public_key: r.arr32(),
            x25519_key_signature: r.arr64(),
        })
    }
}

impl HelloAck {
    /// Encode to the fixed-width wire format the transport frames.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HELLO_ACK_WIRE_LEN);
        out.push(self.accepted as u8);
        out.push(self.reject_reason.map(reject_reason_to_tag).unwrap_or(0));
        out.extend_from_slice(&self.node_public_key);
        out.extend_from_slice(&self.bls_public_key);
        out.extend_from_slice(&self.listen_port.to_be_bytes());
        out.extend_from_slice(&self.best_block_number.to_be_bytes());
        out.extend_from_slice(&self.best_block_hash);
        out.extend_from_slice(&self.challenge_response);
        out.extend_from_slice(&self.genesis_hash);
        out.extend_from_slice(&self.x25519_public_key);
        out.extend_from_slice(&self.x25519_key_signature);
        debug_assert_eq!(out.len(), HELLO_ACK_WIRE_LEN);
        out
    }

    /// Decode from the fixed-width wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, HandshakeError> {
        if bytes.len() != HELLO_ACK_WIRE_LEN {
            return Err(HandshakeError::MalformedSignature);
        }
        let mut r = ByteReader::new(bytes);
        let accepted = r.u8() != 0;
        let reject_reason = tag_to_reject_reason(r.u8());
        Ok(HelloAck {
            accepted,
            reject_reason,
            node_public_key: r.arr32(),
            bls_public_key: r.arr48(),
            listen_port: r.u16(),
            best_block_number: r.u64(),
            best_block_hash: r.arr32(),
            challenge_response: r.arr64(),
            genesis_hash: r.arr32(),
            x25519_public_key: r.arr32(),
            x25519_key_signature: r.arr64(),
        })
    }
}

fn reject_reason_to_tag(reason: RejectReason) -> u8 {
    match reason {
        RejectReason::ChainIdMismatch => 1,
        RejectReason::GenesisHashMismatch => 2,
        RejectReason::UnsupportedProtocolVersion => 3,
        RejectReason::InvalidAuthSignature => 4,
        RejectReason::InvalidEphemeralKeySignature => 5,
    }
}

fn tag_to_reject_reason(tag: u8) -> Option<RejectReason> {
    match tag {
        1 => Some(RejectReason::ChainIdMismatch),
        2 => Some(RejectReason::GenesisHashMismatch),
        3 => Some(RejectReason::UnsupportedProtocolVersion),
        4 => Some(RejectReason::InvalidAuthSignature),
        5 => Some(RejectReason::InvalidEphemeralKeySignature),
        _ => None,
    }
}

/// Tiny fixed-field reader over a byte slice; panics on truncation, which
/// can't happen here since callers check the exact expected length first.
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        slice
    }

    fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take(2).try_into().unwrap())
    }

    fn u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take(4).try_into().unwrap())
    }

    fn u64(&mut self) -> u64 {
        u64::from_be_bytes(self.take(8).try_into().unwrap())
    }

    fn arr32(&mut self) -> [u8; 32] {
        self.take(32).try_into().unwrap()
    }

    fn arr48(&mut self) -> [u8; 48] {
        self.take(48).try_into().unwrap()
    }

    fn arr64(&mut self) -> [u8; 64] {
        self.take(64).try_into().unwrap()
    }
}

/// Why a [`Hello`] was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ChainIdMismatch,
    GenesisHashMismatch,
    UnsupportedProtocolVersion,
    InvalidAuthSignature,
    InvalidEphemeralKeySignature,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChainIdMismatch => write!(f, "chain id mismatch"),
            Self::GenesisHashMismatch => write!(f, "genesis hash mismatch"),
            Self::UnsupportedProtocolVersion => write!(f, "unsupported protocol version"),
            Self::InvalidAuthSignature => write!(f, "invalid auth signature"),
            Self::InvalidEphemeralKeySignature => write!(f, "invalid ephemeral key signature"),
        }
    }
}

/// Errors from driving the handshake, distinct from an on-wire rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    Rejected(RejectReason),
    MalformedPublicKey,
    MalformedSignature,
}

impl std::fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "handshake rejected: {reason}"),
            Self::MalformedPublicKey => write!(f, "malformed public key"),
            Self::MalformedSignature => write!(f, "malformed signature"),
        }
    }
}

impl std::error::Error for HandshakeError {}

impl From<CryptoError> for HandshakeError {
    fn from(_: CryptoError) -> Self {
        Self::MalformedPublicKey
    }
}

/// The remote peer's verified identity once the handshake completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerIdentity {
    pub node_public_key: [u8; 32],
    pub bls_public_key: [u8; 48],
    pub listen_port: u16,
}

/// Role a side played in the handshake; determines which directional key
/// it sends with and which it receives with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeRole {
    Initiator,
    Responder,
}

/// Directional AEAD keys derived once the handshake completes.
pub struct SessionKeys {
    pub send_key: [u8; 32],
    pub recv_key: [u8; 32],
}

fn auth_challenge(nonce: &[u8; 32], chain_id: u64) -> [u8; 32] {
    let mut buf = Vec::with_capacity(HELLO_DOMAIN.len() + 32 + 4);
    buf.extend_from_slice(HELLO_DOMAIN);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(&(chain_id as u32).to_le_bytes());
    blake3_hash(&buf)
}

fn ack_challenge(initiator_nonce: &[u8; 32], chain_id: u64) -> [u8; 32] {
    let mut buf = Vec::with_capacity(ACK_DOMAIN.len() + 32 + 4);
    buf.extend_from_slice(ACK_DOMAIN);
    buf.extend_from_slice(initiator_nonce);
    buf.extend_from_slice(&(chain_id as u32).to_le_bytes());
    blake3_hash(&buf)
}

fn x25519_binding_message(x25519_public_key: &[u8; 32]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(X25519_BINDING_DOMAIN.len() + 32);
    buf.extend_from_slice(X25519_BINDING_DOMAIN);
    buf.extend_from_slice(x25519_public_key);
    blake3_hash(&buf)
}

fn verify_ed25519(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<(), HandshakeError> {
    let pk =
        Ed25519PublicKey::from_bytes(*public_key).map_err(|_| HandshakeError::MalformedPublicKey)?;
    let sig = Ed25519Signature::from_bytes(*signature);
    pk.verify(message, &sig)
        .map_err(|_| HandshakeError::MalformedSignature)
}

/// Build the outbound [`Hello`] message, signing the fresh challenge nonce
/// and binding the ephemeral X25519 key to the node's long-term identity.
pub fn build_hello(
    identity: &HandshakeIdentity,
    context: ChainContext,
    tip: ChainTip,
    listen_port: u16,
    challenge_nonce: [u8; 32],
    x25519_public_key: [u8; 32],
) -> Hello {
    let challenge = auth_challenge(&challenge_nonce, context.chain_id);
    let auth_signature = *identity.signing_key.sign(&challenge).as_bytes();
    let binding = x25519_binding_message(&x25519_public_key);
    let x25519_key_signature = *identity.signing_key.sign(&binding).as_bytes();

    Hello {
        protocol_version: MIN_PROTOCOL_VERSION,
        chain_id: context.chain_id,
        best_block_number: tip.best_block_number,
        best_block_hash: tip.best_block_hash,
        genesis_hash: context.genesis_hash,
        node_public_key: *identity.signing_key.public_key().as_bytes(),
        bls_public_key: identity.bls_public_key,
        listen_port,
        challenge_nonce,
        auth_signature,
        x25519_public_key,
        x25519_key_signature,
    }
}

/// Validate an inbound [`Hello`] against local chain facts. Returns the
/// rejection reason rather than an error so the caller can still send back
/// a well-formed `HelloAck { accepted: false, .. }` per SPEC-02 Section 4.5.
pub fn verify_hello(hello: &Hello, context: ChainContext) -> Result<(), RejectReason> {
    if hello.protocol_version < MIN_PROTOCOL_VERSION {
        return Err(RejectReason::UnsupportedProtocolVersion);
    }
    if hello.chain_id != context.chain_id {
        return Err(RejectReason::ChainIdMismatch);
    }
    if hello.genesis_hash != context.genesis_hash {
        return Err(RejectReason::GenesisHashMismatch);
    }
    let challenge = auth_challenge(&hello.challenge_nonce, hello.chain_id);
    verify_ed25519(&hello.node_public_key, &challenge, &hello.auth_signature)
        .map_err(|_| RejectReason::InvalidAuthSignature)?;
    let binding = x25519_binding_message(&hello.x25519_public_key);
    verify_ed25519(&hello.node_public_key, &binding, &hello.x25519_key_signature)
        .map_err(|_| RejectReason::InvalidEphemeralKeySignature)?;
    Ok(())
}

/// Build an accepting [`HelloAck`] in response to an already-verified [`Hello`].
pub fn build_hello_ack(
    identity: &HandshakeIdentity,
    context: ChainContext,
    tip: ChainTip,
    listen_port: u16,
    hello: &Hello,
    x25519_public_key: [u8; 32],
) -> HelloAck {
    let challenge = ack_challenge(&hello.challenge_nonce, hello.chain_id);
    let challenge_response = *identity.signing_key.sign(&challenge).as_bytes();
    let binding = x25519_binding_message(&x25519_public_key);
    let x25519_key_signature = *identity.signing_key.sign(&binding).as_bytes();

    HelloAck {
        accepted: true,
        reject_reason: None,
        node_public_key: *identity.signing_key.public_key().as_bytes(),
        bls_public_key: identity.bls_public_key,
        listen_port,
        best_block_number: tip.best_block_number,
        best_block_hash: tip.best_block_hash,
        challenge_response,
        genesis_hash: context.genesis_hash,
        x25519_public_key,
        x25519_key_signature,
    }
}

/// Build a rejecting [`HelloAck`]; the caller closes the connection after sending it.
pub fn build_hello_reject(genesis_hash: [u8; 32], reason: RejectReason) -> HelloAck {
    HelloAck {
        accepted: false,
        reject_reason: Some(reason),
        node_public_key: [0u8; 32],
        bls_public_key: [0u8; 48],
        listen_port: 0,
        best_block_number: 0,
        best_block_hash: [0u8; 32],
        challenge_response: [0u8; 64],
        genesis_hash,
        x25519_public_key: [0u8; 32],
        x25519_key_signature: [0u8; 64],
    }
}

/// Validate an inbound [`HelloAck`] against the `Hello` we sent.
pub fn verify_hello_ack(
    ack: &HelloAck,
    sent: &Hello,
    context: ChainContext,
) -> Result<PeerIdentity, HandshakeError> {
    if !ack.accepted {
        let reason = ack.reject_reason.unwrap_or(RejectReason::InvalidAuthSignature);
        return Err(HandshakeError::Rejected(reason));
    }
    if ack.genesis_hash != context.genesis_hash {
        return Err(HandshakeError::Rejected(RejectReason::GenesisHashMismatch));
    }
    let challenge = ack_challenge(&sent.challenge_nonce, sent.chain_id);
    verify_ed25519(&ack.node_public_key, &challenge, &ack.challenge_response)
        .map_err(|_| HandshakeError::Rejected(RejectReason::InvalidAuthSignature))?;
    let binding = x25519_binding_message(&ack.x25519_public_key);
    verify_ed25519(&ack.node_public_key, &binding, &ack.x25519_key_signature)
        .map_err(|_| HandshakeError::Rejected(RejectReason::InvalidEphemeralKeySignature))?;

    Ok(PeerIdentity {
        node_public_key: ack.node_public_key,
        bls_public_key: ack.bls_public_key,
        listen_port: ack.listen_port,
    })
}

/// Derive the directional AEAD send/recv keys for the session, given the
/// local ephemeral keypair, the peer's ephemeral public key, and which
/// role this side played.
pub fn derive_session_keys(
    local_ephemeral: &X25519KeyPair,
    remote_x25519_public_key: &[u8; 32],
    role: HandshakeRole,
) -> SessionKeys {
    let shared = local_ephemeral.diffie_hellman(remote_x25519_public_key);
    let local_pub = local_ephemeral.public_key();

    let mut info = Vec::with_capacity(CHANNEL_INFO_PREFIX.len() + 64);
    info.extend_from_slice(CHANNEL_INFO_PREFIX);
    if local_pub <= *remote_x25519_public_key {
        info.extend_from_slice(&local_pub);
        info.extend_from_slice(remote_x25519_public_key);
    } else {
        info.extend_from_slice(remote_x25519_public_key);
        info.extend_from_slice(&local_pub);
    }
    let channel_key = derive_channel_key(&shared, &info);

    let (send_ctx, recv_ctx): (&[u8], &[u8]) = match role {
        HandshakeRole::Initiator => (b"initiator->responder", b"responder->initiator"),
        HandshakeRole::Responder => (b"responder->initiator", b"initiator->responder"),
    };
    SessionKeys {
        send_key: derive_directional_key(&channel_key, send_ctx),
        recv_key: derive_directional_key(&channel_key, recv_ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> HandshakeIdentity {
        HandshakeIdentity {
            signing_key: Ed25519KeyPair::generate(),
            bls_public_key: [7u8; 48],
        }
    }

    fn context() -> ChainContext {
        ChainContext {
            chain_id: 9000,
            genesis_hash: [1u8; 32],
        }
    }

    #[test]
    fn full_handshake_round_trip_derives_matching_keys() {
        let ctx = context();
        let initiator_identity = identity();
        let responder_identity = identity();
        let initiator_ephemeral = X25519KeyPair::generate();
        let responder_ephemeral = X25519KeyPair::generate();

        let hello = build_hello(
            &initiator_identity,
            ctx,
            ChainTip {
                best_block_number: 10,
                best_block_hash: [2u8; 32],
            },
            30303,
            [3u8; 32],
            initiator_ephemeral.public_key(),
        );

        verify_hello(&hello, ctx).expect("hello should validate");

        let ack = build_hello_ack(
            &responder_identity,
            ctx,
            ChainTip {
                best_block_number: 12,
                best_block_hash: [4u8; 32],
            },
            30304,
            &hello,
            responder_ephemeral.public_key(),
        );

        let peer = verify_hello_ack(&ack, &hello, ctx).expect("ack should validate");
        assert_eq!(peer.node_public_key, ack.node_public_key);

        let initiator_keys = derive_session_keys(
            &initiator_ephemeral,
            &ack.x25519_public_key,
            HandshakeRole::Initiator,
        );
        let responder_keys = derive_session_keys(
            &responder_ephemeral,
            &hello.x25519_public_key,
            HandshakeRole::Responder,
        );

        assert_eq!(initiator_keys.send_key, responder_keys.recv_key);
        assert_eq!(initiator_keys.recv_key, responder_keys.send_key);
    }

    #[test]
    fn hello_with_wrong_chain_id_is_rejected() {
        let ctx = context();
        let other_ctx = ChainContext { chain_id: 1, ..ctx };
        let hello = build_hello(
            &identity(),
            other_ctx,
            ChainTip {
                best_block_number: 0,
                best_block_hash: [0u8; 32],
            },
            30303,
            [9u8; 32],
            [5u8; 32],
        );
        assert_eq!(verify_hello(&hello, ctx), Err(RejectReason::ChainIdMismatch));
    }

    #[test]
    fn tampered_auth_signature_is_rejected() {
        let ctx = context();
        let mut hello = build_hello(
            &identity(),
            ctx,
            ChainTip {
                best_block_number: 0,
                best_block_hash: [0u8; 32],
            },
            30303,
            [9u8; 32],
            [5u8; 32],
        );
        hello.auth_signature[0] ^= 0xFF;
        assert_eq!(
            verify_hello(&hello, ctx),
            Err(RejectReason::InvalidAuthSignature)
        );
    }

    #[test]
    fn ack_rejection_surfaces_reason() {
        let reject = build_hello_reject(context().genesis_hash, RejectReason::ChainIdMismatch);
        let hello = build_hello(
            &identity(),
            context(),
            ChainTip {
                best_block_number: 0,
                best_block_hash: [0u8; 32],
            },
            30303,
            [1u8; 32],
            [2u8; 32],
        );
        let err = verify_hello_ack(&reject, &hello, context()).unwrap_err();
        assert_eq!(err, HandshakeError::Rejected(RejectReason::ChainIdMismatch));
    }

    #[test]
    fn hello_encode_decode_round_trips() {
        let hello = build_hello(
            &identity(),
            context(),
            ChainTip {
                best_block_number: 42,
                best_block_hash: [6u8; 32],
            },
            30303,
            [9u8; 32],
            [5u8; 32],
        );
        let bytes = hello.encode();
        assert_eq!(bytes.len(), HELLO_WIRE_LEN);
        let decoded = Hello::decode(&bytes).unwrap();
        assert_eq!(decoded.node_public_key, hello.node_public_key);
        assert_eq!(decoded.auth_signature, hello.auth_signature);
        assert_eq!(decoded.best_block_number, 42);
    }

    #[test]
    fn hello_ack_encode_decode_round_trips_reject_reason() {
        let ack = build_hello_reject([3u8; 32], RejectReason::InvalidEphemeralKeySignature);
        let bytes = ack.encode();
        assert_eq!(bytes.len(), HELLO_ACK_WIRE_LEN);
        let decoded = HelloAck::decode(&bytes).unwrap();
        assert!(!decoded.accepted);
        assert_eq!(
            decoded.reject_reason,
            Some(RejectReason::InvalidEphemeralKeySignature)
        );
    }
}
