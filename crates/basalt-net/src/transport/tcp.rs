//! # TCP `AesGcmDuplex` Transport
//!
//! Encrypted peer-to-peer transport over plain TCP: length-prefixed framing,
//! an optional AES-256-GCM channel cipher installed once the Hello/HelloAck
//! handshake completes, and a connection registry enforcing the accept
//! limits and connection-id reassignment SPEC-02 Section 4.4 describes.
//!
//! Replaces the QUIC transport: P2P connections here don't need QUIC's
//! multi-streaming or 0-RTT, and a hand-rolled AEAD channel over TCP keeps
//! the dependency surface to `basalt-crypto` instead of `quinn`/`rustls`.

use std::collections::HashMap;
use std::net::IpAddr as StdIpAddr;
use std::sync::Arc;
use std::time::Duration;

use basalt_crypto::{blake3_hash, GcmCounterCipher};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;

use crate::domain::NodeId;

/// Maximum payload size of a single frame (16 MiB).
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
/// Idle read timeout for a single frame.
pub const FRAME_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
/// Maximum number of simultaneously accepted inbound + outbound connections.
pub const MAX_TOTAL_CONNECTIONS: usize = 200;
/// Maximum number of connections accepted from a single remote IP.
pub const MAX_CONNECTIONS_PER_IP: usize = 3;

/// Errors from the TCP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Zero-length frame (rejected outright; not a valid message).
    EmptyFrame,
    /// Frame exceeds [`MAX_FRAME_BYTES`].
    FrameTooLarge(usize),
    /// No data arrived within [`FRAME_IDLE_TIMEOUT`].
    IdleTimeout,
    /// The socket errored or closed.
    Io(String),
    /// AEAD seal/open failed (includes replay detection).
    Crypto(String),
    /// Global or per-IP accept limit reached.
    TooManyConnections,
    /// The connection is not registered under the id being operated on.
    UnknownConnection,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFrame => write!(f, "zero-length frame rejected"),
            Self::FrameTooLarge(n) => write!(f, "frame of {n} bytes exceeds the {MAX_FRAME_BYTES} byte limit"),
            Self::IdleTimeout => write!(f, "frame read timed out after {FRAME_IDLE_TIMEOUT:?}"),
            Self::Io(reason) => write!(f, "transport io error: {reason}"),
            Self::Crypto(reason) => write!(f, "transport crypto error: {reason}"),
            Self::TooManyConnections => write!(f, "connection accept limit reached"),
            Self::UnknownConnection => write!(f, "no connection registered under this id"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<basalt_crypto::CryptoError> for TransportError {
    fn from(e: basalt_crypto::CryptoError) -> Self {
        Self::Crypto(e.to_string())
    }
}

/// Write one `[4-byte BE length][payload]` frame in a single buffered syscall.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), TransportError> {
    if payload.is_empty() {
        return Err(TransportError::EmptyFrame);
    }
    if payload.len() > MAX_FRAME_BYTES {
        return Err(TransportError::FrameTooLarge(payload.len()));
    }
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    writer
        .write_all(&buf)
        .await
        .map_err(|e| TransportError::Io(e.to_string()))
}

/// Read one frame, enforcing the idle timeout and size limit on both the
/// length prefix and the payload reads. Uses an exact-read loop
/// (`read_exact`) so a frame can arrive across multiple TCP segments.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0u8; 4];
    tokio::time::timeout(FRAME_IDLE_TIMEOUT, reader.read_exact(&mut len_buf))
        .await
        .map_err(|_| TransportError::IdleTimeout)?
        .map_err(|e| TransportError::Io(e.to_string()))?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Err(TransportError::EmptyFrame);
    }
    if len > MAX_FRAME_BYTES {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    tokio::time::timeout(FRAME_IDLE_TIMEOUT, reader.read_exact(&mut payload))
        .await
        .map_err(|_| TransportError::IdleTimeout)?
        .map_err(|e| TransportError::Io(e.to_string()))?;
    Ok(payload)
}

/// The write half of an encrypted connection: thread-safe send with an
/// optional AES-256-GCM channel cipher installed after the handshake.
pub struct AesGcmDuplex {
    writer: AsyncMutex<OwnedWriteHalf>,
    send_cipher: AsyncMutex<Option<GcmCounterCipher>>,
}

impl AesGcmDuplex {
    /// Wrap a write half with no cipher installed (plaintext handshake messages).
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer: AsyncMutex::new(writer),
            send_cipher: AsyncMutex::new(None),
        }
    }

    /// Install the send-direction AEAD key once the handshake resolves it.
    /// The caller's copy of `key` should be dropped immediately after.
    pub async fn install_send_key(&self, key: [u8; 32]) {
        *self.send_cipher.lock().await = Some(GcmCounterCipher::new(key));
    }

    /// Seal (if a cipher is installed) and send a message as one frame.
    pub async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let mut cipher_guard = self.send_cipher.lock().await;
        let wire = match cipher_guard.as_mut() {
            Some(cipher) => cipher.seal(payload)?,
            None => payload.to_vec(),
        };
        drop(cipher_guard);
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, &wire).await
    }
}

/// The read half of an encrypted connection.
pub struct FrameReader {
    reader: OwnedReadHalf,
    recv_cipher: Option<GcmCounterCipher>,
}

impl FrameReader {
    pub fn new(reader: OwnedReadHalf) -> Self {
        Self {
            reader,
            recv_cipher: None,
        }
    }

    /// Install the recv-direction AEAD key once the handshake resolves it.
    pub fn install_recv_key(&mut self, key: [u8; 32]) {
        self.recv_cipher = Some(GcmCounterCipher::new(key));
    }

    /// Read and, if a cipher is installed, open the next frame.
    pub async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let wire = read_frame(&mut self.reader).await?;
        match self.recv_cipher.as_mut() {
            Some(cipher) => Ok(cipher.open(&wire)?),
            None => Ok(wire),
        }
    }
}

/// Split a freshly accepted or connected [`TcpStream`] into its duplex halves.
pub fn split(stream: TcpStream) -> (Arc<AesGcmDuplex>, FrameReader) {
    let (read_half, write_half) = stream.into_split();
    (
        Arc::new(AesGcmDuplex::new(write_half)),
        FrameReader::new(read_half),
    )
}

/// Derive the temporary peer id assigned to an outbound connection before
/// the handshake resolves the real peer id: `BLAKE3(endpoint_string)`.
pub fn temporary_connection_id(endpoint: &str) -> NodeId {
    NodeId::new(blake3_hash(endpoint.as_bytes()))
}

/// Tracks live connections by peer id, enforcing the global/per-IP accept
/// limits and the connection-id reassignment dance around the handshake.
pub struct ConnectionRegistry {
    connections: std::sync::RwLock<HashMap<NodeId, Arc<AesGcmDuplex>>>,
    per_ip_counts: std::sync::RwLock<HashMap<StdIpAddr, usize>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: std::sync::RwLock::new(HashMap::new()),
            per_ip_counts: std::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Reserve an accept slot for `remote_ip`, enforcing both the total and
    /// per-IP limits. Call [`Self::release_ip_slot`] when the connection closes.
    pub fn try_reserve(&self, remote_ip: StdIpAddr) -> Result<(), TransportError> {
        if self.connections.read().unwrap().len() >= MAX_TOTAL_CONNECTIONS {
            return Err(TransportError::TooManyConnections);
        }
        let mut counts = self.per_ip_counts.write().unwrap();
        let count = counts.entry(remote_ip).or_insert(0);
        if *count >= MAX_CONNECTIONS_PER_IP {
            return Err(TransportError::TooManyConnections);
        }
        *count += 1;
        Ok(())
    }

    pub fn release_ip_slot(&self, remote_ip: StdIpAddr) {
        let mut counts = self.per_ip_counts.write().unwrap();
        if let Some(count) = counts.get_mut(&remote_ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&remote_ip);
            }
        }
    }

    /// Register a connection under its temporary (pre-handshake) id.
    pub fn insert_temporary(&self, temp_id: NodeId, conn: Arc<AesGcmDuplex>) {
        self.connections.write().unwrap().insert(temp_id, conn);
    }

    /// Reassign a connection from its temporary id to the real post-handshake
    /// peer id. If a connection already holds the real id (simultaneous
    /// inbound+outbound to the same peer), the one being reassigned loses
    /// and is silently dropped instead of replacing the survivor.
    pub fn reassign(&self, temp_id: NodeId, real_id: NodeId) -> bool {
        let mut connections = self.connections.write().unwrap();
        let Some(conn) = connections.remove(&temp_id) else {
            return false;
        };
        if connections.contains_key(&real_id) {
            false
        } else {
            connections.insert(real_id, conn);
            true
        }
    }

    pub fn remove(&self, id: &NodeId) -> Option<Arc<AesGcmDuplex>> {
        self.connections.write().unwrap().remove(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<Arc<AesGcmDuplex>> {
        self.connections.read().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.connections.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().unwrap().is_empty()
    }

    /// Send to one named peer.
    pub async fn send_to(&self, id: &NodeId, payload: &[u8]) -> Result<(), TransportError> {
        let conn = self.get(id).ok_or(TransportError::UnknownConnection)?;
        conn.send(payload).await
    }

    /// Broadcast over a snapshot of the connection map; a send failure drops
    /// that peer's connection without aborting the rest of the broadcast.
    pub async fn broadcast(&self, payload: &[u8]) {
        let snapshot: Vec<(NodeId, Arc<AesGcmDuplex>)> = self
            .connections
            .read()
            .unwrap()
            .iter()
            .map(|(id, conn)| (*id, conn.clone()))
            .collect();
        for (id, conn) in snapshot {
            if conn.send(payload).await.is_err() {
                self.connections.write().unwrap().remove(&id);
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Bind a TCP listener for inbound P2P connections.
pub async fn bind(addr: std::net::SocketAddr) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_round_trips_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (duplex, _reader) = split(stream);
            duplex.send(b"hello peer").await.unwrap();
        });

        let (server_stream, _) = listener.accept().await.unwrap();
        let (_duplex, mut reader) = split(server_stream);
        let received = reader.recv().await.unwrap();
        assert_eq!(received, b"hello peer");

        client.await.unwrap();
    }

    #[tokio::test]
    async fn encrypted_channel_round_trips_after_key_install() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let key = [11u8; 32];

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (duplex, _reader) = split(stream);
            duplex.install_send_key(key).await;
            duplex.send(b"secret payload").await.unwrap();
        });

        let (server_stream, _) = listener.accept().await.unwrap();
        let (_duplex, mut reader) = split(server_stream);
        reader.install_recv_key(key);
        let received = reader.recv().await.unwrap();
        assert_eq!(received, b"secret payload");

        client.await.unwrap();
    }

    #[tokio::test]
    async fn zero_length_frame_is_rejected() {
        let mut buf: Vec<u8> = Vec::new();
        write_frame(&mut buf, b"x").await.unwrap();
        let err = write_frame(&mut buf, b"").await.unwrap_err();
        assert_eq!(err, TransportError::EmptyFrame);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let mut buf: Vec<u8> = Vec::new();
        let oversized = vec![0u8; MAX_FRAME_BYTES + 1];
        let err = write_frame(&mut buf, &oversized).await.unwrap_err();
        assert_eq!(err, TransportError::FrameTooLarge(MAX_FRAME_BYTES + 1));
    }

    #[test]
    fn per_ip_accept_limit_is_enforced() {
        let registry = ConnectionRegistry::new();
        let ip: StdIpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..MAX_CONNECTIONS_PER_IP {
            registry.try_reserve(ip).unwrap();
        }
        assert_eq!(
            registry.try_reserve(ip).unwrap_err(),
            TransportError::TooManyConnections
        );
        registry.release_ip_slot(ip);
        registry.try_reserve(ip).unwrap();
    }

    #[tokio::test]
    async fn reassign_drops_the_loser_on_simultaneous_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let registry = ConnectionRegistry::new();

        let _a = TcpStream::connect(addr).await.unwrap();
        let (a_accepted, _) = listener.accept().await.unwrap();
        let _b = TcpStream::connect(addr).await.unwrap();
        let (b_accepted, _) = listener.accept().await.unwrap();

        let (conn_a, _) = split(a_accepted);
        let (conn_b, _) = split(b_accepted);

        let temp_a = temporary_connection_id("peer:a");
        let temp_b = temporary_connection_id("peer:b");
        let real = temporary_connection_id("resolved-peer-id");

        registry.insert_temporary(temp_a, conn_a);
        registry.insert_temporary(temp_b, conn_b);

        assert!(registry.reassign(temp_a, real));
        assert!(!registry.reassign(temp_b, real));
        assert_eq!(registry.len(), 1);
    }
}
