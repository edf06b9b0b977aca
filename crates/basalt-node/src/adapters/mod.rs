//! # Adapter Implementations
//!
//! Concrete outbound adapters the composition root wires into the
//! substrate crates (`basalt-net`, `basalt-state`, `basalt-consensus`,
//! `basalt-gossip`).
//!
//! ## Hexagonal Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     OUTER LAYER (Adapters)                          │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │  RocksDbStore, RocksDbTrieDatabase, RocksDbSnapshotStorage     │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                              ↑ implements ↑                         │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    MIDDLE LAYER (Ports)                        │  │
//! │  │  TrieDatabase, SnapshotStorage, ConsensusSink, GossipSink      │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                              ↑ uses ↑                               │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    INNER LAYER (Domain)                        │  │
//! │  │  Pure business logic - no I/O, no async, no external deps     │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod gossip_transport;
pub mod p2p_listener;
pub mod storage;

pub use gossip_transport::{
    DispatcherMessageSink, NetGossipTransport, NetPeerRouting, NodeGossipEngine,
};
pub use p2p_listener::{node_id_for_public_key, spawn as spawn_p2p, P2pContext};
pub use storage::*;
