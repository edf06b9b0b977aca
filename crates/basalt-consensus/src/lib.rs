//! # basalt-consensus
//!
//! Consensus message dispatch: a thin router between decoded wire frames
//! and the collaborators that interpret them (a BFT consensus engine,
//! mempool, block store, chain, gossip engine, and peer routing table).
//!
//! BFT vote counting, leader selection, and slashing are explicitly out of
//! scope here — they live behind the [`ports::ConsensusSink`] boundary,
//! which a real consensus engine implements. This crate only decides, for
//! each recognized message tag, who gets called and with what.

pub mod adapters;
pub mod dispatch;
pub mod double_sign;
pub mod error;
pub mod messages;
pub mod ports;

pub use dispatch::{DispatchOutcome, Dispatcher, KADEMLIA_K, MAX_SYNC_BATCH};
pub use double_sign::{DoubleSignDetector, DoubleSignEvidence};
pub use error::DispatchError;
pub use ports::{BlockStore, ChainSource, ConsensusSink, GossipSink, MempoolSource, PeerRouting};
