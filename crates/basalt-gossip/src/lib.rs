//! # Two-Tier Gossip Engine
//!
//! Epidemic broadcast over a peer mesh split into an eager tier (full push)
//! and a lazy tier (`IHAVE` announcements only), in the style of plumtree.
//! New peers start eager until the eager target is reached, then lazy;
//! `Rebalance` grafts/prunes peers between tiers by reputation.
//!
//! ## Architecture
//!
//! Hexagonal: [`domain`] holds the pure tier-assignment, dedup, and
//! rate-limiting logic; [`ports`] defines the seams a transport and a
//! message-received sink plug into; [`service::GossipEngine`] wires them
//! together and also implements `basalt_consensus::GossipSink`, so the
//! consensus dispatcher's `IHAVE`/`IWANT`/`GRAFT`/`PRUNE` routing lands
//! directly on this engine.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use basalt_gossip::{GossipApi, GossipConfig, GossipEngine};
//!
//! let engine = GossipEngine::new(GossipConfig::default(), transport, sink);
//! engine.connect_peer(peer_id);
//! engine.broadcast_priority(msg_id, msg_bytes);
//! ```

pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use domain::{GossipConfig, MessageId, PeerGossipState, PeerId, PeerTier, SeenCache};
pub use events::GossipError;
pub use ports::inbound::{GossipApi, MessageReceivedSink};
pub use ports::outbound::{GossipFrame, PeerTransport};
pub use service::GossipEngine;
