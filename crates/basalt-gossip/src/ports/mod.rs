//! Ports (hexagonal seams) for the gossip engine.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
