//! # Domain Layer for the Gossip Engine
//!
//! Pure business logic with no I/O dependencies. This is the innermost layer
//! of the hexagonal architecture.
//!
//! ## Contents
//!
//! - **entities**: `PeerId`, `MessageId`, `PeerTier`
//! - **value_objects**: `GossipConfig`, `SeenCache`, `PeerGossipState`
//! - **services**: tier assignment and graft/prune candidate selection
//! - **invariants**: dedup, IHAVE-prior-to-IWANT, and rate-limit checks
//!
//! ## Design Principles
//!
//! 1. **No I/O**: All functions are pure and synchronous
//! 2. **No External Dependencies**: Only depends on `basalt-types`
//! 3. **Testable**: All logic can be unit tested without mocks

mod entities;
mod invariants;
mod services;
mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use services::*;
pub use value_objects::*;
