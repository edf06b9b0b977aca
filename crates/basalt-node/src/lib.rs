//! # Basalt Node
//!
//! This library exposes the internal modules of the node runtime for
//! testing. The main entry point is the `main.rs` binary.

pub mod adapters;
pub mod container;
pub mod genesis;
