//! # Genesis Module
//!
//! Genesis block creation and chain initialization.
//!
//! The genesis block is the foundation of the chain with special properties:
//!
//! - Height: 0
//! - Parent hash: 32 zero bytes
//! - Merkle root: Empty tree root
//! - State root: Empty trie root
//! - Timestamp: Chain genesis timestamp
//!
//! ## Initialization Sequence
//!
//! 1. Create genesis block with deterministic content
//! 2. Store genesis under the `block_index`/`blocks` column families
//! 3. Initialize the state database with the genesis state root
//! 4. Set finalized height to 0

pub mod builder;

pub use builder::{
    empty_merkle_root, GenesisBlock, GenesisConfig, GenesisError, GenesisBuilder, ValidatorInfo,
};
