//! # Storage Adapters
//!
//! RocksDB-backed persistence for the node's durable data.
//!
//! ## Architecture
//!
//! RocksDB is used for the state trie, block bodies, receipts, chain
//! metadata, trie node snapshots, and the block height index — one column
//! family per dataset for isolation.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{
    BatchOperation, FSError, FileSystemAdapter, KVStoreError, ProductionFileSystemAdapter,
    RocksDbConfig, RocksDbSnapshotStorage, RocksDbStore, RocksDbTrieDatabase, CF_BLOCKS,
    CF_BLOCK_INDEX, CF_METADATA, CF_RECEIPTS, CF_STATE, CF_TRIE_NODES, COLUMN_FAMILIES,
};
