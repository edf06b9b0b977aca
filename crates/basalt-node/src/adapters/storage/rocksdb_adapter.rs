//! # RocksDB Storage Adapter
//!
//! RocksDB-backed key-value store for the node's durable data: the state
//! trie, block bodies, receipts, chain metadata, and the block height index.
//!
//! ## Features
//!
//! - Atomic batch writes (`WriteBatch`)
//! - Column families for subsystem isolation
//! - Snappy compression
//! - Bloom filters for read optimization
//!
//! ## Column Families
//!
//! - `state` - state trie nodes
//! - `blocks` - block bodies
//! - `receipts` - transaction receipts
//! - `metadata` - chain metadata (genesis hash, tips, finalized height)
//! - `trie_nodes` - trie node snapshots for fast sync
//! - `block_index` - height-to-hash index
//!
//! ## Configuration
//!
//! Optimized for blockchain workloads:
//! - Large block cache (256MB default)
//! - Bloom filters (10 bits per key)
//! - fsync on write for durability

use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Column family names used by the node.
pub const CF_STATE: &str = "state";
pub const CF_BLOCKS: &str = "blocks";
pub const CF_RECEIPTS: &str = "receipts";
pub const CF_METADATA: &str = "metadata";
pub const CF_TRIE_NODES: &str = "trie_nodes";
pub const CF_BLOCK_INDEX: &str = "block_index";

/// All column families used by the node.
pub const COLUMN_FAMILIES: &[&str] = &[
    CF_STATE,
    CF_BLOCKS,
    CF_RECEIPTS,
    CF_METADATA,
    CF_TRIE_NODES,
    CF_BLOCK_INDEX,
];

/// Errors raised by the key-value store.
#[derive(Debug, Error)]
pub enum KVStoreError {
    #[error("I/O error: {message}")]
    IOError { message: String },
    #[error("unknown column family: {0}")]
    UnknownColumnFamily(String),
}

/// Errors raised by filesystem introspection.
#[derive(Debug, Error)]
pub enum FSError {
    #[error("I/O error: {message}")]
    IOError { message: String },
}

/// One write in an atomic batch.
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Reports available disk space for storage backpressure decisions.
pub trait FileSystemAdapter: Send + Sync {
    fn available_disk_space_percent(&self) -> Result<u8, FSError>;
    fn available_disk_space_bytes(&self) -> Result<u64, FSError>;
    fn total_disk_space_bytes(&self) -> Result<u64, FSError>;
}

/// RocksDB configuration for production use.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub path: String,
    pub block_cache_size: usize,
    pub write_buffer_size: usize,
    pub max_write_buffer_number: i32,
    pub target_file_size_base: u64,
    pub sync_writes: bool,
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/rocksdb".to_string(),
            block_cache_size: 256 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            max_write_buffer_number: 3,
            target_file_size_base: 64 * 1024 * 1024,
            sync_writes: true,
            enable_statistics: false,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync).
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            max_write_buffer_number: 2,
            target_file_size_base: 4 * 1024 * 1024,
            sync_writes: false,
            enable_statistics: false,
        }
    }
}

/// RocksDB-backed key-value store, one column family per logical dataset.
pub struct RocksDbStore {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create a RocksDB database with all column families present.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_target_file_size_base(config.target_file_size_base);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors).map_err(|e| {
            KVStoreError::IOError {
                message: format!("failed to open RocksDB: {e}"),
            }
        })?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config,
        })
    }

    /// Open with the default path (for simple use cases).
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, KVStoreError> {
        let config = RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::open(config)
    }

    pub fn inner(&self) -> &Arc<RwLock<DB>> {
        &self.db
    }

    fn cf<'a>(db: &'a DB, cf: &str) -> Result<&'a rocksdb::ColumnFamily, KVStoreError> {
        db.cf_handle(cf)
            .ok_or_else(|| KVStoreError::UnknownColumnFamily(cf.to_string()))
    }

    pub fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        let db = self.db.read();
        let handle = Self::cf(&db, cf)?;
        db.get_cf(handle, key).map_err(|e| KVStoreError::IOError {
            message: format!("RocksDB get failed: {e}"),
        })
    }

    pub fn put_cf(&self, cf: &str, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let db = self.db.write();
        let handle = Self::cf(&db, cf)?;
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        db.put_cf_opt(handle, key, value, &write_opts)
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB put failed: {e}"),
            })
    }

    pub fn delete_cf(&self, cf: &str, key: &[u8]) -> Result<(), KVStoreError> {
        let db = self.db.write();
        let handle = Self::cf(&db, cf)?;
        db.delete_cf(handle, key).map_err(|e| KVStoreError::IOError {
            message: format!("RocksDB delete failed: {e}"),
        })
    }

    pub fn exists_cf(&self, cf: &str, key: &[u8]) -> Result<bool, KVStoreError> {
        let db = self.db.read();
        let handle = Self::cf(&db, cf)?;
        db.get_pinned_cf(handle, key)
            .map(|v| v.is_some())
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB exists check failed: {e}"),
            })
    }

    pub fn prefix_scan_cf(
        &self,
        cf: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        let db = self.db.read();
        let handle = Self::cf(&db, cf)?;
        let mut results = Vec::new();
        let iter = db.iterator_cf(handle, IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            match item {
                Ok((key, value)) => {
                    if !key.starts_with(prefix) {
                        break;
                    }
                    results.push((key.to_vec(), value.to_vec()));
                }
                Err(e) => {
                    return Err(KVStoreError::IOError {
                        message: format!("RocksDB scan failed: {e}"),
                    });
                }
            }
        }
        Ok(results)
    }

    /// Get, put, and delete against `CF_METADATA` — used by callers that
    /// don't care which column family they're in (tests, simple lookups).
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.get_cf(CF_METADATA, key)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.put_cf(CF_METADATA, key, value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.delete_cf(CF_METADATA, key)
    }

    pub fn atomic_batch_write(
        &self,
        cf: &str,
        operations: Vec<BatchOperation>,
    ) -> Result<(), KVStoreError> {
        let db = self.db.write();
        let handle = Self::cf(&db, cf)?;
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put_cf(handle, &key, &value),
                BatchOperation::Delete { key } => batch.delete_cf(handle, &key),
            }
        }
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        db.write_opt(batch, &write_opts)
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB batch write failed: {e}"),
            })
    }
}

/// Production filesystem adapter using `fs2` for free-space queries.
pub struct ProductionFileSystemAdapter {
    data_dir: String,
}

impl ProductionFileSystemAdapter {
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl FileSystemAdapter for ProductionFileSystemAdapter {
    fn available_disk_space_percent(&self) -> Result<u8, FSError> {
        let path = Path::new(&self.data_dir);
        let available = fs2::available_space(path).map_err(|e| FSError::IOError {
            message: e.to_string(),
        })?;
        let total = fs2::total_space(path).map_err(|e| FSError::IOError {
            message: e.to_string(),
        })?;
        if total == 0 {
            return Err(FSError::IOError {
                message: "unable to determine disk space".to_string(),
            });
        }
        Ok(((available as f64 / total as f64) * 100.0) as u8)
    }

    fn available_disk_space_bytes(&self) -> Result<u64, FSError> {
        let path = Path::new(&self.data_dir);
        fs2::available_space(path).map_err(|e| FSError::IOError {
            message: e.to_string(),
        })
    }

    fn total_disk_space_bytes(&self) -> Result<u64, FSError> {
        let path = Path::new(&self.data_dir);
        fs2::total_space(path).map_err(|e| FSError::IOError {
            message: e.to_string(),
        })
    }
}

// =============================================================================
// State Trie RocksDB Database
// =============================================================================

use basalt_state::ports::database::{SnapshotStorage, TrieDatabase};
use basalt_state::StateError;
use basalt_types::Hash;

/// RocksDB-backed state trie database, persisting nodes under `CF_TRIE_NODES`.
pub struct RocksDbTrieDatabase {
    store: Arc<RocksDbStore>,
}

impl RocksDbTrieDatabase {
    pub fn new(store: Arc<RocksDbStore>) -> Self {
        Self { store }
    }

    pub fn open(config: RocksDbConfig) -> Result<Self, StateError> {
        let store =
            RocksDbStore::open(config).map_err(|e| StateError::DatabaseError(e.to_string()))?;
        Ok(Self {
            store: Arc::new(store),
        })
    }
}

impl TrieDatabase for RocksDbTrieDatabase {
    fn get_node(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StateError> {
        self.store
            .get_cf(CF_TRIE_NODES, hash)
            .map_err(|e| StateError::DatabaseError(e.to_string()))
    }

    fn put_node(&self, hash: Hash, data: Vec<u8>) -> Result<(), StateError> {
        self.store
            .put_cf(CF_TRIE_NODES, &hash, &data)
            .map_err(|e| StateError::DatabaseError(e.to_string()))
    }

    fn batch_put(&self, nodes: Vec<(Hash, Vec<u8>)>) -> Result<(), StateError> {
        let ops = nodes
            .into_iter()
            .map(|(hash, data)| BatchOperation::put(hash.to_vec(), data))
            .collect();
        self.store
            .atomic_batch_write(CF_TRIE_NODES, ops)
            .map_err(|e| StateError::DatabaseError(e.to_string()))
    }

    fn delete_node(&self, hash: &Hash) -> Result<(), StateError> {
        self.store
            .delete_cf(CF_TRIE_NODES, hash)
            .map_err(|e| StateError::DatabaseError(e.to_string()))
    }
}

/// RocksDB-backed snapshot storage for state checkpoints, under `CF_METADATA`.
pub struct RocksDbSnapshotStorage {
    store: Arc<RocksDbStore>,
}

impl RocksDbSnapshotStorage {
    pub fn new(store: Arc<RocksDbStore>) -> Self {
        Self { store }
    }

    fn make_snapshot_key(height: u64) -> Vec<u8> {
        let mut key = Vec::with_capacity(13);
        key.extend_from_slice(b"snap:");
        key.extend_from_slice(&height.to_be_bytes());
        key
    }
}

impl SnapshotStorage for RocksDbSnapshotStorage {
    fn create_snapshot(&self, height: u64, root: Hash) -> Result<(), StateError> {
        let key = Self::make_snapshot_key(height);
        self.store
            .put_cf(CF_METADATA, &key, &root)
            .map_err(|e| StateError::DatabaseError(e.to_string()))
    }

    fn get_nearest_snapshot(&self, height: u64) -> Result<Option<(u64, Hash)>, StateError> {
        for h in (0..=height).rev() {
            let key = Self::make_snapshot_key(h);
            if let Some(value) = self
                .store
                .get_cf(CF_METADATA, &key)
                .map_err(|e| StateError::DatabaseError(e.to_string()))?
            {
                if value.len() == 32 {
                    let mut root = [0u8; 32];
                    root.copy_from_slice(&value);
                    return Ok(Some((h, root)));
                }
            }
        }
        Ok(None)
    }

    fn prune_snapshots(&self, keep_after: u64) -> Result<u64, StateError> {
        let mut pruned = 0u64;
        for h in 0..keep_after {
            let key = Self::make_snapshot_key(h);
            if self.store.get_cf(CF_METADATA, &key).ok().flatten().is_some() {
                self.store
                    .delete_cf(CF_METADATA, &key)
                    .map_err(|e| StateError::DatabaseError(e.to_string()))?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config = RocksDbConfig::for_testing(temp_dir.path().to_string_lossy().to_string());
        let store = RocksDbStore::open(config).unwrap();

        store.put_cf(CF_BLOCKS, b"key1", b"value1").unwrap();
        assert_eq!(
            store.get_cf(CF_BLOCKS, b"key1").unwrap(),
            Some(b"value1".to_vec())
        );
        assert!(store.exists_cf(CF_BLOCKS, b"key1").unwrap());
        store.delete_cf(CF_BLOCKS, b"key1").unwrap();
        assert!(!store.exists_cf(CF_BLOCKS, b"key1").unwrap());
    }

    #[test]
    fn batch_write_is_atomic_per_column_family() {
        let temp_dir = TempDir::new().unwrap();
        let config = RocksDbConfig::for_testing(temp_dir.path().to_string_lossy().to_string());
        let store = RocksDbStore::open(config).unwrap();

        let ops = vec![
            BatchOperation::put(b"batch1".to_vec(), b"value1".to_vec()),
            BatchOperation::put(b"batch2".to_vec(), b"value2".to_vec()),
        ];
        store.atomic_batch_write(CF_RECEIPTS, ops).unwrap();

        assert!(store.exists_cf(CF_RECEIPTS, b"batch1").unwrap());
        assert!(store.exists_cf(CF_RECEIPTS, b"batch2").unwrap());
    }

    #[test]
    fn prefix_scan_respects_column_family() {
        let temp_dir = TempDir::new().unwrap();
        let config = RocksDbConfig::for_testing(temp_dir.path().to_string_lossy().to_string());
        let store = RocksDbStore::open(config).unwrap();

        store.put_cf(CF_BLOCK_INDEX, b"h:0001", b"data1").unwrap();
        store.put_cf(CF_BLOCK_INDEX, b"h:0002", b"data2").unwrap();
        store.put_cf(CF_RECEIPTS, b"h:0001", b"unrelated").unwrap();

        let results = store.prefix_scan_cf(CF_BLOCK_INDEX, b"h:").unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn trie_database_round_trips_nodes() {
        let temp_dir = TempDir::new().unwrap();
        let config = RocksDbConfig::for_testing(temp_dir.path().to_string_lossy().to_string());
        let trie_db = RocksDbTrieDatabase::open(config).unwrap();

        let hash = [7u8; 32];
        trie_db.put_node(hash, vec![1, 2, 3]).unwrap();
        assert_eq!(trie_db.get_node(&hash).unwrap(), Some(vec![1, 2, 3]));
        trie_db.delete_node(&hash).unwrap();
        assert_eq!(trie_db.get_node(&hash).unwrap(), None);
    }

    #[test]
    fn snapshot_storage_finds_nearest() {
        let temp_dir = TempDir::new().unwrap();
        let config = RocksDbConfig::for_testing(temp_dir.path().to_string_lossy().to_string());
        let store = Arc::new(RocksDbStore::open(config).unwrap());
        let snapshots = RocksDbSnapshotStorage::new(store);

        snapshots.create_snapshot(10, [1u8; 32]).unwrap();
        snapshots.create_snapshot(20, [2u8; 32]).unwrap();

        assert_eq!(
            snapshots.get_nearest_snapshot(15).unwrap(),
            Some((10, [1u8; 32]))
        );
        assert_eq!(snapshots.get_nearest_snapshot(5).unwrap(), None);
    }
}
