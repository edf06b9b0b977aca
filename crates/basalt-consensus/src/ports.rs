//! # External Collaborator Ports
//!
//! BFT vote counting, leader selection, slashing, mempool storage, block
//! storage, and chain application are all out of scope for this repository.
//! The dispatcher only needs to know the *shape* of those collaborators, so
//! each is expressed as a trait boundary the dispatcher calls through. Real
//! nodes wire a concrete engine/store behind each port; this crate ships an
//! in-memory stub adapter per port so the dispatcher is independently
//! testable.

use basalt_types::Hash;

/// Sink for consensus-protocol messages. BFT vote counting, leader
/// selection, and slashing all happen on the far side of this boundary.
pub trait ConsensusSink: Send + Sync {
    /// A block proposal for the given view, from `proposer`, hashing to `block_hash`.
    fn submit_proposal(&self, view: u64, proposer: [u8; 32], block_hash: Hash, body: Vec<u8>);

    /// A vote for `block_hash` at `view`, from `voter`.
    fn submit_vote(&self, view: u64, voter: [u8; 32], block_hash: Hash, body: Vec<u8>);

    /// A view-change request, from `validator`.
    fn submit_view_change(&self, new_view: u64, validator: [u8; 32], body: Vec<u8>);

    /// An aggregated vote (threshold signature) for `block_hash` at `view`.
    fn submit_aggregate_vote(&self, view: u64, block_hash: Hash, body: Vec<u8>);
}

/// Source of pending transactions. Mempool contents are out of scope; this
/// only describes the shape the dispatcher needs to serve `TxRequest` and
/// admit `TxPayload`.
pub trait MempoolSource: Send + Sync {
    /// Whether a transaction with this hash is already known to the mempool.
    fn has_tx(&self, tx_hash: Hash) -> bool;

    /// Fetch the raw bytes of known transactions, skipping unknown hashes.
    fn get_txs(&self, tx_hashes: &[Hash]) -> Vec<(Hash, Vec<u8>)>;

    /// Admit a transaction into the mempool. Returns `true` if it was newly
    /// admitted (not already present).
    fn admit(&self, tx_hash: Hash, body: Vec<u8>) -> bool;
}

/// Source of stored blocks. Block storage itself is out of scope; this only
/// describes what `BlockRequest`/`SyncRequest` need to serve.
pub trait BlockStore: Send + Sync {
    /// Whether the block with this hash is present.
    fn has_block(&self, block_hash: Hash) -> bool;

    /// Fetch raw block bytes for a contiguous height range `[from, from + count)`.
    /// Returns fewer entries than requested if the chain is shorter.
    fn get_range(&self, from: u64, count: usize) -> Vec<Vec<u8>>;
}

/// Sink that applies blocks to chain state. Block execution/validation is
/// out of scope; the dispatcher only needs somewhere to hand decoded
/// payloads.
pub trait ChainSource: Send + Sync {
    /// Apply a single block payload. Returns `true` if applying it revealed
    /// a gap (an ancestor is missing), signalling the dispatcher to trigger
    /// state re-sync.
    fn apply_block(&self, body: Vec<u8>) -> bool;

    /// Apply a batch of blocks received as a sync response, in order.
    fn apply_sync_batch(&self, bodies: Vec<Vec<u8>>);
}

/// Delegate for the gossip-tier control messages (§4.7). The two-tier
/// gossip engine itself lives in a separate crate; this port is the seam
/// the dispatcher calls through so it doesn't need a hard dependency on
/// that engine's internals.
pub trait GossipSink: Send + Sync {
    fn handle_ihave(&self, from: [u8; 32], msg_ids: Vec<Hash>);
    fn handle_iwant(&self, from: [u8; 32], msg_ids: Vec<Hash>);
    fn handle_graft(&self, from: [u8; 32]);
    fn handle_prune(&self, from: [u8; 32]);
}

/// Delegate for Kademlia-style peer lookups (FindNode / FindNodeResponse).
pub trait PeerRouting: Send + Sync {
    /// The 20 peer ids closest to `target` by XOR distance.
    fn closest_peers(&self, target: [u8; 32]) -> Vec<[u8; 32]>;
}
