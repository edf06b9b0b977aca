//! In-memory stub adapters for the external-collaborator ports.
//!
//! These let the dispatcher run and be tested standalone. A real node wires
//! a real consensus engine, mempool, block store, and gossip engine behind
//! these same port traits.

use crate::ports::{BlockStore, ChainSource, ConsensusSink, GossipSink, MempoolSource, PeerRouting};
use basalt_types::Hash;
use std::collections::HashMap;
use std::sync::Mutex;

/// Records submitted consensus messages without interpreting them.
#[derive(Default)]
pub struct InMemoryConsensusSink {
    pub proposals: Mutex<Vec<(u64, [u8; 32], Hash)>>,
    pub votes: Mutex<Vec<(u64, [u8; 32], Hash)>>,
    pub view_changes: Mutex<Vec<(u64, [u8; 32])>>,
    pub aggregate_votes: Mutex<Vec<(u64, Hash)>>,
}

impl InMemoryConsensusSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsensusSink for InMemoryConsensusSink {
    fn submit_proposal(&self, view: u64, proposer: [u8; 32], block_hash: Hash, _body: Vec<u8>) {
        self.proposals
            .lock()
            .expect("lock poisoned")
            .push((view, proposer, block_hash));
    }

    fn submit_vote(&self, view: u64, voter: [u8; 32], block_hash: Hash, _body: Vec<u8>) {
        self.votes
            .lock()
            .expect("lock poisoned")
            .push((view, voter, block_hash));
    }

    fn submit_view_change(&self, new_view: u64, validator: [u8; 32], _body: Vec<u8>) {
        self.view_changes
            .lock()
            .expect("lock poisoned")
            .push((new_view, validator));
    }

    fn submit_aggregate_vote(&self, view: u64, block_hash: Hash, _body: Vec<u8>) {
        self.aggregate_votes
            .lock()
            .expect("lock poisoned")
            .push((view, block_hash));
    }
}

/// Keeps transactions in a plain map, keyed by hash.
#[derive(Default)]
pub struct InMemoryMempoolSource {
    txs: Mutex<HashMap<Hash, Vec<u8>>>,
}

impl InMemoryMempoolSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MempoolSource for InMemoryMempoolSource {
    fn has_tx(&self, tx_hash: Hash) -> bool {
        self.txs.lock().expect("lock poisoned").contains_key(&tx_hash)
    }

    fn get_txs(&self, tx_hashes: &[Hash]) -> Vec<(Hash, Vec<u8>)> {
        let txs = self.txs.lock().expect("lock poisoned");
        tx_hashes
            .iter()
            .filter_map(|h| txs.get(h).map(|body| (*h, body.clone())))
            .collect()
    }

    fn admit(&self, tx_hash: Hash, body: Vec<u8>) -> bool {
        let mut txs = self.txs.lock().expect("lock poisoned");
        if txs.contains_key(&tx_hash) {
            false
        } else {
            txs.insert(tx_hash, body);
            true
        }
    }
}

/// Keeps blocks in height order in a plain vector.
#[derive(Default)]
pub struct InMemoryBlockStore {
    blocks: Mutex<Vec<Vec<u8>>>,
    by_hash: Mutex<HashMap<Hash, usize>>,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, block_hash: Hash, body: Vec<u8>) {
        let mut blocks = self.blocks.lock().expect("lock poisoned");
        let idx = blocks.len();
        blocks.push(body);
        self.by_hash.lock().expect("lock poisoned").insert(block_hash, idx);
    }
}

impl BlockStore for InMemoryBlockStore {
    fn has_block(&self, block_hash: Hash) -> bool {
        self.by_hash.lock().expect("lock poisoned").contains_key(&block_hash)
    }

    fn get_range(&self, from: u64, count: usize) -> Vec<Vec<u8>> {
        let blocks = self.blocks.lock().expect("lock poisoned");
        let from = from as usize;
        if from >= blocks.len() {
            return vec![];
        }
        let end = (from + count).min(blocks.len());
        blocks[from..end].to_vec()
    }
}

/// Applies blocks by simply accumulating them; never reports a gap.
#[derive(Default)]
pub struct InMemoryChainSource {
    pub applied: Mutex<Vec<Vec<u8>>>,
}

impl InMemoryChainSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainSource for InMemoryChainSource {
    fn apply_block(&self, body: Vec<u8>) -> bool {
        self.applied.lock().expect("lock poisoned").push(body);
        false
    }

    fn apply_sync_batch(&self, bodies: Vec<Vec<u8>>) {
        self.applied.lock().expect("lock poisoned").extend(bodies);
    }
}

/// Drops gossip control messages; a real node wires the two-tier gossip
/// engine behind [`GossipSink`] instead.
#[derive(Default)]
pub struct NoopGossipSink;

impl GossipSink for NoopGossipSink {
    fn handle_ihave(&self, _from: [u8; 32], _msg_ids: Vec<Hash>) {}
    fn handle_iwant(&self, _from: [u8; 32], _msg_ids: Vec<Hash>) {}
    fn handle_graft(&self, _from: [u8; 32]) {}
    fn handle_prune(&self, _from: [u8; 32]) {}
}

/// Returns no peers; a real node wires the Kademlia routing table instead.
#[derive(Default)]
pub struct NoopPeerRouting;

impl PeerRouting for NoopPeerRouting {
    fn closest_peers(&self, _target: [u8; 32]) -> Vec<[u8; 32]> {
        vec![]
    }
}
