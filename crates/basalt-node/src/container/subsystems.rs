//! # Subsystem Container
//!
//! Wires the storage layer, state database, and consensus dispatcher
//! together. Holds the only `Arc`-shared handles a running node needs.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: storage (RocksDB column families, or in-memory for tests)
//! Level 1: state database (trie + overlay, seeded from genesis)
//! Level 2: consensus dispatcher (routes wire frames to mempool/chain/gossip)
//! ```
//!
//! The mempool, block store, chain, gossip, and peer-routing collaborators
//! the dispatcher talks to are themselves behind trait ports
//! (`basalt_consensus::ports`). Mempool, block store, and chain stay
//! in-memory stubs; gossip and peer routing are wired to the real two-tier
//! gossip engine (`basalt-gossip`) and peer registry (`basalt-net`) over the
//! TCP connection registry, so control frames actually leave the process.
//!
//! Building the container also spawns the P2P accept/dial loop
//! (`crate::adapters::p2p_listener`) as a background task: it binds the
//! listen port, dials the configured static peers, and drives the
//! Hello/HelloAck handshake to completion for every connection.

use std::net::SocketAddr;
use std::sync::Arc;

use basalt_consensus::adapters::{
    InMemoryBlockStore, InMemoryChainSource, InMemoryConsensusSink, InMemoryMempoolSource,
};
use basalt_consensus::Dispatcher;
use basalt_gossip::{GossipConfig, GossipEngine};
use basalt_net::{ChainContext, ConnectionRegistry, HandshakeIdentity, PeerRegistry};
use basalt_state::{StateConfig, StateDatabase};
use tracing::{info, instrument};

use crate::adapters::{
    node_id_for_public_key, spawn_p2p, DispatcherMessageSink, NetGossipTransport, NetPeerRouting,
    NodeGossipEngine, P2pContext,
};
use crate::container::config::NodeConfig;
use crate::genesis::{GenesisBlock, GenesisBuilder, GenesisConfig};

#[cfg(feature = "rocksdb")]
use crate::adapters::storage::{RocksDbConfig, RocksDbStore};

/// Holds the subsystem instances a running node needs.
pub struct SubsystemContainer {
    pub config: NodeConfig,
    pub genesis: GenesisBlock,
    pub state: Arc<parking_lot::RwLock<StateDatabase>>,
    pub dispatcher: Arc<Dispatcher>,
    pub gossip: Arc<NodeGossipEngine>,
    pub connections: Arc<ConnectionRegistry>,
    pub peer_registry: Arc<parking_lot::RwLock<PeerRegistry>>,
    #[cfg(feature = "rocksdb")]
    pub storage: Option<Arc<RocksDbStore>>,
}

impl SubsystemContainer {
    /// Build the container from configuration, opening storage if
    /// `data_dir` is set and creating the genesis block.
    #[instrument(skip_all, fields(network = %config.network, chain_id = config.chain_id))]
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        #[cfg(feature = "rocksdb")]
        let storage = match &config.data_dir {
            Some(path) => {
                info!(path, "opening persistent RocksDB storage");
                let rocks_config = RocksDbConfig {
                    path: path.clone(),
                    ..Default::default()
                };
                Some(Arc::new(
                    RocksDbStore::open(rocks_config)
                        .map_err(|e| anyhow::anyhow!("failed to open storage: {e}"))?,
                ))
            }
            None => {
                info!("no DATA_DIR set, running with in-memory state only");
                None
            }
        };

        let genesis_config = match config.validator_index {
            Some(_) => GenesisConfig {
                chain_id: config.chain_id,
                ..GenesisConfig::devnet(config.validator_key_as_pubkey())
            },
            None => GenesisConfig {
                chain_id: config.chain_id,
                ..GenesisConfig::default()
            },
        };
        let genesis = GenesisBuilder::new(genesis_config).build()?;
        info!(
            state_root = %hex::encode(genesis.header.state_root),
            "genesis block assembled"
        );

        let state = Arc::new(parking_lot::RwLock::new(StateDatabase::with_config(
            StateConfig::default(),
        )));

        let consensus = Arc::new(InMemoryConsensusSink::new());
        let mempool = Arc::new(InMemoryMempoolSource::new());
        let blocks = Arc::new(InMemoryBlockStore::new());
        let chain = Arc::new(InMemoryChainSource::new());

        let connections = Arc::new(ConnectionRegistry::new());
        let peer_registry = Arc::new(parking_lot::RwLock::new(PeerRegistry::new(
            basalt_net::DEFAULT_MAX_PEERS,
        )));

        let transport = Arc::new(NetGossipTransport::new(
            connections.clone(),
            tokio::runtime::Handle::current(),
        ));
        let message_sink = Arc::new(DispatcherMessageSink::new());
        let gossip = Arc::new(GossipEngine::new(
            GossipConfig::default(),
            transport,
            message_sink.clone(),
        ));
        let peers = Arc::new(NetPeerRouting::new(peer_registry.clone()));

        let dispatcher = Arc::new(Dispatcher::new(
            consensus,
            mempool,
            blocks,
            chain,
            gossip.clone(),
            peers,
        ));
        message_sink.bind(dispatcher.clone());

        info!("two-tier gossip engine wired into consensus dispatcher");

        let identity = HandshakeIdentity {
            signing_key: basalt_crypto::Ed25519KeyPair::from_seed(config.validator_key),
            bls_public_key: [0u8; 48],
        };
        let self_node_id = node_id_for_public_key(identity.signing_key.public_key().as_bytes());
        let chain_context = ChainContext {
            chain_id: config.chain_id,
            genesis_hash: genesis_header_hash(&genesis.header),
        };
        let p2p_context = Arc::new(P2pContext {
            identity,
            chain_context,
            listen_port: config.p2p_port,
            connections: connections.clone(),
            peer_registry: peer_registry.clone(),
            dispatcher: dispatcher.clone(),
            gossip: gossip.clone(),
            self_node_id,
        });
        let listen_addr = SocketAddr::new(
            std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
            config.p2p_port,
        );
        tokio::spawn(spawn_p2p(p2p_context, listen_addr, config.peers.clone()));

        Ok(Self {
            config,
            genesis,
            state,
            dispatcher,
            gossip,
            connections,
            peer_registry,
            #[cfg(feature = "rocksdb")]
            storage,
        })
    }
}

impl NodeConfig {
    /// Derive a 32-byte placeholder public key from the validator signing
    /// key for genesis purposes. Real validator identity derivation lives
    /// wherever the node's Ed25519 keypair is loaded, not in config.
    fn validator_key_as_pubkey(&self) -> [u8; 32] {
        self.validator_key
    }
}

/// Hash of the genesis header's fixed fields, used as the handshake's
/// `genesis_hash`: two nodes that built the same genesis config agree on it
/// without either storing a dedicated genesis block hash anywhere else.
fn genesis_header_hash(header: &basalt_types::BlockHeader) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&header.version.to_be_bytes());
    hasher.update(&header.height.to_be_bytes());
    hasher.update(&header.parent_hash);
    hasher.update(&header.merkle_root);
    hasher.update(&header.state_root);
    hasher.update(&header.timestamp.to_be_bytes());
    hasher.update(&header.proposer);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn container_builds_with_default_standalone_config() {
        let config = NodeConfig::default();
        let container = SubsystemContainer::new(config).unwrap();
        assert_eq!(container.genesis.header.height, 0);
    }
}
