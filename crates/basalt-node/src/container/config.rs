//! # Node Configuration
//!
//! Loads `NodeConfig` from the environment-style variables the node reads
//! on startup. Mirrors the devnet defaults of the chain's configuration
//! surface and panics on obviously unsafe production configuration.

use thiserror::Error;

/// Errors building a `NodeConfig` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Whether the node runs alone or as part of a validator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// No validator index or peers configured: single-node development mode.
    Standalone,
    /// `VALIDATOR_INDEX` and non-empty `PEERS` are both set.
    Consensus,
}

/// Top-level node configuration, assembled from the environment.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Chain identifier, rejects cross-chain message replay.
    pub chain_id: u64,
    /// Human-readable network name (e.g. "devnet", "testnet").
    pub network: String,
    /// This node's index into the validator set, if it is a validator.
    pub validator_index: Option<u32>,
    /// This node's Ed25519 signing key. Random (and logged as unsafe) in
    /// standalone mode when `VALIDATOR_KEY` is unset.
    pub validator_key: [u8; 32],
    /// Bootstrap peers as `host:port` pairs.
    pub peers: Vec<String>,
    /// HTTP-facing port (health/metrics), default 5000.
    pub http_port: u16,
    /// P2P listen port, default 30303.
    pub p2p_port: u16,
    /// Data directory for RocksDB. `None` means in-memory, ephemeral state.
    pub data_dir: Option<String>,
    /// Whether to use the pipelined consensus path instead of sequential.
    pub use_pipelining: bool,
    /// Whether this node runs standalone or as part of a validator set.
    pub mode: RunMode,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            network: "devnet".to_string(),
            validator_index: None,
            validator_key: [0u8; 32],
            peers: Vec::new(),
            http_port: 5000,
            p2p_port: 30303,
            data_dir: None,
            use_pipelining: false,
            mode: RunMode::Standalone,
        }
    }
}

impl NodeConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chain_id = std::env::var("CHAIN_ID")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                field: "CHAIN_ID",
                reason: e.to_string(),
            })?
            .unwrap_or(1);

        let network = std::env::var("NETWORK").unwrap_or_else(|_| "devnet".to_string());

        let validator_index = std::env::var("VALIDATOR_INDEX")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                field: "VALIDATOR_INDEX",
                reason: e.to_string(),
            })?;

        let peers: Vec<String> = std::env::var("PEERS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let validator_key = match std::env::var("VALIDATOR_KEY") {
            Ok(hex_key) => {
                let bytes = hex::decode(hex_key.trim()).map_err(|e| ConfigError::Invalid {
                    field: "VALIDATOR_KEY",
                    reason: e.to_string(),
                })?;
                if bytes.len() != 32 {
                    return Err(ConfigError::Invalid {
                        field: "VALIDATOR_KEY",
                        reason: format!("expected 32 bytes, got {}", bytes.len()),
                    });
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(&bytes);
                key
            }
            Err(_) => {
                tracing::warn!("VALIDATOR_KEY not set, generating a random dev-only key");
                let mut key = [0u8; 32];
                rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut key);
                key
            }
        };

        let http_port = std::env::var("HTTP_PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                field: "HTTP_PORT",
                reason: e.to_string(),
            })?
            .unwrap_or(5000);

        let p2p_port = std::env::var("P2P_PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                field: "P2P_PORT",
                reason: e.to_string(),
            })?
            .unwrap_or(30303);

        let data_dir = std::env::var("DATA_DIR").ok();

        let use_pipelining = std::env::var("USE_PIPELINING")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mode = if validator_index.is_some() && !peers.is_empty() {
            RunMode::Consensus
        } else {
            RunMode::Standalone
        };

        Ok(Self {
            chain_id,
            network,
            validator_index,
            validator_key,
            peers,
            http_port,
            p2p_port,
            data_dir,
            use_pipelining,
            mode,
        })
    }

    /// Reject configuration that is unsafe to run in production: an
    /// all-zero validator key, or consensus mode with no peers.
    pub fn validate_for_production(&self) {
        if self.validator_key == [0u8; 32] {
            panic!(
                "refusing to start in production with an all-zero VALIDATOR_KEY; \
                 set VALIDATOR_KEY to a real hex-encoded Ed25519 private key"
            );
        }
        if ed25519_dalek::SigningKey::try_from(self.validator_key.as_slice()).is_err() {
            panic!("VALIDATOR_KEY is not a valid 32-byte Ed25519 private key");
        }
        if self.mode == RunMode::Consensus && self.peers.is_empty() {
            panic!("refusing to start in consensus mode with an empty PEERS list");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_standalone_devnet() {
        let config = NodeConfig::default();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.network, "devnet");
        assert_eq!(config.http_port, 5000);
        assert_eq!(config.p2p_port, 30303);
        assert_eq!(config.mode, RunMode::Standalone);
    }

    #[test]
    fn mode_is_consensus_only_with_validator_index_and_peers() {
        let mut config = NodeConfig::default();
        config.validator_index = Some(0);
        config.peers = vec!["10.0.0.1:30303".to_string()];
        config.mode = if config.validator_index.is_some() && !config.peers.is_empty() {
            RunMode::Consensus
        } else {
            RunMode::Standalone
        };
        assert_eq!(config.mode, RunMode::Consensus);
    }

    #[test]
    #[should_panic(expected = "all-zero VALIDATOR_KEY")]
    fn validate_rejects_default_zero_key() {
        NodeConfig::default().validate_for_production();
    }

    #[test]
    fn validate_accepts_nonzero_key_in_standalone_mode() {
        let mut config = NodeConfig::default();
        config.validator_key = [7u8; 32];
        config.validate_for_production();
    }

    #[test]
    #[should_panic(expected = "empty PEERS")]
    fn validate_rejects_consensus_mode_without_peers() {
        let config = NodeConfig {
            validator_key: [7u8; 32],
            mode: RunMode::Consensus,
            peers: Vec::new(),
            ..NodeConfig::default()
        };
        config.validate_for_production();
    }
}
