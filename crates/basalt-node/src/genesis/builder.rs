//! # Genesis Block Builder
//!
//! Creates and validates the genesis block for chain initialization.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Genesis block creation errors.
#[derive(Debug, Error)]
pub enum GenesisError {
    /// Genesis block already exists in storage.
    #[error("genesis block already exists at height 0")]
    AlreadyExists,

    /// Failed to store genesis block.
    #[error("failed to store genesis block: {0}")]
    StorageFailed(String),

    /// Invalid genesis configuration.
    #[error("invalid genesis configuration: {0}")]
    InvalidConfig(String),
}

/// Genesis block configuration.
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    /// Chain ID distinguishing this network from others.
    pub chain_id: u64,

    /// Genesis timestamp (Unix seconds). Uses current time if `None`.
    pub timestamp: Option<u64>,

    /// Initial validator set (Ed25519 public keys).
    pub initial_validators: Vec<[u8; 32]>,

    /// Initial validator stakes, in base units, aligned with `initial_validators`.
    pub initial_stakes: Vec<u128>,

    /// Protocol version.
    pub protocol_version: u16,

    /// Extra data (max 32 bytes).
    pub extra_data: Vec<u8>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            timestamp: None,
            initial_validators: Vec::new(),
            initial_stakes: Vec::new(),
            protocol_version: 1,
            extra_data: b"basalt-genesis".to_vec(),
        }
    }
}

impl GenesisConfig {
    /// Single-validator configuration for local development.
    pub fn devnet(validator_pubkey: [u8; 32]) -> Self {
        Self {
            chain_id: 31337,
            initial_validators: vec![validator_pubkey],
            initial_stakes: vec![1_000_000_000_000_000_000],
            extra_data: b"basalt-devnet".to_vec(),
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.initial_validators.len() != self.initial_stakes.len() {
            return Err(GenesisError::InvalidConfig(
                "validator count must match stake count".to_string(),
            ));
        }
        if self.extra_data.len() > 32 {
            return Err(GenesisError::InvalidConfig(
                "extra data exceeds 32 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validator information in genesis.
#[derive(Debug, Clone)]
pub struct ValidatorInfo {
    pub pubkey: [u8; 32],
    pub stake: u128,
    pub address: [u8; 20],
}

/// The genesis block: a header plus the validator set it bootstraps.
#[derive(Debug, Clone)]
pub struct GenesisBlock {
    pub header: basalt_types::BlockHeader,
    pub validators: Vec<ValidatorInfo>,
}

/// Empty Merkle tree root: BLAKE3 of a single empty-node tag byte, matching
/// `basalt_state`'s canonical empty trie root.
pub fn empty_merkle_root() -> [u8; 32] {
    *blake3::hash(&[0x00]).as_bytes()
}

/// Builder for creating genesis blocks.
pub struct GenesisBuilder {
    config: GenesisConfig,
}

impl GenesisBuilder {
    pub fn new(config: GenesisConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<GenesisBlock, GenesisError> {
        self.config.validate()?;

        let timestamp = self.config.timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });

        let validators: Vec<ValidatorInfo> = self
            .config
            .initial_validators
            .iter()
            .zip(self.config.initial_stakes.iter())
            .map(|(pubkey, stake)| ValidatorInfo {
                pubkey: *pubkey,
                stake: *stake,
                address: derive_address_from_pubkey(pubkey),
            })
            .collect();

        let state_root = if validators.is_empty() {
            empty_merkle_root()
        } else {
            compute_genesis_state_root(&validators)
        };

        let proposer = validators.first().map(|v| v.pubkey).unwrap_or([0u8; 32]);

        let header = basalt_types::BlockHeader {
            version: self.config.protocol_version,
            height: 0,
            parent_hash: [0u8; 32],
            merkle_root: empty_merkle_root(),
            state_root,
            timestamp,
            proposer,
        };

        Ok(GenesisBlock { header, validators })
    }
}

fn derive_address_from_pubkey(pubkey: &[u8; 32]) -> [u8; 20] {
    let hash = blake3::hash(pubkey);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash.as_bytes()[12..32]);
    address
}

/// Fold all validator (address, stake) pairs into a deterministic genesis
/// state root. Not a real trie root — computing one would require running
/// the validator set through `basalt_state::StateDatabase`, which the
/// container does separately on startup; this is only used when no
/// validator set is known yet.
fn compute_genesis_state_root(validators: &[ValidatorInfo]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for validator in validators {
        hasher.update(&validator.address);
        hasher.update(&validator.stake.to_be_bytes());
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_genesis_has_no_validators() {
        let genesis = GenesisBuilder::new(GenesisConfig::default()).build().unwrap();
        assert_eq!(genesis.header.height, 0);
        assert_eq!(genesis.header.parent_hash, [0u8; 32]);
        assert!(genesis.validators.is_empty());
        assert_eq!(genesis.header.state_root, empty_merkle_root());
    }

    #[test]
    fn devnet_genesis_has_one_validator() {
        let genesis = GenesisBuilder::new(GenesisConfig::devnet([9u8; 32]))
            .build()
            .unwrap();
        assert_eq!(genesis.validators.len(), 1);
        assert_eq!(genesis.validators[0].pubkey, [9u8; 32]);
        assert_ne!(genesis.header.state_root, empty_merkle_root());
    }

    #[test]
    fn genesis_hash_is_deterministic_given_fixed_timestamp() {
        let config = GenesisConfig {
            timestamp: Some(1_700_000_000),
            ..Default::default()
        };
        let a = GenesisBuilder::new(config.clone()).build().unwrap();
        let b = GenesisBuilder::new(config).build().unwrap();
        assert_eq!(a.header.timestamp, b.header.timestamp);
        assert_eq!(a.header.state_root, b.header.state_root);
    }

    #[test]
    fn mismatched_validator_and_stake_counts_are_rejected() {
        let config = GenesisConfig {
            initial_validators: vec![[0u8; 32]],
            initial_stakes: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_extra_data_is_rejected() {
        let config = GenesisConfig {
            extra_data: vec![0u8; 33],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
