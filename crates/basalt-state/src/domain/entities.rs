//! # Domain Entities for State Management
//!
//! Core data structures per SPEC-04 Section 2.1.
//!
//! ## Type Decisions
//!
//! - `balance: U256` - balances are 256-bit to match the wire/account-encoding
//!   width used across the chain (matches `basalt_types::U256`, itself
//!   `primitive_types::U256`). u128 undercounts what a long-running chain can
//!   accumulate in rewards and is rejected in favor of the wider type.
//!
//! ## References
//!
//! - SPEC-04 Section 2.1: Core Entities
//! - Architecture.md Section 2.1: DDD principles

use primitive_types::U256;
use serde::{Deserialize, Serialize};

pub type Hash = [u8; 32];
pub type Address = [u8; 20];
pub type StorageKey = [u8; 32];
pub type StorageValue = [u8; 32];

/// Empty code hash for externally owned accounts (EOAs).
/// Contracts have non-zero code_hash after deployment.
pub const EMPTY_CODE_HASH: Hash = [0u8; 32];

/// Canonical empty trie root: the BLAKE3 hash of the empty node's canonical
/// encoding (a single `0x00` tag byte). Computed rather than hardcoded so it
/// stays correct if the canonical encoding ever changes.
pub fn empty_trie_root() -> Hash {
    *blake3::hash(&[0x00]).as_bytes()
}

/// Maximum cached accounts in LRU cache.
pub const MAX_CACHED_ACCOUNTS: usize = 10_000;

/// Account kind, mirrors the reserved system-contract address range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccountType {
    /// Externally owned account.
    Eoa = 0,
    /// Deployed contract account.
    Contract = 1,
    /// Protocol-owned system contract (address in `0x0001..=0x1FFF`).
    System = 2,
    /// Validator identity account.
    Validator = 3,
}

impl AccountType {
    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => AccountType::Contract,
            2 => AccountType::System,
            3 => AccountType::Validator,
            _ => AccountType::Eoa,
        }
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Eoa
    }
}

/// Account state stored in the Patricia Merkle Trie.
///
/// Each account in the blockchain has this state structure. The account
/// is identified by its 20-byte address (derived from public key).
///
/// ## Fields
///
/// - `balance`: Token balance in base units, 256-bit
/// - `nonce`: Transaction count, prevents replay attacks (INVARIANT-2)
/// - `code_hash`: Hash of contract bytecode (EMPTY_CODE_HASH for EOAs)
/// - `storage_root`: Root of account's storage trie (empty_trie_root() if empty)
/// - `account_type`: EOA / Contract / System / Validator
/// - `compliance_hash`: hash of the attached compliance attestation, zero if none
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Account balance in base units.
    #[serde(with = "u256_serde")]
    pub balance: U256,
    /// Transaction nonce. Increments by exactly 1 per processed transaction.
    pub nonce: u64,
    /// Content hash of contract code. EMPTY_CODE_HASH for non-contract accounts.
    pub code_hash: Hash,
    /// Root hash of the account's storage Patricia Merkle Trie.
    pub storage_root: Hash,
    /// Account kind.
    pub account_type: AccountType,
    /// Hash of the compliance attestation bound to this account, if any.
    pub compliance_hash: Hash,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code_hash: EMPTY_CODE_HASH,
            storage_root: empty_trie_root(),
            account_type: AccountType::Eoa,
            compliance_hash: [0u8; 32],
        }
    }
}

impl AccountState {
    /// Create a new account with the specified balance.
    pub fn new(balance: impl Into<U256>) -> Self {
        Self {
            balance: balance.into(),
            ..Default::default()
        }
    }

    /// Builder method to set nonce.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Fixed-width byte length of [`AccountState::encode`]'s output.
    pub const ENCODED_LEN: usize = 8 + 32 + 32 + 32 + 1 + 32;

    /// Encode this account as the fixed-width leaf value stored in the trie.
    ///
    /// Layout: `nonce(8 BE) | balance(32 BE) | storage_root(32) | code_hash(32)
    /// | account_type(1) | compliance_hash(32)`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend_from_slice(&self.nonce.to_be_bytes());
        let mut balance_be = [0u8; 32];
        self.balance.to_big_endian(&mut balance_be);
        out.extend_from_slice(&balance_be);
        out.extend_from_slice(&self.storage_root);
        out.extend_from_slice(&self.code_hash);
        out.push(self.account_type as u8);
        out.extend_from_slice(&self.compliance_hash);
        out
    }

    /// Decode an account previously produced by [`AccountState::encode`].
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        let mut nonce_b = [0u8; 8];
        nonce_b.copy_from_slice(&bytes[0..8]);
        let balance = U256::from_big_endian(&bytes[8..40]);
        let mut storage_root = [0u8; 32];
        storage_root.copy_from_slice(&bytes[40..72]);
        let mut code_hash = [0u8; 32];
        code_hash.copy_from_slice(&bytes[72..104]);
        let account_type = AccountType::from_byte(bytes[104]);
        let mut compliance_hash = [0u8; 32];
        compliance_hash.copy_from_slice(&bytes[105..137]);
        Some(Self {
            nonce: u64::from_be_bytes(nonce_b),
            balance,
            storage_root,
            code_hash,
            account_type,
            compliance_hash,
        })
    }
}

/// `serde` adapter storing [`U256`] as its 32-byte big-endian form, so
/// `AccountState`'s JSON/bincode representation stays a fixed-width byte
/// string instead of `primitive_types`'s own (not self-describing) layout.
mod u256_serde {
    use primitive_types::U256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        let mut be = [0u8; 32];
        value.to_big_endian(&mut be);
        be.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let be = <[u8; 32]>::deserialize(deserializer)?;
        Ok(U256::from_big_endian(&be))
    }
}

/// State transition for a single account within a block.
///
/// Represents changes to apply to an account's state during block processing.
/// Used by the choreography handler when processing BlockValidated events.
///
/// ## INVARIANT-1 Enforcement
///
/// `balance_delta` can be negative (spending), but the resulting balance
/// must remain non-negative. This is enforced during application.
///
/// ## INVARIANT-2 Enforcement
///
/// `nonce_increment` must be exactly 1 for processed transactions, 0 otherwise.
#[derive(Clone, Debug)]
pub struct AccountTransition {
    /// Target account address.
    pub address: Address,
    /// Balance change (positive = credit, negative = debit).
    pub balance_delta: i128,
    /// Nonce increment (must be 0 or 1 per INVARIANT-2).
    pub nonce_increment: u64,
    /// Storage slot changes. None value = deletion.
    pub storage_changes: Vec<(StorageKey, Option<StorageValue>)>,
    /// New contract code (for contract deployment).
    pub code_change: Option<Vec<u8>>,
}

impl AccountTransition {
    /// Create a simple transfer transition.
    ///
    /// If `delta < 0`, this is a send operation and nonce increments.
    /// If `delta >= 0`, this is a receive operation and nonce stays same.
    pub fn transfer(address: Address, delta: i128) -> Self {
        Self {
            address,
            balance_delta: delta,
            nonce_increment: if delta < 0 { 1 } else { 0 },
            storage_changes: vec![],
            code_change: None,
        }
    }
}

/// Complete state transition for a block.
///
/// Contains all account transitions that result from processing
/// a validated block. Used to batch-apply state changes atomically.
///
/// ## INVARIANT-5: Atomic Transitions
///
/// All transitions in a BlockStateTransition are applied atomically.
/// Either all succeed or none are applied (all-or-nothing semantics).
#[derive(Clone, Debug)]
pub struct BlockStateTransition {
    /// Hash of the block being processed.
    pub block_hash: Hash,
    /// Height of the block being processed.
    pub block_height: u64,
    /// All account transitions in this block.
    pub account_transitions: Vec<AccountTransition>,
    /// State root before applying this block.
    pub previous_state_root: Hash,
}

/// Configuration for the Patricia Merkle Trie.
///
/// Controls memory usage, caching behavior, and DoS protection limits.
#[derive(Clone, Debug)]
pub struct StateConfig {
    /// Maximum trie depth. Limits path length to prevent DoS.
    /// 64 is sufficient for 256-bit keys (64 nibbles).
    pub max_depth: usize,
    /// Size of in-memory node cache in megabytes.
    pub cache_size_mb: usize,
    /// Enable periodic state snapshots for fast sync.
    pub enable_snapshots: bool,
    /// Create snapshot every N blocks.
    pub snapshot_interval: u64,
    /// Keep state for last N blocks (older states pruned).
    pub pruning_depth: u64,
    /// Maximum storage slots per contract (DoS protection).
    pub max_storage_slots_per_contract: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            cache_size_mb: 512,
            enable_snapshots: true,
            snapshot_interval: 128,
            pruning_depth: 1000,
            max_storage_slots_per_contract: 10_000,
        }
    }
}

// =============================================================================
// TESTS (TDD)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_cached_accounts() {
        assert_eq!(MAX_CACHED_ACCOUNTS, 10_000);
    }

    #[test]
    fn test_account_state_default() {
        let state = AccountState::default();
        assert_eq!(state.balance, U256::zero());
        assert_eq!(state.nonce, 0);
        assert_eq!(state.code_hash, EMPTY_CODE_HASH);
        assert_eq!(state.storage_root, empty_trie_root());
    }

    #[test]
    fn encode_decode_roundtrip_is_137_bytes() {
        let account = AccountState {
            balance: U256::from(123_456_789u64),
            nonce: 7,
            code_hash: [2u8; 32],
            storage_root: [3u8; 32],
            account_type: AccountType::Contract,
            compliance_hash: [4u8; 32],
        };
        let encoded = account.encode();
        assert_eq!(encoded.len(), AccountState::ENCODED_LEN);
        assert_eq!(encoded.len(), 137);
        assert_eq!(AccountState::decode(&encoded).unwrap(), account);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(AccountState::decode(&[0u8; 121]).is_none());
        assert!(AccountState::decode(&[0u8; 136]).is_none());
    }

    #[test]
    fn balance_survives_values_past_u128() {
        let huge = U256::from(u128::MAX) + U256::from(1u64);
        let account = AccountState::new(huge);
        let encoded = account.encode();
        assert_eq!(AccountState::decode(&encoded).unwrap().balance, huge);
    }
}
