//! # Layered State Database
//!
//! Wraps [`PatriciaMerkleTrie`] with a flat in-memory overlay so reads and
//! writes against hot accounts/storage slots don't have to walk the trie on
//! every access. The overlay tracks its own insertions and tombstones for
//! deletions; `compute_state_root` is the only place the overlay is folded
//! back into the trie.
//!
//! ## INVARIANT: Fork Isolation
//!
//! `fork()` returns an independent `StateDatabase` that shares no mutable
//! state with its parent. Mutating the fork never affects the parent's root
//! and vice versa.

use super::{
    AccountState, Address, Hash, PatriciaMerkleTrie, StateError, StateProof, StateConfig,
    StorageKey, StorageProof, StorageValue,
};
use std::collections::{HashMap, HashSet};

/// Key into the flat overlay: either an account slot or a contract storage slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum FlatKey {
    Account(Address),
    Storage(Address, StorageKey),
}

/// Flat-cache overlay in front of a [`PatriciaMerkleTrie`].
///
/// Reads check the overlay first, then fall through to the trie layer.
/// Writes land only in the overlay until `compute_state_root` commits them.
pub struct StateDatabase {
    trie: PatriciaMerkleTrie,
    accounts: HashMap<Address, AccountState>,
    storage: HashMap<(Address, StorageKey), StorageValue>,
    deleted: HashSet<FlatKey>,
}

impl StateDatabase {
    /// Create a new, empty state database.
    pub fn new() -> Self {
        Self::with_config(StateConfig::default())
    }

    /// Create a new state database with custom trie configuration.
    pub fn with_config(config: StateConfig) -> Self {
        Self {
            trie: PatriciaMerkleTrie::with_config(config),
            accounts: HashMap::new(),
            storage: HashMap::new(),
            deleted: HashSet::new(),
        }
    }

    /// Wrap an existing trie (e.g. loaded from disk) with an empty overlay.
    pub fn from_trie(trie: PatriciaMerkleTrie) -> Self {
        Self {
            trie,
            accounts: HashMap::new(),
            storage: HashMap::new(),
            deleted: HashSet::new(),
        }
    }

    /// Read an account, checking the overlay before falling through to the trie.
    pub fn get_account(&self, address: Address) -> Result<Option<AccountState>, StateError> {
        if self.deleted.contains(&FlatKey::Account(address)) {
            return Ok(None);
        }
        if let Some(state) = self.accounts.get(&address) {
            return Ok(Some(state.clone()));
        }
        self.trie.get_account(address)
    }

    /// Whether an account currently exists (overlay tombstones win over the trie).
    pub fn account_exists(&self, address: Address) -> Result<bool, StateError> {
        Ok(self.get_account(address)?.is_some())
    }

    /// Write an account into the overlay.
    pub fn set_account(&mut self, address: Address, state: AccountState) -> Result<(), StateError> {
        self.deleted.remove(&FlatKey::Account(address));
        self.accounts.insert(address, state);
        Ok(())
    }

    /// Tombstone an account so it reads as absent until the next fork.
    ///
    /// Storage slots already committed to the trie layer are reclaimed when
    /// `compute_state_root` calls through to [`PatriciaMerkleTrie::delete_account`],
    /// which drops all slots for the address in one pass.
    pub fn delete_account(&mut self, address: Address) -> Result<(), StateError> {
        self.accounts.remove(&address);
        self.storage.retain(|(addr, _), _| *addr != address);
        self.deleted.insert(FlatKey::Account(address));
        Ok(())
    }

    /// Read a storage slot, checking the overlay before the trie.
    pub fn get_storage(
        &self,
        address: Address,
        key: StorageKey,
    ) -> Result<Option<StorageValue>, StateError> {
        if self.deleted.contains(&FlatKey::Storage(address, key)) {
            return Ok(None);
        }
        if let Some(value) = self.storage.get(&(address, key)) {
            return Ok(Some(*value));
        }
        self.trie.get_storage(address, key)
    }

    /// Write a storage slot into the overlay.
    pub fn set_storage(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError> {
        self.deleted.remove(&FlatKey::Storage(address, key));
        self.storage.insert((address, key), value);
        Ok(())
    }

    /// Tombstone a storage slot.
    pub fn delete_storage(&mut self, address: Address, key: StorageKey) -> Result<(), StateError> {
        self.storage.remove(&(address, key));
        self.deleted.insert(FlatKey::Storage(address, key));
        Ok(())
    }

    /// Fold the overlay into the trie layer and return the resulting state root.
    ///
    /// This drains pending writes and tombstones; after this call the overlay
    /// is empty and all reads fall through to the trie directly.
    pub fn compute_state_root(&mut self) -> Result<Hash, StateError> {
        for key in self.deleted.drain().collect::<Vec<_>>() {
            match key {
                FlatKey::Account(address) => self.trie.delete_account(address)?,
                FlatKey::Storage(address, slot) => self.trie.delete_storage(address, slot)?,
            }
        }
        for (address, state) in self.accounts.drain().collect::<Vec<_>>() {
            self.trie.insert_account(address, &state)?;
        }
        for ((address, key), value) in self.storage.drain().collect::<Vec<_>>() {
            self.trie.set_storage(address, key, value)?;
        }
        Ok(self.trie.root_hash())
    }

    /// Current root hash without committing pending overlay writes.
    ///
    /// If the overlay is non-empty this reflects the last committed root,
    /// not the state that would result from the pending writes.
    pub fn current_root(&self) -> Hash {
        self.trie.root_hash()
    }

    /// Produce an independent copy of this database.
    ///
    /// Mutating the fork never affects `self` and vice versa. Callers
    /// typically fork at a block boundary (after `compute_state_root`) to
    /// get a clean branch point for speculative execution.
    pub fn fork(&self) -> Self {
        Self {
            trie: self.trie.clone(),
            accounts: self.accounts.clone(),
            storage: self.storage.clone(),
            deleted: self.deleted.clone(),
        }
    }

    /// Generate an account inclusion/exclusion proof against the committed trie.
    ///
    /// Pending overlay writes are not reflected; call `compute_state_root`
    /// first if the proof must cover them.
    pub fn generate_account_proof(&self, address: Address) -> Result<StateProof, StateError> {
        self.trie.generate_proof(address)
    }

    /// Generate a storage proof against the committed trie.
    pub fn generate_storage_proof(
        &self,
        address: Address,
        key: StorageKey,
    ) -> Result<StorageProof, StateError> {
        self.trie.generate_storage_proof(address, key)
    }
}

impl Default for StateDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        [byte; 20]
    }

    #[test]
    fn overlay_read_after_write() {
        let mut db = StateDatabase::new();
        let account = AccountState {
            balance: primitive_types::U256::from(500u64),
            nonce: 1,
            ..Default::default()
        };
        db.set_account(addr(1), account.clone()).unwrap();
        assert_eq!(db.get_account(addr(1)).unwrap(), Some(account));
    }

    #[test]
    fn tombstone_shadows_trie() {
        let mut db = StateDatabase::new();
        let account = AccountState::new(100u64);
        db.set_account(addr(2), account).unwrap();
        db.compute_state_root().unwrap();
        assert!(db.account_exists(addr(2)).unwrap());

        db.delete_account(addr(2)).unwrap();
        assert!(!db.account_exists(addr(2)).unwrap());
    }

    #[test]
    fn fork_is_isolated() {
        let mut db = StateDatabase::new();
        db.set_account(addr(3), AccountState::new(10u64)).unwrap();
        db.compute_state_root().unwrap();

        let mut forked = db.fork();
        forked.set_account(addr(3), AccountState::new(999u64)).unwrap();
        forked.compute_state_root().unwrap();

        assert_eq!(
            db.get_account(addr(3)).unwrap().unwrap().balance,
            primitive_types::U256::from(10u64)
        );
        assert_eq!(
            forked.get_account(addr(3)).unwrap().unwrap().balance,
            primitive_types::U256::from(999u64)
        );
    }

    #[test]
    fn compute_state_root_commits_storage() {
        let mut db = StateDatabase::new();
        let key: StorageKey = [7u8; 32];
        let value: StorageValue = [9u8; 32];
        db.set_account(addr(4), AccountState::new(1u64)).unwrap();
        db.set_storage(addr(4), key, value).unwrap();
        db.compute_state_root().unwrap();

        assert_eq!(db.get_storage(addr(4), key).unwrap(), Some(value));
    }
}
