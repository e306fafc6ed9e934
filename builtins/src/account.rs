//! Account capabilities consumed from the storage engine.
//!
//! Implementations live in the node; tests use the in-memory account from
//! the `mock` module. Callers must serialise every operation touching one
//! account, no locking happens at this layer.

use num_bigint::BigUint;

use crate::error::BuiltInResult;

/// Scoped key/value access to an account's data trie
pub trait AccountDataHandler {
    /// Read the value stored under `key`, `None` when absent
    fn retrieve_value(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, an empty value deletes the key
    fn save_key_value(&mut self, key: &[u8], value: &[u8]) -> anyhow::Result<()>;

    /// Move data trie leaves to the latest trie version within `budget`
    fn migrate_data_trie_leaves(&mut self, budget: &mut TrieMigrationBudget) -> anyhow::Result<()>;
}

/// A user or smart contract account
pub trait UserAccountHandler: AccountDataHandler + Send {
    fn address(&self) -> &[u8];

    /// Native coin balance
    fn balance(&self) -> BigUint;
    fn add_to_balance(&mut self, value: &BigUint) -> anyhow::Result<()>;

    fn owner_address(&self) -> Vec<u8>;
    fn set_owner_address(&mut self, owner: Vec<u8>);

    fn user_name(&self) -> Vec<u8>;
    fn set_user_name(&mut self, name: Vec<u8>);

    /// Reset and return the accumulated developer rewards, `caller` must be the owner
    fn claim_developer_rewards(&mut self, caller: &[u8]) -> BuiltInResult<BigUint>;

    fn is_guarded(&self) -> bool;
}

/// Loads and persists accounts by address
pub trait AccountsAdapter: Send + Sync {
    fn load_account(&self, address: &[u8]) -> anyhow::Result<Box<dyn UserAccountHandler>>;
    fn save_account(&self, account: Box<dyn UserAccountHandler>) -> anyhow::Result<()>;
}

/// Gas budget of a data trie migration, charged per trie node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieMigrationBudget {
    gas_remaining: u64,
    load_per_node: u64,
    store_per_node: u64,
    migrated_leaves: u64,
}

impl TrieMigrationBudget {
    pub fn new(gas_remaining: u64, load_per_node: u64, store_per_node: u64) -> Self {
        Self {
            gas_remaining,
            load_per_node,
            store_per_node,
            migrated_leaves: 0,
        }
    }

    /// Charge one node load, `false` when the budget is exhausted
    pub fn consume_load(&mut self) -> bool {
        self.consume(self.load_per_node)
    }

    /// Charge one leaf store, `false` when the budget is exhausted
    pub fn consume_store(&mut self) -> bool {
        if !self.consume(self.store_per_node) {
            return false;
        }
        self.migrated_leaves += 1;
        true
    }

    fn consume(&mut self, cost: u64) -> bool {
        match self.gas_remaining.checked_sub(cost) {
            Some(remaining) => {
                self.gas_remaining = remaining;
                true
            }
            None => false,
        }
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    pub fn migrated_leaves(&self) -> u64 {
        self.migrated_leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_stops_when_exhausted() {
        let mut budget = TrieMigrationBudget::new(25, 5, 10);
        assert!(budget.consume_load());
        assert!(budget.consume_store());
        assert!(budget.consume_load());
        assert!(!budget.consume_store());
        assert_eq!(budget.gas_remaining(), 5);
        assert_eq!(budget.migrated_leaves(), 1);
    }
}
