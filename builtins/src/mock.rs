//! In-memory collaborators shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use num_bigint::BigUint;
use parking_lot::Mutex;

use crate::account::{AccountDataHandler, AccountsAdapter, TrieMigrationBudget, UserAccountHandler};
use crate::config::{
    is_smart_contract_address, is_system_account_address, ADDRESS_LEN, METACHAIN_SHARD_ID,
};
use crate::dct::{DCToken, JsonMarshalizer, Marshalizer};
use crate::error::{BuiltInError, BuiltInResult};
use crate::interfaces::{
    DctRoleHandler, EnableEpochsHandler, GlobalSettingsHandler, GuardedAccountHandler,
    PayableHandler, ShardCoordinator,
};

#[derive(Debug, Default)]
pub struct AccountState {
    pub data: HashMap<Vec<u8>, Vec<u8>>,
    pub balance: BigUint,
    pub owner: Vec<u8>,
    pub user_name: Vec<u8>,
    pub developer_reward: BigUint,
    pub guarded: bool,
    pub retrieve_error: Option<String>,
    pub save_error: Option<String>,
    /// Keys whose writes fail while every other write succeeds
    pub read_only_keys: Vec<Vec<u8>>,
    pub saves: usize,
    /// Leaves still on the old trie version
    pub unmigrated_leaves: u64,
}

/// Account handle over shared state, clones see the same data
#[derive(Debug, Clone)]
pub struct MemoryAccount {
    address: Vec<u8>,
    pub state: Arc<Mutex<AccountState>>,
}

impl MemoryAccount {
    pub fn new(address: &[u8]) -> Self {
        Self {
            address: address.to_vec(),
            state: Arc::new(Mutex::new(AccountState::default())),
        }
    }

    pub fn raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.state.lock().data.get(key).cloned()
    }

    pub fn put_token(&self, key: &[u8], token: &DCToken) {
        let bytes = JsonMarshalizer.marshal_token(token).unwrap();
        self.state.lock().data.insert(key.to_vec(), bytes);
    }

    pub fn token(&self, key: &[u8]) -> Option<DCToken> {
        self.raw(key)
            .map(|bytes| JsonMarshalizer.unmarshal_token(&bytes).unwrap())
    }
}

impl AccountDataHandler for MemoryAccount {
    fn retrieve_value(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        let state = self.state.lock();
        if let Some(err) = &state.retrieve_error {
            return Err(anyhow::anyhow!(err.clone()));
        }
        Ok(state.data.get(key).cloned())
    }

    fn save_key_value(&mut self, key: &[u8], value: &[u8]) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        if let Some(err) = &state.save_error {
            return Err(anyhow::anyhow!(err.clone()));
        }
        if state.read_only_keys.iter().any(|locked| locked.as_slice() == key) {
            return Err(anyhow::anyhow!("key {} is read only", hex::encode(key)));
        }
        state.saves += 1;
        if value.is_empty() {
            state.data.remove(key);
        } else {
            state.data.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    fn migrate_data_trie_leaves(&mut self, budget: &mut TrieMigrationBudget) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        while state.unmigrated_leaves > 0 {
            if !budget.consume_load() || !budget.consume_store() {
                break;
            }
            state.unmigrated_leaves -= 1;
        }
        Ok(())
    }
}

impl UserAccountHandler for MemoryAccount {
    fn address(&self) -> &[u8] {
        &self.address
    }

    fn balance(&self) -> BigUint {
        self.state.lock().balance.clone()
    }

    fn add_to_balance(&mut self, value: &BigUint) -> anyhow::Result<()> {
        self.state.lock().balance += value;
        Ok(())
    }

    fn owner_address(&self) -> Vec<u8> {
        self.state.lock().owner.clone()
    }

    fn set_owner_address(&mut self, owner: Vec<u8>) {
        self.state.lock().owner = owner;
    }

    fn user_name(&self) -> Vec<u8> {
        self.state.lock().user_name.clone()
    }

    fn set_user_name(&mut self, name: Vec<u8>) {
        self.state.lock().user_name = name;
    }

    fn claim_developer_rewards(&mut self, caller: &[u8]) -> BuiltInResult<BigUint> {
        let mut state = self.state.lock();
        if state.owner != caller {
            return Err(BuiltInError::OperationNotPermitted);
        }
        Ok(std::mem::take(&mut state.developer_reward))
    }

    fn is_guarded(&self) -> bool {
        self.state.lock().guarded
    }
}

/// Accounts adapter over shared in-memory accounts
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: Mutex<HashMap<Vec<u8>, MemoryAccount>>,
    pub saves: AtomicUsize,
}

impl MemoryAccounts {
    pub fn account(&self, address: &[u8]) -> MemoryAccount {
        self.accounts
            .lock()
            .entry(address.to_vec())
            .or_insert_with(|| MemoryAccount::new(address))
            .clone()
    }
}

impl AccountsAdapter for MemoryAccounts {
    fn load_account(&self, address: &[u8]) -> anyhow::Result<Box<dyn UserAccountHandler>> {
        Ok(Box::new(self.account(address)))
    }

    fn save_account(&self, _account: Box<dyn UserAccountHandler>) -> anyhow::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct EnableEpochsHandlerStub {
    pub consistent_tokens_values_length_check: bool,
    pub dct_transfer_role: bool,
    pub guard_account: bool,
    pub migrate_data_trie: bool,
    pub dynamic_dct: bool,
}

impl EnableEpochsHandlerStub {
    pub fn all_enabled() -> Self {
        Self {
            consistent_tokens_values_length_check: true,
            dct_transfer_role: true,
            guard_account: true,
            migrate_data_trie: true,
            dynamic_dct: true,
        }
    }
}

impl EnableEpochsHandler for EnableEpochsHandlerStub {
    fn is_consistent_tokens_values_length_check_enabled(&self) -> bool {
        self.consistent_tokens_values_length_check
    }

    fn is_dct_transfer_role_enabled(&self) -> bool {
        self.dct_transfer_role
    }

    fn is_guard_account_enabled(&self) -> bool {
        self.guard_account
    }

    fn is_migrate_data_trie_enabled(&self) -> bool {
        self.migrate_data_trie
    }

    fn is_dynamic_dct_enabled(&self) -> bool {
        self.dynamic_dct
    }
}

#[derive(Debug, Default, Clone)]
pub struct GlobalSettingsHandlerStub {
    pub paused: bool,
    pub limited_transfer: bool,
    pub burn_for_all: bool,
    pub transfer_role: bool,
}

impl GlobalSettingsHandler for GlobalSettingsHandlerStub {
    fn is_paused(&self, _token_id: &[u8]) -> bool {
        self.paused
    }

    fn is_limited_transfer(&self, _token_id: &[u8]) -> bool {
        self.limited_transfer
    }

    fn is_burn_for_all(&self, _token_id: &[u8]) -> bool {
        self.burn_for_all
    }

    fn is_sender_or_destination_with_transfer_role(
        &self,
        _sender: &[u8],
        _destination: &[u8],
        _token_id: &[u8],
    ) -> bool {
        self.transfer_role
    }
}

type RoleCheck = dyn Fn(&[u8], &[u8]) -> BuiltInResult<()> + Send + Sync;

/// Role handler answering through a closure of `(token_id, action)`
pub struct RoleHandlerStub {
    check: Box<RoleCheck>,
    pub calls: AtomicUsize,
}

impl RoleHandlerStub {
    pub fn with<F>(check: F) -> Self
    where
        F: Fn(&[u8], &[u8]) -> BuiltInResult<()> + Send + Sync + 'static,
    {
        Self {
            check: Box::new(check),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn allow_all() -> Self {
        Self::with(|_, _| Ok(()))
    }

    pub fn deny_all() -> Self {
        Self::with(|_, _| Err(BuiltInError::ActionNotAllowed))
    }
}

impl DctRoleHandler for RoleHandlerStub {
    fn check_allowed_to_execute(
        &self,
        _account: &dyn UserAccountHandler,
        token_id: &[u8],
        action: &[u8],
    ) -> BuiltInResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.check)(token_id, action)
    }
}

/// Shards split on the last address byte, system contracts (`..ffff`) on the metachain
#[derive(Debug, Clone)]
pub struct ShardCoordinatorMock {
    pub shards: u32,
    pub self_id: u32,
}

impl Default for ShardCoordinatorMock {
    fn default() -> Self {
        Self {
            shards: 2,
            self_id: 0,
        }
    }
}

impl ShardCoordinator for ShardCoordinatorMock {
    fn number_of_shards(&self) -> u32 {
        self.shards
    }

    fn compute_id(&self, address: &[u8]) -> u32 {
        if is_smart_contract_address(address) && address.ends_with(&[0xff, 0xff]) {
            return METACHAIN_SHARD_ID;
        }
        if is_system_account_address(address) {
            return self.self_id;
        }
        let last = address.last().copied().unwrap_or(0);
        u32::from(last) % self.shards
    }

    fn self_id(&self) -> u32 {
        self.self_id
    }
}

#[derive(Default)]
pub struct GuardedAccountHandlerStub {
    pub fail_with: Option<String>,
    pub set_guardian_calls: AtomicUsize,
    pub guard_calls: AtomicUsize,
    pub un_guard_calls: AtomicUsize,
}

impl GuardedAccountHandlerStub {
    fn outcome(&self) -> anyhow::Result<()> {
        match &self.fail_with {
            Some(err) => Err(anyhow::anyhow!(err.clone())),
            None => Ok(()),
        }
    }
}

impl GuardedAccountHandler for GuardedAccountHandlerStub {
    fn is_guarded(&self, account: &dyn UserAccountHandler) -> bool {
        account.is_guarded()
    }

    fn set_guardian(
        &self,
        _account: &mut dyn UserAccountHandler,
        _guardian: &[u8],
        _tx_guardian: &[u8],
        _guardian_service_uid: &[u8],
    ) -> anyhow::Result<()> {
        self.set_guardian_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    fn guard_account(&self, _account: &mut dyn UserAccountHandler) -> anyhow::Result<()> {
        self.guard_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    fn un_guard_account(&self, _account: &mut dyn UserAccountHandler) -> anyhow::Result<()> {
        self.un_guard_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PayableHandlerStub {
    pub payable: bool,
}

impl PayableHandler for PayableHandlerStub {
    fn is_payable(&self, _sender: &[u8], _receiver: &[u8]) -> anyhow::Result<bool> {
        Ok(self.payable)
    }
}

/// Regular user address whose last byte selects the shard
pub fn user_address(tag: u8) -> Vec<u8> {
    let mut address = vec![tag; ADDRESS_LEN];
    address[ADDRESS_LEN - 1] = tag;
    address
}

/// Smart contract address whose last byte selects the shard
pub fn sc_address(tag: u8) -> Vec<u8> {
    let mut address = vec![0u8; ADDRESS_LEN];
    address[ADDRESS_LEN - 2] = 0x0a;
    address[ADDRESS_LEN - 1] = tag;
    address
}
