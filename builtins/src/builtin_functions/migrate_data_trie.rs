use std::sync::Arc;

use log::debug;

use super::common::check_call_value;
use super::BuiltinFunction;
use crate::account::{AccountDataHandler, TrieMigrationBudget, UserAccountHandler};
use crate::check;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::EnableEpochsHandler;
use crate::vm::{ContractCallInput, VmOutput};

/// `MigrateDataTrie` moves the caller's data trie leaves to the latest trie
/// version, as many as the provided gas pays for. Loads and stores are
/// charged per trie node.
pub struct MigrateDataTrie {
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    load_cost: GasCostCell,
    store_cost: GasCostCell,
}

impl MigrateDataTrie {
    pub fn new(
        gas_cost: &GasCost,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            load_cost: GasCostCell::with_func_cost(gas_cost.built_in_cost.trie_load_per_node),
            store_cost: GasCostCell::with_func_cost(gas_cost.built_in_cost.trie_store_per_node),
        })
    }
}

impl BuiltinFunction for MigrateDataTrie {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if !vm_input.arguments.is_empty() {
            return Err(BuiltInError::InvalidArguments);
        }
        if vm_input.caller_addr != vm_input.recipient_addr {
            return Err(BuiltInError::InvalidRcvAddr);
        }
        let acnt_snd = acnt_snd.ok_or(BuiltInError::NilUserAccount)?;

        let mut budget = TrieMigrationBudget::new(
            vm_input.gas_provided,
            self.load_cost.func_gas_cost(),
            self.store_cost.func_gas_cost(),
        );
        acnt_snd.migrate_data_trie_leaves(&mut budget)?;
        debug!(
            "migrated {} data trie leaves of {}",
            budget.migrated_leaves(),
            hex::encode(&vm_input.caller_addr)
        );

        Ok(VmOutput::ok(budget.gas_remaining()))
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.load_cost
            .replace(gas_cost.built_in_cost.trie_load_per_node, gas_cost.base_operation_cost);
        self.store_cost
            .replace(gas_cost.built_in_cost.trie_store_per_node, gas_cost.base_operation_cost);
    }

    fn is_active(&self) -> bool {
        self.enable_epochs_handler.is_migrate_data_trie_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::filled_gas_schedule;
    use crate::mock::{user_address, EnableEpochsHandlerStub, MemoryAccount};

    fn new_fn(epochs: EnableEpochsHandlerStub) -> MigrateDataTrie {
        let mut gas_cost = GasCost::from_schedule(&filled_gas_schedule(1)).unwrap();
        gas_cost.built_in_cost.trie_load_per_node = 2;
        gas_cost.built_in_cost.trie_store_per_node = 3;
        MigrateDataTrie::new(&gas_cost, Some(Arc::new(epochs))).unwrap()
    }

    fn input(gas_provided: u64) -> ContractCallInput {
        ContractCallInput {
            caller_addr: user_address(1),
            recipient_addr: user_address(1),
            gas_provided,
            ..Default::default()
        }
    }

    #[test]
    fn test_migrates_what_the_gas_pays_for() {
        let migrate = new_fn(EnableEpochsHandlerStub::all_enabled());
        let mut account = MemoryAccount::new(&user_address(1));
        account.state.lock().unmigrated_leaves = 10;

        let output = migrate
            .process_builtin_function(Some(&mut account), None, &input(12))
            .unwrap();
        // two leaves at 5 each, the third load fits but its store does not
        assert_eq!(account.state.lock().unmigrated_leaves, 8);
        assert_eq!(output.gas_remaining, 0);
    }

    #[test]
    fn test_new_gas_config_changes_prices() {
        let migrate = new_fn(EnableEpochsHandlerStub::all_enabled());
        let gas_cost = GasCost::from_schedule(&filled_gas_schedule(1)).unwrap();
        migrate.set_new_gas_config(&gas_cost);

        let mut account = MemoryAccount::new(&user_address(1));
        account.state.lock().unmigrated_leaves = 3;
        let output = migrate
            .process_builtin_function(Some(&mut account), None, &input(10))
            .unwrap();
        assert_eq!(account.state.lock().unmigrated_leaves, 0);
        assert_eq!(output.gas_remaining, 4);
    }

    #[test]
    fn test_checks_and_activation() {
        let migrate = new_fn(EnableEpochsHandlerStub::default());
        assert!(!migrate.is_active());
        assert!(matches!(
            migrate.process_builtin_function(None, None, &input(10)),
            Err(BuiltInError::NilUserAccount)
        ));
        let mut foreign = input(10);
        foreign.caller_addr = user_address(2);
        assert!(matches!(
            migrate.process_builtin_function(None, None, &foreign),
            Err(BuiltInError::InvalidRcvAddr)
        ));
    }
}
