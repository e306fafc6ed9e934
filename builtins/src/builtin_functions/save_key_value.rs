use super::common::{check_call_value, consume_gas, cost_with_bytes};
use super::BuiltinFunction;
use crate::account::{AccountDataHandler, UserAccountHandler};
use crate::dct::keys::is_protected_key;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::vm::{ContractCallInput, VmOutput};

/// `SaveKeyValue@key@value[@key@value...]` on the caller's own data trie
///
/// Each pair pays `PersistPerByte` over key and value, `DataCopyPerByte`
/// over the previous value and `StorePerByte` over the bytes it grows by.
/// Keys under the protected prefix belong to the protocol.
pub struct SaveKeyValueStorage {
    gas: GasCostCell,
}

impl SaveKeyValueStorage {
    pub fn new(gas_cost: &GasCost) -> Self {
        Self {
            gas: GasCostCell::new(gas_cost.built_in_cost.save_key_value, gas_cost.base_operation_cost),
        }
    }
}

impl BuiltinFunction for SaveKeyValueStorage {
    fn process_builtin_function(
        &self,
        _acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        let args = &vm_input.arguments;
        if args.len() < 2 || args.len() % 2 != 0 {
            return Err(BuiltInError::InvalidArguments);
        }
        if vm_input.caller_addr != vm_input.recipient_addr {
            return Err(BuiltInError::OperationNotPermitted);
        }

        let cost = self.gas.snapshot();
        let mut gas_remaining = consume_gas(vm_input.gas_provided, cost.func_gas_cost)?;
        let Some(acnt_dst) = acnt_dst else {
            return Ok(VmOutput::ok(gas_remaining));
        };

        // Step 1: price every pair before touching the trie
        for pair in args.chunks_exact(2) {
            let (key, value) = (&pair[0], &pair[1]);
            if is_protected_key(key) {
                return Err(BuiltInError::OperationNotPermitted);
            }
            let old_len = acnt_dst.retrieve_value(key)?.map_or(0, |old| old.len()) as u64;
            let new_len = value.len() as u64;

            let mut pair_cost = cost_with_bytes(0, cost.base.persist_per_byte, (key.len() as u64) + new_len);
            pair_cost = cost_with_bytes(pair_cost, cost.base.data_copy_per_byte, old_len);
            pair_cost = cost_with_bytes(pair_cost, cost.base.store_per_byte, new_len.saturating_sub(old_len));
            gas_remaining = consume_gas(gas_remaining, pair_cost)?;
        }

        // Step 2: persist
        for pair in args.chunks_exact(2) {
            acnt_dst.save_key_value(&pair[0], &pair[1])?;
        }

        Ok(VmOutput::ok(gas_remaining))
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas
            .replace(gas_cost.built_in_cost.save_key_value, gas_cost.base_operation_cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dct::keys::dct_token_key;
    use crate::gas::filled_gas_schedule;
    use crate::mock::{user_address, MemoryAccount};

    fn new_fn() -> SaveKeyValueStorage {
        SaveKeyValueStorage::new(&GasCost::from_schedule(&filled_gas_schedule(1)).unwrap())
    }

    fn input(arguments: Vec<Vec<u8>>, gas_provided: u64) -> ContractCallInput {
        ContractCallInput {
            caller_addr: user_address(1),
            recipient_addr: user_address(1),
            arguments,
            gas_provided,
            ..Default::default()
        }
    }

    #[test]
    fn test_pairs_saved_and_charged() {
        let save = new_fn();
        let mut account = MemoryAccount::new(&user_address(1));
        account.save_key_value(b"k2", b"v").unwrap();

        // func 1, pair one: persist 2+3, store 3; pair two: persist 2+2, copy 1, store 1
        let output = save
            .process_builtin_function(
                None,
                Some(&mut account),
                &input(vec![b"k1".to_vec(), b"abc".to_vec(), b"k2".to_vec(), b"vv".to_vec()], 100),
            )
            .unwrap();
        assert_eq!(output.gas_remaining, 100 - 1 - 8 - 6);
        assert_eq!(account.raw(b"k1"), Some(b"abc".to_vec()));
        assert_eq!(account.raw(b"k2"), Some(b"vv".to_vec()));
    }

    #[test]
    fn test_protected_key_writes_nothing() {
        let save = new_fn();
        let mut account = MemoryAccount::new(&user_address(1));
        let err = save
            .process_builtin_function(
                None,
                Some(&mut account),
                &input(vec![b"k".to_vec(), b"v".to_vec(), dct_token_key(b"TKN"), vec![1]], 100),
            )
            .unwrap_err();
        assert!(matches!(err, BuiltInError::OperationNotPermitted));
        assert!(account.raw(b"k").is_none());
    }

    #[test]
    fn test_not_enough_gas_writes_nothing() {
        let save = new_fn();
        let mut account = MemoryAccount::new(&user_address(1));
        let err = save
            .process_builtin_function(None, Some(&mut account), &input(vec![b"key".to_vec(), b"value".to_vec()], 5))
            .unwrap_err();
        assert!(matches!(err, BuiltInError::NotEnoughGas));
        assert!(account.raw(b"key").is_none());
    }

    #[test]
    fn test_shape_checks() {
        let save = new_fn();
        assert!(matches!(
            save.process_builtin_function(None, None, &input(vec![b"k".to_vec()], 10)),
            Err(BuiltInError::InvalidArguments)
        ));
        let mut foreign = input(vec![b"k".to_vec(), b"v".to_vec()], 10);
        foreign.caller_addr = user_address(2);
        assert!(matches!(
            save.process_builtin_function(None, None, &foreign),
            Err(BuiltInError::OperationNotPermitted)
        ));
        assert_eq!(
            save.process_builtin_function(None, None, &input(vec![b"k".to_vec(), b"v".to_vec()], 10))
                .unwrap()
                .gas_remaining,
            9
        );
    }
}
