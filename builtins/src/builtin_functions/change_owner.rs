use super::common::{check_call_value, consume_gas};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::config::ADDRESS_LEN;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::vm::{ContractCallInput, LogEntry, VmOutput};

/// `ChangeOwnerAddress@newOwner`, only the current owner may call it
pub struct ChangeOwnerAddress {
    gas: GasCostCell,
}

impl ChangeOwnerAddress {
    pub fn new(func_gas_cost: u64) -> Self {
        Self {
            gas: GasCostCell::with_func_cost(func_gas_cost),
        }
    }
}

impl BuiltinFunction for ChangeOwnerAddress {
    fn process_builtin_function(
        &self,
        _acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() != 1 {
            return Err(BuiltInError::InvalidArguments);
        }
        let new_owner = &vm_input.arguments[0];
        if new_owner.len() != ADDRESS_LEN {
            return Err(BuiltInError::InvalidAddressLength);
        }
        let gas_remaining = consume_gas(vm_input.gas_provided, self.gas.func_gas_cost())?;

        // the contract lives on another shard
        let Some(acnt_dst) = acnt_dst else {
            return Ok(VmOutput::ok(gas_remaining));
        };
        if acnt_dst.owner_address() != vm_input.caller_addr {
            return Err(BuiltInError::OperationNotPermitted);
        }
        acnt_dst.set_owner_address(new_owner.clone());

        let mut vm_output = VmOutput::ok(gas_remaining);
        vm_output.logs.push(LogEntry {
            identifier: BuiltInFunctionName::ChangeOwnerAddress.as_bytes().to_vec(),
            address: vm_input.recipient_addr.clone(),
            topics: vec![new_owner.clone()],
            data: Vec::new(),
        });
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas.replace(
            gas_cost.built_in_cost.change_owner_address,
            gas_cost.base_operation_cost,
        );
    }
}
