use std::collections::HashSet;

use log::debug;
use num_bigint::BigUint;

use super::common::{build_data_field, check_call_value, consume_gas};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::vm::{ContractCallInput, OutputTransfer, VmOutput};

/// `SetUserName@name`, callable only by a DNS contract
///
/// The legacy DNS contracts may only assign a first name. When user name
/// changes are enabled the v2 DNS contracts may also call, and an existing
/// name can be overwritten.
pub struct SaveUserName {
    map_dns_addresses: HashSet<Vec<u8>>,
    map_dns_v2_addresses: HashSet<Vec<u8>>,
    enable_user_name_change: bool,
    gas: GasCostCell,
}

impl SaveUserName {
    pub fn new(
        func_gas_cost: u64,
        map_dns_addresses: HashSet<Vec<u8>>,
        map_dns_v2_addresses: HashSet<Vec<u8>>,
        enable_user_name_change: bool,
    ) -> Self {
        Self {
            map_dns_addresses,
            map_dns_v2_addresses,
            enable_user_name_change,
            gas: GasCostCell::with_func_cost(func_gas_cost),
        }
    }

    fn is_allowed_caller(&self, caller: &[u8]) -> bool {
        if self.map_dns_addresses.contains(caller) {
            return true;
        }
        self.enable_user_name_change && self.map_dns_v2_addresses.contains(caller)
    }
}

impl BuiltinFunction for SaveUserName {
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
        if !self.is_allowed_caller(&vm_input.caller_addr) {
            return Err(BuiltInError::CallerIsNotTheDnsAddress);
        }
        let gas_remaining = consume_gas(vm_input.gas_provided, self.gas.func_gas_cost())?;
        let user_name = &vm_input.arguments[0];

        let Some(acnt_dst) = acnt_dst else {
            // the name is set on the destination shard
            let mut vm_output = VmOutput::ok(gas_remaining);
            vm_output.add_output_transfer(
                &vm_input.recipient_addr,
                OutputTransfer {
                    value: BigUint::default(),
                    gas_limit: 0,
                    data: build_data_field(
                        BuiltInFunctionName::SetUserName.as_str(),
                        std::slice::from_ref(user_name),
                    ),
                    call_type: vm_input.call_type,
                    sender_address: vm_input.caller_addr.clone(),
                },
            );
            return Ok(vm_output);
        };

        if !acnt_dst.user_name().is_empty() && !self.enable_user_name_change {
            return Err(BuiltInError::UserNameChangeIsDisabled);
        }
        acnt_dst.set_user_name(user_name.clone());
        debug!(
            "user name of {} set to {}",
            hex::encode(&vm_input.recipient_addr),
            String::from_utf8_lossy(user_name)
        );

        Ok(VmOutput::ok(gas_remaining))
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas
            .replace(gas_cost.built_in_cost.save_user_name, gas_cost.base_operation_cost);
    }
}
