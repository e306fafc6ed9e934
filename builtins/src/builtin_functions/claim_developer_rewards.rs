use log::trace;
use num_bigint::BigUint;

use super::common::{check_call_value, consume_gas};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::dct::keys::big_to_bytes;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::vm::{ContractCallInput, LogEntry, OutputAccount, OutputTransfer, VmOutput};

/// `ClaimDeveloperRewards` pays the accumulated rewards of a contract to its owner
pub struct ClaimDeveloperRewards {
    gas: GasCostCell,
}

impl ClaimDeveloperRewards {
    pub fn new(func_gas_cost: u64) -> Self {
        Self {
            gas: GasCostCell::with_func_cost(func_gas_cost),
        }
    }
}

impl BuiltinFunction for ClaimDeveloperRewards {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        let acnt_dst = acnt_dst.ok_or(BuiltInError::NilScDestAccount)?;
        let gas_remaining = consume_gas(vm_input.gas_provided, self.gas.func_gas_cost())?;

        let value = acnt_dst.claim_developer_rewards(&vm_input.caller_addr)?;
        if let Some(acnt_snd) = acnt_snd {
            acnt_snd.add_to_balance(&value)?;
        }
        trace!(
            "claimed {} developer rewards of {} for {}",
            value,
            hex::encode(&vm_input.recipient_addr),
            hex::encode(&vm_input.caller_addr)
        );

        let mut vm_output = VmOutput::ok(gas_remaining);
        vm_output.output_accounts.insert(
            vm_input.caller_addr.clone(),
            OutputAccount {
                address: vm_input.caller_addr.clone(),
                balance_delta: value.clone(),
                output_transfers: vec![OutputTransfer {
                    value: value.clone(),
                    gas_limit: 0,
                    data: Vec::new(),
                    call_type: vm_input.call_type,
                    sender_address: vm_input.recipient_addr.clone(),
                }],
            },
        );
        vm_output.logs.push(LogEntry {
            identifier: BuiltInFunctionName::ClaimDeveloperRewards.as_bytes().to_vec(),
            address: vm_input.recipient_addr.clone(),
            topics: vec![big_to_bytes(&value), vm_input.caller_addr.clone()],
            data: Vec::new(),
        });
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas.replace(
            gas_cost.built_in_cost.claim_developer_rewards,
            gas_cost.base_operation_cost,
        );
    }
}
