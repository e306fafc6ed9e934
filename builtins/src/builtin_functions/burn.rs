use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::Zero;

use super::common::{
    add_dct_entry_in_vm_output, check_call_value, check_value_length, consume_gas,
    sub_from_dct_balance,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::check;
use crate::config::is_dct_sc_address;
use crate::dct::Marshalizer;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{EnableEpochsHandler, GlobalSettingsHandler};
use crate::vm::{ContractCallInput, VmOutput};

/// `DCTBurn@tokenID@amount` sent to the DCT system smart contract.
///
/// The holder's balance is debited on its own shard; the metachain side only
/// updates the token supply and needs nothing from this function.
pub struct DctBurn {
    marshaller: Arc<dyn Marshalizer>,
    global_settings_handler: Arc<dyn GlobalSettingsHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    gas: GasCostCell,
}

impl DctBurn {
    pub fn new(
        func_gas_cost: u64,
        marshaller: Option<Arc<dyn Marshalizer>>,
        global_settings_handler: Option<Arc<dyn GlobalSettingsHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
            global_settings_handler: check::required(
                global_settings_handler,
                BuiltInError::NilGlobalSettingsHandler,
            )?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            gas: GasCostCell::with_func_cost(func_gas_cost),
        })
    }
}

impl BuiltinFunction for DctBurn {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() != 2 {
            return Err(BuiltInError::InvalidArguments);
        }
        check_value_length(
            self.enable_epochs_handler.as_ref(),
            &vm_input.arguments[1],
            "dct burn",
        )?;
        let value = BigUint::from_bytes_be(&vm_input.arguments[1]);
        if value.is_zero() {
            return Err(BuiltInError::NegativeValue);
        }
        if !is_dct_sc_address(&vm_input.recipient_addr) {
            return Err(BuiltInError::AddressIsNotDctSystemSc);
        }
        let Some(acnt_snd) = acnt_snd else {
            // metachain side
            return Ok(VmOutput::ok(vm_input.gas_provided));
        };

        let gas_remaining = consume_gas(vm_input.gas_provided, self.gas.func_gas_cost())?;
        let token_id = &vm_input.arguments[0];
        sub_from_dct_balance(
            acnt_snd,
            token_id,
            &value,
            self.marshaller.as_ref(),
            self.global_settings_handler.as_ref(),
            false,
        )?;

        let mut vm_output = VmOutput::ok(gas_remaining);
        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctBurn.as_bytes(),
            token_id,
            0,
            &value,
            &[],
        );
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas
            .replace(gas_cost.built_in_cost.dct_burn, gas_cost.base_operation_cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DCT_SC_ADDRESS;
    use crate::dct::keys::dct_token_key;
    use crate::dct::{DCToken, JsonMarshalizer};
    use crate::mock::{user_address, EnableEpochsHandlerStub, GlobalSettingsHandlerStub, MemoryAccount};

    fn new_burn() -> DctBurn {
        DctBurn::new(
            5,
            Some(Arc::new(JsonMarshalizer)),
            Some(Arc::new(GlobalSettingsHandlerStub::default())),
            Some(Arc::new(EnableEpochsHandlerStub::default())),
        )
        .unwrap()
    }

    fn burn_input(recipient: &[u8]) -> ContractCallInput {
        ContractCallInput {
            caller_addr: user_address(1),
            recipient_addr: recipient.to_vec(),
            arguments: vec![b"TKN".to_vec(), vec![3]],
            gas_provided: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_burn_debits_holder() {
        let burn = new_burn();
        let mut holder = MemoryAccount::new(&user_address(1));
        holder.put_token(&dct_token_key(b"TKN"), &DCToken::fungible(BigUint::from(10u8)));

        let output = burn
            .process_builtin_function(Some(&mut holder), None, &burn_input(&DCT_SC_ADDRESS))
            .unwrap();
        assert_eq!(output.gas_remaining, 5);
        assert_eq!(holder.token(&dct_token_key(b"TKN")).unwrap().value, BigUint::from(7u8));
    }

    #[test]
    fn test_burn_must_target_system_sc() {
        let burn = new_burn();
        let mut holder = MemoryAccount::new(&user_address(1));
        let err = burn
            .process_builtin_function(Some(&mut holder), None, &burn_input(&user_address(2)))
            .unwrap_err();
        assert!(matches!(err, BuiltInError::AddressIsNotDctSystemSc));
    }

    #[test]
    fn test_metachain_side_is_noop() {
        let burn = new_burn();
        let output = burn
            .process_builtin_function(None, None, &burn_input(&DCT_SC_ADDRESS))
            .unwrap();
        assert_eq!(output.gas_remaining, 10);
        assert!(output.logs.is_empty());
    }
}
