// DCT Local Burn
// Holder-initiated burn of a fungible balance, gated by the local burn role.

use std::sync::Arc;

use log::trace;
use num_bigint::BigUint;

use super::common::{
    add_dct_entry_in_vm_output, check_allowed_to_burn, check_input_arguments_for_local_action,
    check_value_length, sub_from_dct_balance,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::check;
use crate::config::roles;
use crate::dct::Marshalizer;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{DctRoleHandler, EnableEpochsHandler, GlobalSettingsHandler};
use crate::vm::{ContractCallInput, VmOutput};

/// `DCTLocalBurn@tokenID@amount`
pub struct DctLocalBurn {
    marshaller: Arc<dyn Marshalizer>,
    global_settings_handler: Arc<dyn GlobalSettingsHandler>,
    roles_handler: Arc<dyn DctRoleHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    gas: GasCostCell,
}

impl DctLocalBurn {
    pub fn new(
        func_gas_cost: u64,
        marshaller: Option<Arc<dyn Marshalizer>>,
        global_settings_handler: Option<Arc<dyn GlobalSettingsHandler>>,
        roles_handler: Option<Arc<dyn DctRoleHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
            global_settings_handler: check::required(
                global_settings_handler,
                BuiltInError::NilGlobalSettingsHandler,
            )?,
            roles_handler: check::required(roles_handler, BuiltInError::NilRolesHandler)?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            gas: GasCostCell::with_func_cost(func_gas_cost),
        })
    }

    pub fn func_gas_cost(&self) -> u64 {
        self.gas.func_gas_cost()
    }
}

impl BuiltinFunction for DctLocalBurn {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let func_gas_cost = self.gas.func_gas_cost();

        // Step 1: Input validation
        check_input_arguments_for_local_action(acnt_snd.as_deref(), vm_input, func_gas_cost)?;
        let Some(acnt_snd) = acnt_snd else {
            return Err(BuiltInError::NilUserAccount);
        };
        let token_id = &vm_input.arguments[0];

        // Step 2: Authorization
        check_allowed_to_burn(
            self.global_settings_handler.as_ref(),
            self.roles_handler.as_ref(),
            &*acnt_snd,
            token_id,
            roles::LOCAL_BURN,
        )?;

        // Step 3: Value length guard
        check_value_length(
            self.enable_epochs_handler.as_ref(),
            &vm_input.arguments[1],
            "dct local burn",
        )?;

        // Step 4: Debit the balance
        let value = BigUint::from_bytes_be(&vm_input.arguments[1]);
        sub_from_dct_balance(
            acnt_snd,
            token_id,
            &value,
            self.marshaller.as_ref(),
            self.global_settings_handler.as_ref(),
            vm_input.return_call_after_error,
        )
        .map_err(|err| {
            trace!("local burn of {} rejected: {}", String::from_utf8_lossy(token_id), err);
            err
        })?;

        // Step 5: Output
        let mut vm_output = VmOutput::ok(vm_input.gas_provided - func_gas_cost);
        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctLocalBurn.as_bytes(),
            token_id,
            0,
            &value,
            &[],
        );

        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas
            .replace(gas_cost.built_in_cost.dct_local_burn, gas_cost.base_operation_cost);
    }
}
