use std::sync::Arc;

use log::trace;
use num_bigint::BigUint;
use num_traits::Zero;

use super::common::{
    add_dct_entry_in_vm_output, check_allowed_to_burn, check_frozen_and_pause, check_self_call,
    check_value_length, consume_gas, debit, nft_nonce,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::check;
use crate::config::roles;
use crate::dct::keys::dct_token_key;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{DctRoleHandler, EnableEpochsHandler, GlobalSettingsHandler, NftStorageHandler};
use crate::vm::{ContractCallInput, VmOutput};

/// `DCTNFTBurn@tokenID@nonce@quantity`
pub struct DctNftBurn {
    global_settings_handler: Arc<dyn GlobalSettingsHandler>,
    roles_handler: Arc<dyn DctRoleHandler>,
    nft_storage_handler: Arc<dyn NftStorageHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    gas: GasCostCell,
}

impl DctNftBurn {
    pub fn new(
        func_gas_cost: u64,
        global_settings_handler: Option<Arc<dyn GlobalSettingsHandler>>,
        roles_handler: Option<Arc<dyn DctRoleHandler>>,
        nft_storage_handler: Option<Arc<dyn NftStorageHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            global_settings_handler: check::required(
                global_settings_handler,
                BuiltInError::NilGlobalSettingsHandler,
            )?,
            roles_handler: check::required(roles_handler, BuiltInError::NilRolesHandler)?,
            nft_storage_handler: check::required(
                nft_storage_handler,
                BuiltInError::NilDctNftStorageHandler,
            )?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            gas: GasCostCell::with_func_cost(func_gas_cost),
        })
    }
}

impl BuiltinFunction for DctNftBurn {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_self_call(vm_input, 3)?;
        if vm_input.arguments.len() != 3 {
            return Err(BuiltInError::InvalidArguments);
        }
        let acnt_snd = acnt_snd.ok_or(BuiltInError::NilUserAccount)?;
        let token_id = &vm_input.arguments[0];
        check_allowed_to_burn(
            self.global_settings_handler.as_ref(),
            self.roles_handler.as_ref(),
            &*acnt_snd,
            token_id,
            roles::NFT_BURN,
        )?;

        let nonce = nft_nonce(&vm_input.arguments[1])?;
        check_value_length(
            self.enable_epochs_handler.as_ref(),
            &vm_input.arguments[2],
            "dct nft burn",
        )?;
        let quantity = BigUint::from_bytes_be(&vm_input.arguments[2]);
        if quantity.is_zero() {
            return Err(BuiltInError::InvalidArguments);
        }
        let gas_remaining = consume_gas(vm_input.gas_provided, self.gas.func_gas_cost())?;

        let token_key = dct_token_key(token_id);
        let mut token = self
            .nft_storage_handler
            .get_dct_nft_token_on_sender(&*acnt_snd, &token_key, nonce)?;
        check_frozen_and_pause(token_id, &token, self.global_settings_handler.as_ref(), false)?;
        if let Err(err) = debit(&mut token, &quantity) {
            trace!("nft burn of {} nonce {} refused: {}", String::from_utf8_lossy(token_id), nonce, err);
            return Err(err);
        }
        self.nft_storage_handler
            .save_dct_nft_token(acnt_snd, &token_key, nonce, &token)?;

        let mut vm_output = VmOutput::ok(gas_remaining);
        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctNftBurn.as_bytes(),
            token_id,
            nonce,
            &quantity,
            &[],
        );
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas
            .replace(gas_cost.built_in_cost.dct_nft_burn, gas_cost.base_operation_cost);
    }
}
