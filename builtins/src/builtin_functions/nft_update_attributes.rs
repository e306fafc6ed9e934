use std::sync::Arc;

use num_bigint::BigUint;

use super::common::{add_dct_entry_in_vm_output, check_self_call, consume_gas, cost_with_bytes, nft_nonce};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::check;
use crate::config::roles;
use crate::dct::keys::dct_token_key;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{DctRoleHandler, NftStorageHandler};
use crate::vm::{ContractCallInput, VmOutput};

/// `DCTNFTUpdateAttributes@tokenID@nonce@attributes`
pub struct DctNftUpdateAttributes {
    roles_handler: Arc<dyn DctRoleHandler>,
    nft_storage_handler: Arc<dyn NftStorageHandler>,
    gas: GasCostCell,
}

impl DctNftUpdateAttributes {
    pub fn new(
        gas_cost: &GasCost,
        roles_handler: Option<Arc<dyn DctRoleHandler>>,
        nft_storage_handler: Option<Arc<dyn NftStorageHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            roles_handler: check::required(roles_handler, BuiltInError::NilRolesHandler)?,
            nft_storage_handler: check::required(
                nft_storage_handler,
                BuiltInError::NilDctNftStorageHandler,
            )?,
            gas: GasCostCell::new(
                gas_cost.built_in_cost.dct_nft_update_attributes,
                gas_cost.base_operation_cost,
            ),
        })
    }
}

impl BuiltinFunction for DctNftUpdateAttributes {
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
        self.roles_handler
            .check_allowed_to_execute(&*acnt_snd, token_id, roles::NFT_UPDATE_ATTRIBUTES)?;

        let nonce = nft_nonce(&vm_input.arguments[1])?;
        let attributes = &vm_input.arguments[2];
        let cost = self.gas.snapshot();
        let gas_remaining = consume_gas(
            vm_input.gas_provided,
            cost_with_bytes(
                cost.func_gas_cost,
                cost.base.store_per_byte,
                attributes.len() as u64,
            ),
        )?;

        let token_key = dct_token_key(token_id);
        let mut token = self
            .nft_storage_handler
            .get_dct_nft_token_on_sender(&*acnt_snd, &token_key, nonce)?;
        let metadata = token
            .token_meta_data
            .as_mut()
            .ok_or(BuiltInError::NftDoesNotHaveMetadata)?;
        metadata.attributes = attributes.clone();
        self.nft_storage_handler
            .save_dct_nft_token(acnt_snd, &token_key, nonce, &token)?;

        let mut vm_output = VmOutput::ok(gas_remaining);
        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctNftUpdateAttributes.as_bytes(),
            token_id,
            nonce,
            &BigUint::default(),
            &[attributes.as_slice()],
        );
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas.replace(
            gas_cost.built_in_cost.dct_nft_update_attributes,
            gas_cost.base_operation_cost,
        );
    }
}
