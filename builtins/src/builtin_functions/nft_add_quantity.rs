use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::Zero;

use super::common::{
    add_dct_entry_in_vm_output, check_frozen_and_pause, check_self_call, check_value_length,
    consume_gas, nft_nonce,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::check;
use crate::config::roles;
use crate::dct::keys::dct_token_key;
use crate::dct::TokenType;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{DctRoleHandler, EnableEpochsHandler, GlobalSettingsHandler, NftStorageHandler};
use crate::vm::{ContractCallInput, VmOutput};

/// `DCTNFTAddQuantity@tokenID@nonce@quantity` on a semi-fungible token
pub struct DctNftAddQuantity {
    global_settings_handler: Arc<dyn GlobalSettingsHandler>,
    roles_handler: Arc<dyn DctRoleHandler>,
    nft_storage_handler: Arc<dyn NftStorageHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    gas: GasCostCell,
}

impl DctNftAddQuantity {
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

impl BuiltinFunction for DctNftAddQuantity {
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
            .check_allowed_to_execute(&*acnt_snd, token_id, roles::NFT_ADD_QUANTITY)?;

        let nonce = nft_nonce(&vm_input.arguments[1])?;
        check_value_length(
            self.enable_epochs_handler.as_ref(),
            &vm_input.arguments[2],
            "dct nft add quantity",
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
        if token.token_type == TokenType::NonFungible {
            return Err(BuiltInError::InvalidArguments);
        }
        check_frozen_and_pause(token_id, &token, self.global_settings_handler.as_ref(), false)?;
        token.value += &quantity;
        self.nft_storage_handler
            .save_dct_nft_token(acnt_snd, &token_key, nonce, &token)?;

        let mut vm_output = VmOutput::ok(gas_remaining);
        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctNftAddQuantity.as_bytes(),
            token_id,
            nonce,
            &quantity,
            &[],
        );
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas.replace(
            gas_cost.built_in_cost.dct_nft_add_quantity,
            gas_cost.base_operation_cost,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin_functions::DctDataStorage;
    use crate::dct::keys::dct_nft_token_key;
    use crate::dct::{DCToken, JsonMarshalizer, MetaData};
    use crate::mock::{user_address, EnableEpochsHandlerStub, GlobalSettingsHandlerStub, MemoryAccount, RoleHandlerStub};

    fn new_fn(settings: GlobalSettingsHandlerStub) -> DctNftAddQuantity {
        DctNftAddQuantity::new(
            2,
            Some(Arc::new(settings)),
            Some(Arc::new(RoleHandlerStub::allow_all())),
            Some(Arc::new(DctDataStorage::new(Some(Arc::new(JsonMarshalizer))).unwrap())),
            Some(Arc::new(EnableEpochsHandlerStub::all_enabled())),
        )
        .unwrap()
    }

    fn holder(token_type: TokenType) -> MemoryAccount {
        let account = MemoryAccount::new(&user_address(1));
        let token = DCToken {
            token_type,
            value: BigUint::from(3u8),
            token_meta_data: Some(MetaData {
                nonce: 1,
                ..Default::default()
            }),
            ..Default::default()
        };
        account.put_token(&dct_nft_token_key(&dct_token_key(b"SFT"), 1), &token);
        account
    }

    fn input(nonce: u8) -> ContractCallInput {
        ContractCallInput {
            caller_addr: user_address(1),
            recipient_addr: user_address(1),
            arguments: vec![b"SFT".to_vec(), vec![nonce], vec![4]],
            gas_provided: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_quantity() {
        let mut account = holder(TokenType::SemiFungible);
        let output = new_fn(GlobalSettingsHandlerStub::default())
            .process_builtin_function(Some(&mut account), None, &input(1))
            .unwrap();
        assert_eq!(output.gas_remaining, 8);
        let token = account.token(&dct_nft_token_key(&dct_token_key(b"SFT"), 1)).unwrap();
        assert_eq!(token.value, BigUint::from(7u8));
    }

    #[test]
    fn test_rejects_nft_zero_nonce_and_paused() {
        let add = new_fn(GlobalSettingsHandlerStub::default());
        let mut nft = holder(TokenType::NonFungible);
        assert!(matches!(
            add.process_builtin_function(Some(&mut nft), None, &input(1)),
            Err(BuiltInError::InvalidArguments)
        ));

        let mut sft = holder(TokenType::SemiFungible);
        assert!(matches!(
            add.process_builtin_function(Some(&mut sft), None, &input(0)),
            Err(BuiltInError::InvalidNonce)
        ));

        let paused = new_fn(GlobalSettingsHandlerStub {
            paused: true,
            ..Default::default()
        });
        assert!(matches!(
            paused.process_builtin_function(Some(&mut sft), None, &input(1)),
            Err(BuiltInError::DctTokenIsPaused)
        ));
    }
}
