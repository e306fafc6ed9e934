// DCT NFT Create
// Mints a new nonce of a non-fungible or semi-fungible token on the
// creator's account. The creator needs the create role, and the add
// quantity role as well when minting more than one unit.

use std::sync::Arc;

use log::debug;
use num_bigint::BigUint;
use num_traits::Zero;

use super::common::{
    add_dct_entry_in_vm_output, args_len, check_self_call, check_value_length, consume_gas,
    cost_with_bytes,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::{AccountDataHandler, UserAccountHandler};
use crate::check;
use crate::config::{roles, MAX_ROYALTY};
use crate::dct::keys::{bytes_to_u64, dct_nonce_key, dct_token_key, nonce_to_bytes};
use crate::dct::{DCToken, Marshalizer, MetaData, TokenType};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{DctRoleHandler, EnableEpochsHandler, NftStorageHandler};
use crate::vm::{ContractCallInput, VmOutput};

/// `tokenID, quantity, name, royalties, hash, attributes, uri...`
const MIN_ARGUMENTS_NFT_CREATE: usize = 7;

pub struct DctNftCreate {
    marshaller: Arc<dyn Marshalizer>,
    roles_handler: Arc<dyn DctRoleHandler>,
    nft_storage_handler: Arc<dyn NftStorageHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    gas: GasCostCell,
}

impl DctNftCreate {
    pub fn new(
        gas_cost: &GasCost,
        marshaller: Option<Arc<dyn Marshalizer>>,
        roles_handler: Option<Arc<dyn DctRoleHandler>>,
        nft_storage_handler: Option<Arc<dyn NftStorageHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
            roles_handler: check::required(roles_handler, BuiltInError::NilRolesHandler)?,
            nft_storage_handler: check::required(
                nft_storage_handler,
                BuiltInError::NilDctNftStorageHandler,
            )?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            gas: GasCostCell::new(
                gas_cost.built_in_cost.dct_nft_create,
                gas_cost.base_operation_cost,
            ),
        })
    }

    fn latest_nonce(account: &dyn UserAccountHandler, token_id: &[u8]) -> BuiltInResult<u64> {
        match account.retrieve_value(&dct_nonce_key(token_id))? {
            Some(bytes) => bytes_to_u64(&bytes),
            None => Ok(0),
        }
    }
}

impl BuiltinFunction for DctNftCreate {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        // Step 1: Input validation
        check_self_call(vm_input, MIN_ARGUMENTS_NFT_CREATE)?;
        let acnt_snd = acnt_snd.ok_or(BuiltInError::NilUserAccount)?;
        let args = &vm_input.arguments;
        let token_id = &args[0];

        check_value_length(self.enable_epochs_handler.as_ref(), &args[1], "dct nft create")?;
        let quantity = BigUint::from_bytes_be(&args[1]);
        if quantity.is_zero() {
            return Err(BuiltInError::InvalidArguments);
        }

        // Step 2: Authorization
        self.roles_handler
            .check_allowed_to_execute(&*acnt_snd, token_id, roles::NFT_CREATE)?;
        if quantity > BigUint::from(1u8) {
            self.roles_handler
                .check_allowed_to_execute(&*acnt_snd, token_id, roles::NFT_ADD_QUANTITY)?;
        }

        let royalties = bytes_to_u64(&args[3])?;
        if royalties > u64::from(MAX_ROYALTY) {
            return Err(BuiltInError::InvalidRoyalties {
                royalties,
                max: MAX_ROYALTY,
            });
        }

        // Step 3: Gas
        let cost = self.gas.snapshot();
        let total_cost = cost_with_bytes(
            cost.func_gas_cost,
            cost.base.store_per_byte,
            args_len(&args[2..]),
        );
        let gas_remaining = consume_gas(vm_input.gas_provided, total_cost)?;

        // Step 4: Build and persist the new nonce
        let nonce = Self::latest_nonce(&*acnt_snd, token_id)?
            .checked_add(1)
            .ok_or(BuiltInError::InvalidNonce)?;
        let token_type = if quantity == BigUint::from(1u8) {
            TokenType::NonFungible
        } else {
            TokenType::SemiFungible
        };
        let token = DCToken {
            token_type,
            value: quantity.clone(),
            token_meta_data: Some(MetaData {
                nonce,
                name: args[2].clone(),
                creator: vm_input.caller_addr.clone(),
                royalties: royalties as u32,
                hash: args[4].clone(),
                attributes: args[5].clone(),
                uris: args[6..].to_vec(),
            }),
            ..Default::default()
        };
        let marshalled = self.marshaller.marshal_token(&token)?;

        // The nonce is reserved before the record lands so a failed write
        // never leaves a record above the latest nonce.
        let nonce_key = dct_nonce_key(token_id);
        acnt_snd.save_key_value(&nonce_key, &nonce_to_bytes(nonce))?;
        let token_key = dct_token_key(token_id);
        if let Err(err) = self
            .nft_storage_handler
            .save_dct_nft_token(&mut *acnt_snd, &token_key, nonce, &token)
        {
            acnt_snd.save_key_value(&nonce_key, &nonce_to_bytes(nonce - 1))?;
            return Err(err);
        }

        // Step 5: Output
        let mut vm_output = VmOutput::ok(gas_remaining);
        vm_output.return_data.push(nonce_to_bytes(nonce));
        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctNftCreate.as_bytes(),
            token_id,
            nonce,
            &quantity,
            &[marshalled.as_slice()],
        );

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "created {} nonce {} quantity {}",
                String::from_utf8_lossy(token_id),
                nonce,
                quantity
            );
        }
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas.replace(
            gas_cost.built_in_cost.dct_nft_create,
            gas_cost.base_operation_cost,
        );
    }
}
