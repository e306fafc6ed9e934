// DCT Metadata Modify
// Post-creation edits of NFT metadata for dynamic tokens: royalties, the
// full URI list and the creator address.

use std::sync::Arc;

use num_bigint::BigUint;

use super::common::{
    add_dct_entry_in_vm_output, args_len, check_self_call, consume_gas, cost_with_bytes, nft_nonce,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::check;
use crate::config::{roles, MAX_ROYALTY};
use crate::dct::keys::{bytes_to_u64, dct_token_key};
use crate::dct::MetaData;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{DctRoleHandler, EnableEpochsHandler, NftStorageHandler};
use crate::vm::{ContractCallInput, VmOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaDataModifyKind {
    /// `DCTModifyRoyalties@tokenID@nonce@royalties`
    ModifyRoyalties,
    /// `DCTSetNewURIs@tokenID@nonce@uri...`
    SetNewUris,
    /// `DCTModifyCreator@tokenID@nonce`, the caller becomes the creator
    ModifyCreator,
}

impl MetaDataModifyKind {
    fn name(self) -> BuiltInFunctionName {
        match self {
            MetaDataModifyKind::ModifyRoyalties => BuiltInFunctionName::DctModifyRoyalties,
            MetaDataModifyKind::SetNewUris => BuiltInFunctionName::DctSetNewUris,
            MetaDataModifyKind::ModifyCreator => BuiltInFunctionName::DctModifyCreator,
        }
    }

    fn role(self) -> &'static [u8] {
        match self {
            MetaDataModifyKind::ModifyRoyalties => roles::MODIFY_ROYALTIES,
            MetaDataModifyKind::SetNewUris => roles::SET_NEW_URI,
            MetaDataModifyKind::ModifyCreator => roles::MODIFY_CREATOR,
        }
    }

    fn func_gas_cost(self, gas_cost: &GasCost) -> u64 {
        match self {
            MetaDataModifyKind::ModifyRoyalties => gas_cost.built_in_cost.dct_nft_update_attributes,
            MetaDataModifyKind::SetNewUris => gas_cost.built_in_cost.dct_nft_add_uri,
            MetaDataModifyKind::ModifyCreator => gas_cost.built_in_cost.dct_nft_change_create_owner,
        }
    }

    fn arguments_ok(self, count: usize) -> bool {
        match self {
            MetaDataModifyKind::ModifyRoyalties => count == 3,
            MetaDataModifyKind::SetNewUris => count >= 3,
            MetaDataModifyKind::ModifyCreator => count == 2,
        }
    }
}

pub struct DctMetaDataModify {
    kind: MetaDataModifyKind,
    roles_handler: Arc<dyn DctRoleHandler>,
    nft_storage_handler: Arc<dyn NftStorageHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    gas: GasCostCell,
}

impl DctMetaDataModify {
    pub fn new(
        kind: MetaDataModifyKind,
        gas_cost: &GasCost,
        roles_handler: Option<Arc<dyn DctRoleHandler>>,
        nft_storage_handler: Option<Arc<dyn NftStorageHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            kind,
            roles_handler: check::required(roles_handler, BuiltInError::NilRolesHandler)?,
            nft_storage_handler: check::required(
                nft_storage_handler,
                BuiltInError::NilDctNftStorageHandler,
            )?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            gas: GasCostCell::new(kind.func_gas_cost(gas_cost), gas_cost.base_operation_cost),
        })
    }

    fn apply(&self, metadata: &mut MetaData, vm_input: &ContractCallInput) -> BuiltInResult<()> {
        let args = &vm_input.arguments;
        match self.kind {
            MetaDataModifyKind::ModifyRoyalties => {
                let royalties = bytes_to_u64(&args[2])?;
                if royalties > u64::from(MAX_ROYALTY) {
                    return Err(BuiltInError::InvalidRoyalties {
                        royalties,
                        max: MAX_ROYALTY,
                    });
                }
                metadata.royalties = royalties as u32;
            }
            MetaDataModifyKind::SetNewUris => metadata.uris = args[2..].to_vec(),
            MetaDataModifyKind::ModifyCreator => metadata.creator = vm_input.caller_addr.clone(),
        }
        Ok(())
    }
}

impl BuiltinFunction for DctMetaDataModify {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_self_call(vm_input, 2)?;
        if !self.kind.arguments_ok(vm_input.arguments.len()) {
            return Err(BuiltInError::InvalidArguments);
        }
        let acnt_snd = acnt_snd.ok_or(BuiltInError::NilUserAccount)?;
        let token_id = &vm_input.arguments[0];
        self.roles_handler
            .check_allowed_to_execute(&*acnt_snd, token_id, self.kind.role())?;
        let nonce = nft_nonce(&vm_input.arguments[1])?;

        let cost = self.gas.snapshot();
        let stored_bytes = args_len(&vm_input.arguments[2..]);
        let gas_remaining = consume_gas(
            vm_input.gas_provided,
            cost_with_bytes(cost.func_gas_cost, cost.base.store_per_byte, stored_bytes),
        )?;

        let token_key = dct_token_key(token_id);
        let mut token = self
            .nft_storage_handler
            .get_dct_nft_token_on_sender(&*acnt_snd, &token_key, nonce)?;
        let metadata = token
            .token_meta_data
            .as_mut()
            .ok_or(BuiltInError::NftDoesNotHaveMetadata)?;
        self.apply(metadata, vm_input)?;
        self.nft_storage_handler
            .save_dct_nft_token(acnt_snd, &token_key, nonce, &token)?;

        let mut vm_output = VmOutput::ok(gas_remaining);
        let extra: Vec<&[u8]> = vm_input.arguments[2..].iter().map(Vec::as_slice).collect();
        add_dct_entry_in_vm_output(
            &mut vm_output,
            self.kind.name().as_bytes(),
            token_id,
            nonce,
            &BigUint::default(),
            &extra,
        );
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas
            .replace(self.kind.func_gas_cost(gas_cost), gas_cost.base_operation_cost);
    }

    fn is_active(&self) -> bool {
        self.enable_epochs_handler.is_dynamic_dct_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin_functions::DctDataStorage;
    use crate::dct::keys::dct_nft_token_key;
    use crate::dct::{DCToken, JsonMarshalizer, TokenType};
    use crate::gas::filled_gas_schedule;
    use crate::mock::{user_address, EnableEpochsHandlerStub, MemoryAccount, RoleHandlerStub};

    fn new_fn(kind: MetaDataModifyKind, epochs: EnableEpochsHandlerStub) -> DctMetaDataModify {
        let gas_cost = GasCost::from_schedule(&filled_gas_schedule(1)).unwrap();
        DctMetaDataModify::new(
            kind,
            &gas_cost,
            Some(Arc::new(RoleHandlerStub::allow_all())),
            Some(Arc::new(DctDataStorage::new(Some(Arc::new(JsonMarshalizer))).unwrap())),
            Some(Arc::new(epochs)),
        )
        .unwrap()
    }

    fn holder() -> MemoryAccount {
        let account = MemoryAccount::new(&user_address(1));
        account.put_token(
            &dct_nft_token_key(&dct_token_key(b"NFT"), 1),
            &DCToken {
                token_type: TokenType::NonFungible,
                value: BigUint::from(1u8),
                token_meta_data: Some(MetaData {
                    nonce: 1,
                    creator: user_address(9),
                    royalties: 100,
                    uris: vec![b"old".to_vec()],
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        account
    }

    fn input(extra: Vec<Vec<u8>>) -> ContractCallInput {
        let mut arguments = vec![b"NFT".to_vec(), vec![1]];
        arguments.extend(extra);
        ContractCallInput {
            caller_addr: user_address(1),
            recipient_addr: user_address(1),
            arguments,
            gas_provided: 50,
            ..Default::default()
        }
    }

    fn metadata(account: &MemoryAccount) -> MetaData {
        account
            .token(&dct_nft_token_key(&dct_token_key(b"NFT"), 1))
            .unwrap()
            .token_meta_data
            .unwrap()
    }

    #[test]
    fn test_each_kind_edits_its_field() {
        let epochs = EnableEpochsHandlerStub::all_enabled();
        let mut account = holder();

        new_fn(MetaDataModifyKind::ModifyRoyalties, epochs.clone())
            .process_builtin_function(Some(&mut account), None, &input(vec![vec![0x03, 0xe8]]))
            .unwrap();
        assert_eq!(metadata(&account).royalties, 1_000);

        new_fn(MetaDataModifyKind::SetNewUris, epochs.clone())
            .process_builtin_function(Some(&mut account), None, &input(vec![b"x".to_vec(), b"y".to_vec()]))
            .unwrap();
        assert_eq!(metadata(&account).uris, vec![b"x".to_vec(), b"y".to_vec()]);

        new_fn(MetaDataModifyKind::ModifyCreator, epochs)
            .process_builtin_function(Some(&mut account), None, &input(vec![]))
            .unwrap();
        assert_eq!(metadata(&account).creator, user_address(1));
    }

    #[test]
    fn test_royalties_above_max_rejected() {
        let mut account = holder();
        let err = new_fn(MetaDataModifyKind::ModifyRoyalties, EnableEpochsHandlerStub::all_enabled())
            .process_builtin_function(Some(&mut account), None, &input(vec![vec![0x27, 0x11]]))
            .unwrap_err();
        assert!(matches!(err, BuiltInError::InvalidRoyalties { .. }));
        assert_eq!(metadata(&account).royalties, 100);
    }

    #[test]
    fn test_gated_by_dynamic_flag() {
        assert!(!new_fn(MetaDataModifyKind::ModifyCreator, EnableEpochsHandlerStub::default()).is_active());
        assert!(new_fn(MetaDataModifyKind::ModifyCreator, EnableEpochsHandlerStub::all_enabled()).is_active());
    }
}
