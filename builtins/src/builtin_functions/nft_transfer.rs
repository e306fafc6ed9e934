// DCT NFT Transfer
// The sender runs `DCTNFTTransfer@tokenID@nonce@quantity@destination` on
// itself. The destination receives the same call with the destination
// argument replaced by the marshalled record, so metadata travels along
// with the quantity across shards.

use std::sync::Arc;

use log::trace;
use num_bigint::BigUint;
use num_traits::Zero;
use parking_lot::RwLock;

use super::common::{
    add_dct_entry_in_vm_output, build_data_field, check_call_value, check_frozen_and_pause,
    check_limited_transfer, check_payable, check_value_length, consume_gas, debit,
    must_verify_payable, nft_nonce, restore_slots, StoredSlot,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::{AccountsAdapter, UserAccountHandler};
use crate::check;
use crate::config::{
    is_smart_contract_address, ADDRESS_LEN, METACHAIN_SHARD_ID, MIN_LEN_ARGUMENTS_DCT_NFT_TRANSFER,
};
use crate::dct::keys::{dct_nft_token_key, dct_token_key};
use crate::dct::{DCToken, Marshalizer};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{
    DisabledPayableHandler, EnableEpochsHandler, GlobalSettingsHandler, NftStorageHandler,
    PayableHandler, ShardCoordinator,
};
use crate::vm::{CallType, ContractCallInput, OutputTransfer, VmOutput};

pub struct DctNftTransfer {
    marshaller: Arc<dyn Marshalizer>,
    global_settings_handler: Arc<dyn GlobalSettingsHandler>,
    accounts: Arc<dyn AccountsAdapter>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    nft_storage_handler: Arc<dyn NftStorageHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    payable_handler: RwLock<Arc<dyn PayableHandler>>,
    gas: GasCostCell,
}

impl DctNftTransfer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        func_gas_cost: u64,
        marshaller: Option<Arc<dyn Marshalizer>>,
        global_settings_handler: Option<Arc<dyn GlobalSettingsHandler>>,
        accounts: Option<Arc<dyn AccountsAdapter>>,
        shard_coordinator: Option<Arc<dyn ShardCoordinator>>,
        nft_storage_handler: Option<Arc<dyn NftStorageHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
            global_settings_handler: check::required(
                global_settings_handler,
                BuiltInError::NilGlobalSettingsHandler,
            )?,
            accounts: check::required(accounts, BuiltInError::NilAccountsAdapter)?,
            shard_coordinator: check::required(shard_coordinator, BuiltInError::NilShardCoordinator)?,
            nft_storage_handler: check::required(
                nft_storage_handler,
                BuiltInError::NilDctNftStorageHandler,
            )?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            payable_handler: RwLock::new(Arc::new(DisabledPayableHandler)),
            gas: GasCostCell::with_func_cost(func_gas_cost),
        })
    }

    fn payable_handler(&self) -> Arc<dyn PayableHandler> {
        self.payable_handler.read().clone()
    }

    /// Destination record after receiving `received`, not yet persisted
    fn credited_record(
        &self,
        destination: &dyn UserAccountHandler,
        token_key: &[u8],
        nonce: u64,
        received: &DCToken,
    ) -> BuiltInResult<DCToken> {
        let (mut token, is_new) = self
            .nft_storage_handler
            .get_dct_nft_token_on_destination(destination, token_key, nonce)?;
        if is_new {
            token.token_type = received.token_type;
            token.token_meta_data = received.token_meta_data.clone();
        }
        token.value += &received.value;
        Ok(token)
    }

    fn process_on_sender(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let args = &vm_input.arguments;
        let acnt_snd = acnt_snd.ok_or(BuiltInError::NilUserAccount)?;
        let token_id = &args[0];
        let nonce = nft_nonce(&args[1])?;
        check_value_length(self.enable_epochs_handler.as_ref(), &args[2], "dct nft transfer")?;
        let quantity = BigUint::from_bytes_be(&args[2]);
        if quantity.is_zero() {
            return Err(BuiltInError::InvalidArguments);
        }

        let destination = &args[3];
        if destination.len() != ADDRESS_LEN {
            return Err(BuiltInError::InvalidAddressLength);
        }
        if destination.as_slice() == acnt_snd.address() {
            return Err(BuiltInError::InvalidRcvAddr);
        }
        let destination_shard = self.shard_coordinator.compute_id(destination);
        if destination_shard == METACHAIN_SHARD_ID {
            return Err(BuiltInError::InvalidRcvAddr);
        }
        check_limited_transfer(
            self.global_settings_handler.as_ref(),
            &vm_input.caller_addr,
            destination,
            token_id,
        )?;
        let mut gas_remaining = consume_gas(vm_input.gas_provided, self.gas.func_gas_cost())?;

        // Step 1: Sender record
        let token_key = dct_token_key(token_id);
        let mut sender_token = self
            .nft_storage_handler
            .get_dct_nft_token_on_sender(&*acnt_snd, &token_key, nonce)?;
        check_frozen_and_pause(token_id, &sender_token, self.global_settings_handler.as_ref(), false)?;
        debit(&mut sender_token, &quantity)?;

        let transferred = DCToken {
            token_type: sender_token.token_type,
            value: quantity.clone(),
            token_meta_data: sender_token.token_meta_data.clone(),
            ..Default::default()
        };
        let marshalled = self.marshaller.marshal_token(&transferred)?;

        // Step 2: Same shard destinations are credited right away
        let has_call_after = args.len() > MIN_LEN_ARGUMENTS_DCT_NFT_TRANSFER;
        let mut destination_update = None;
        if destination_shard == self.shard_coordinator.self_id() {
            let is_direct_call_to_contract = is_smart_contract_address(destination)
                && !has_call_after
                && vm_input.call_type != CallType::AsynchronousCall
                && !vm_input.return_call_after_error;
            if is_direct_call_to_contract {
                check_payable(self.payable_handler().as_ref(), &vm_input.caller_addr, destination)?;
            }
            let destination_account = self.accounts.load_account(destination)?;
            let record =
                self.credited_record(&*destination_account, &token_key, nonce, &transferred)?;
            destination_update = Some((destination_account, record));
        }

        // Step 3: Persist, the sender record is put back if the credit fails
        let previous = StoredSlot::capture(&*acnt_snd, &dct_nft_token_key(&token_key, nonce))?;
        self.nft_storage_handler
            .save_dct_nft_token(&mut *acnt_snd, &token_key, nonce, &sender_token)?;
        if let Some((mut destination_account, record)) = destination_update {
            let credited = self
                .nft_storage_handler
                .save_dct_nft_token(&mut *destination_account, &token_key, nonce, &record)
                .and_then(|()| {
                    self.accounts
                        .save_account(destination_account)
                        .map_err(BuiltInError::from)
                });
            if let Err(err) = credited {
                restore_slots(&mut *acnt_snd, &[previous])?;
                return Err(err);
            }
        }

        // Step 4: Output
        let mut forwarded = vec![token_id.clone(), args[1].clone(), args[2].clone(), marshalled];
        forwarded.extend_from_slice(&args[MIN_LEN_ARGUMENTS_DCT_NFT_TRANSFER..]);
        let is_sc_call_after = is_smart_contract_address(destination) && has_call_after;
        let gas_limit = if is_sc_call_after {
            std::mem::take(&mut gas_remaining)
        } else {
            0
        };

        let mut vm_output = VmOutput::ok(gas_remaining);
        vm_output.add_output_transfer(
            destination,
            OutputTransfer {
                value: BigUint::default(),
                gas_limit,
                data: build_data_field(BuiltInFunctionName::DctNftTransfer.as_str(), &forwarded),
                call_type: vm_input.call_type,
                sender_address: vm_input.caller_addr.clone(),
            },
        );
        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctNftTransfer.as_bytes(),
            token_id,
            nonce,
            &quantity,
            &[destination.as_slice()],
        );
        Ok(vm_output)
    }

    fn process_on_destination(
        &self,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let args = &vm_input.arguments;
        let acnt_dst = acnt_dst.ok_or(BuiltInError::NilUserAccount)?;
        let token_id = &args[0];
        let nonce = nft_nonce(&args[1])?;
        let quantity = BigUint::from_bytes_be(&args[2]);
        let mut received = self.marshaller.unmarshal_token(&args[3])?;
        received.value = quantity.clone();

        if must_verify_payable(vm_input, MIN_LEN_ARGUMENTS_DCT_NFT_TRANSFER) {
            check_payable(
                self.payable_handler().as_ref(),
                &vm_input.caller_addr,
                &vm_input.recipient_addr,
            )?;
        }
        check_frozen_and_pause(
            token_id,
            &DCToken::default(),
            self.global_settings_handler.as_ref(),
            vm_input.return_call_after_error,
        )?;

        let token_key = dct_token_key(token_id);
        let record = self.credited_record(&*acnt_dst, &token_key, nonce, &received)?;
        self.nft_storage_handler
            .save_dct_nft_token(acnt_dst, &token_key, nonce, &record)?;
        trace!(
            "received {} of {} nonce {}",
            quantity,
            String::from_utf8_lossy(token_id),
            nonce
        );

        let mut vm_output = VmOutput::ok(vm_input.gas_provided);
        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctNftTransfer.as_bytes(),
            token_id,
            nonce,
            &quantity,
            &[vm_input.recipient_addr.as_slice()],
        );
        Ok(vm_output)
    }
}

impl BuiltinFunction for DctNftTransfer {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() < MIN_LEN_ARGUMENTS_DCT_NFT_TRANSFER {
            return Err(BuiltInError::InvalidArguments);
        }
        if vm_input.caller_addr == vm_input.recipient_addr {
            return self.process_on_sender(acnt_snd, vm_input);
        }
        self.process_on_destination(acnt_dst, vm_input)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas.replace(
            gas_cost.built_in_cost.dct_nft_transfer,
            gas_cost.base_operation_cost,
        );
    }

    fn set_payable_handler(&self, handler: Arc<dyn PayableHandler>) {
        *self.payable_handler.write() = handler;
    }
}
