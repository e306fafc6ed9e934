// Multi DCT NFT Transfer
// Sender side: `MultiDCTNFTTransfer@destination@count@(tokenID@nonce@quantity)...`
// executed on the sender itself. Destination side receives
// `count@(tokenID@nonce@value)...` where value is the quantity for fungible
// entries (nonce zero) and the marshalled record for NFT entries.
//
// Every entry is staged in memory first; nothing is written unless the
// whole batch validates.

use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use log::debug;
use num_bigint::BigUint;
use num_traits::Zero;
use parking_lot::RwLock;

use super::common::{
    add_dct_entry_in_vm_output, build_data_field, check_call_value, check_frozen_and_pause,
    check_limited_transfer, check_payable, check_value_length, consume_gas, debit, load_fungible,
    must_verify_payable, restore_slots, save_dct_data, StoredSlot,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::{AccountsAdapter, UserAccountHandler};
use crate::check;
use crate::config::{
    is_smart_contract_address, ADDRESS_LEN, METACHAIN_SHARD_ID, MIN_LEN_ARGUMENTS_MULTI_TRANSFER,
};
use crate::dct::keys::{big_to_bytes, bytes_to_u64, dct_nft_token_key, dct_token_key, nonce_to_bytes};
use crate::dct::{DCToken, Marshalizer};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{
    DisabledPayableHandler, EnableEpochsHandler, GlobalSettingsHandler, NftStorageHandler,
    PayableHandler, ShardCoordinator,
};
use crate::vm::{CallType, ContractCallInput, OutputTransfer, VmOutput};

const ARGUMENTS_PER_ENTRY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Sender,
    Destination,
}

struct StagedRecord {
    token_key: Vec<u8>,
    nonce: u64,
    token: DCToken,
}

type Staged = IndexMap<Vec<u8>, StagedRecord>;

/// One `(tokenID, nonce, quantity)` entry of a batch
struct TransferEntry<'a> {
    token_id: &'a [u8],
    nonce: u64,
    quantity: BigUint,
    value_argument: &'a [u8],
}

pub struct DctNftMultiTransfer {
    marshaller: Arc<dyn Marshalizer>,
    global_settings_handler: Arc<dyn GlobalSettingsHandler>,
    accounts: Arc<dyn AccountsAdapter>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    nft_storage_handler: Arc<dyn NftStorageHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    payable_handler: RwLock<Arc<dyn PayableHandler>>,
    gas: GasCostCell,
}

impl DctNftMultiTransfer {
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

    /// Parse the entry count at `count_index` and the entries following it.
    /// Returns the entries and the index of the first call-after argument.
    fn parse_entries<'a>(
        &self,
        arguments: &'a [Vec<u8>],
        count_index: usize,
    ) -> BuiltInResult<(Vec<TransferEntry<'a>>, usize)> {
        let count = bytes_to_u64(&arguments[count_index])? as usize;
        let first = count_index + 1;
        let end = count
            .checked_mul(ARGUMENTS_PER_ENTRY)
            .and_then(|len| len.checked_add(first))
            .ok_or(BuiltInError::InvalidArguments)?;
        if count == 0 || arguments.len() < end {
            return Err(BuiltInError::InvalidArguments);
        }

        let mut entries = Vec::with_capacity(count);
        for chunk in arguments[first..end].chunks(ARGUMENTS_PER_ENTRY) {
            let nonce = bytes_to_u64(&chunk[1])?;
            let quantity = if nonce == 0 {
                check_value_length(self.enable_epochs_handler.as_ref(), &chunk[2], "dct multi transfer")?;
                let quantity = BigUint::from_bytes_be(&chunk[2]);
                if quantity.is_zero() {
                    return Err(BuiltInError::NegativeValue);
                }
                quantity
            } else {
                BigUint::default()
            };
            entries.push(TransferEntry {
                token_id: &chunk[0],
                nonce,
                quantity,
                value_argument: &chunk[2],
            });
        }
        Ok((entries, end))
    }

    fn stage<'s>(
        &self,
        staged: &'s mut Staged,
        account: &dyn UserAccountHandler,
        token_id: &[u8],
        nonce: u64,
        side: Side,
        is_return_with_error: bool,
    ) -> BuiltInResult<&'s mut StagedRecord> {
        let token_key = dct_token_key(token_id);
        let key = if nonce == 0 {
            token_key.clone()
        } else {
            dct_nft_token_key(&token_key, nonce)
        };
        match staged.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let token = if nonce == 0 {
                    load_fungible(
                        account,
                        token_id,
                        self.marshaller.as_ref(),
                        self.global_settings_handler.as_ref(),
                        is_return_with_error,
                    )?
                    .1
                } else if side == Side::Sender {
                    let token = self
                        .nft_storage_handler
                        .get_dct_nft_token_on_sender(account, &token_key, nonce)?;
                    check_frozen_and_pause(
                        token_id,
                        &token,
                        self.global_settings_handler.as_ref(),
                        is_return_with_error,
                    )?;
                    token
                } else {
                    self.nft_storage_handler
                        .get_dct_nft_token_on_destination(account, &token_key, nonce)?
                        .0
                };
                Ok(entry.insert(StagedRecord {
                    token_key,
                    nonce,
                    token,
                }))
            }
        }
    }

    fn credit(
        &self,
        staged: &mut Staged,
        account: &dyn UserAccountHandler,
        token_id: &[u8],
        received: &DCToken,
        nonce: u64,
        is_return_with_error: bool,
    ) -> BuiltInResult<()> {
        let record = self.stage(
            staged,
            account,
            token_id,
            nonce,
            Side::Destination,
            is_return_with_error,
        )?;
        if nonce > 0 && record.token.token_meta_data.is_none() {
            record.token.token_type = received.token_type;
            record.token.token_meta_data = received.token_meta_data.clone();
        }
        record.token.value += &received.value;
        Ok(())
    }

    /// Write every staged record. A failed write puts the records already
    /// written back before the error is returned; on success the previous
    /// slots are handed back so the caller can undo the batch.
    fn persist(
        &self,
        account: &mut dyn UserAccountHandler,
        staged: Staged,
    ) -> BuiltInResult<Vec<StoredSlot>> {
        let slots = staged
            .keys()
            .map(|key| StoredSlot::capture(&*account, key))
            .collect::<BuiltInResult<Vec<_>>>()?;
        for (written, (key, record)) in staged.into_iter().enumerate() {
            let saved = if record.nonce == 0 {
                save_dct_data(&mut *account, &key, &record.token, self.marshaller.as_ref())
            } else {
                self.nft_storage_handler.save_dct_nft_token(
                    &mut *account,
                    &record.token_key,
                    record.nonce,
                    &record.token,
                )
            };
            if let Err(err) = saved {
                restore_slots(&mut *account, &slots[..written])?;
                return Err(err);
            }
        }
        Ok(slots)
    }

    fn process_on_sender(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let acnt_snd = acnt_snd.ok_or(BuiltInError::NilUserAccount)?;
        let args = &vm_input.arguments;
        let destination = &args[0];
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

        let (mut entries, end) = self.parse_entries(args, 1)?;
        let cost = self.gas.func_gas_cost().saturating_mul(entries.len() as u64);
        let mut gas_remaining = consume_gas(vm_input.gas_provided, cost)?;
        let has_call_after = args.len() > end;

        let same_shard = destination_shard == self.shard_coordinator.self_id();
        let mut destination_account = None;
        if same_shard {
            let is_direct_call_to_contract = is_smart_contract_address(destination)
                && !has_call_after
                && vm_input.call_type != CallType::AsynchronousCall
                && !vm_input.return_call_after_error;
            if is_direct_call_to_contract {
                let payable_handler = self.payable_handler.read().clone();
                check_payable(payable_handler.as_ref(), &vm_input.caller_addr, destination)?;
            }
            destination_account = Some(self.accounts.load_account(destination)?);
        }

        // Step 1: Stage every entry
        let mut sender_staged = Staged::new();
        let mut destination_staged = Staged::new();
        let mut forwarded = vec![args[1].clone()];
        for entry in entries.iter_mut() {
            check_limited_transfer(
                self.global_settings_handler.as_ref(),
                &vm_input.caller_addr,
                destination,
                entry.token_id,
            )?;
            let record = self.stage(
                &mut sender_staged,
                &*acnt_snd,
                entry.token_id,
                entry.nonce,
                Side::Sender,
                false,
            )?;

            let transferred = if entry.nonce == 0 {
                debit(&mut record.token, &entry.quantity)?;
                DCToken::fungible(entry.quantity.clone())
            } else {
                check_value_length(
                    self.enable_epochs_handler.as_ref(),
                    entry.value_argument,
                    "dct multi transfer",
                )?;
                entry.quantity = BigUint::from_bytes_be(entry.value_argument);
                if entry.quantity.is_zero() {
                    return Err(BuiltInError::InvalidArguments);
                }
                debit(&mut record.token, &entry.quantity)?;
                DCToken {
                    token_type: record.token.token_type,
                    value: entry.quantity.clone(),
                    token_meta_data: record.token.token_meta_data.clone(),
                    ..Default::default()
                }
            };

            forwarded.push(entry.token_id.to_vec());
            forwarded.push(nonce_to_bytes(entry.nonce));
            if entry.nonce == 0 {
                forwarded.push(big_to_bytes(&entry.quantity));
            } else {
                forwarded.push(self.marshaller.marshal_token(&transferred)?);
            }

            if let Some(destination_account) = destination_account.as_deref() {
                self.credit(
                    &mut destination_staged,
                    destination_account,
                    entry.token_id,
                    &transferred,
                    entry.nonce,
                    false,
                )?;
            }
        }

        // Step 2: Persist
        let debited = self.persist(&mut *acnt_snd, sender_staged)?;
        if let Some(mut destination_account) = destination_account {
            let credited = self
                .persist(&mut *destination_account, destination_staged)
                .and_then(|_| {
                    self.accounts
                        .save_account(destination_account)
                        .map_err(BuiltInError::from)
                });
            if let Err(err) = credited {
                restore_slots(&mut *acnt_snd, &debited)?;
                return Err(err);
            }
        }

        // Step 3: Output
        forwarded.extend_from_slice(&args[end..]);
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
                data: build_data_field(BuiltInFunctionName::MultiDctNftTransfer.as_str(), &forwarded),
                call_type: vm_input.call_type,
                sender_address: vm_input.caller_addr.clone(),
            },
        );
        for entry in &entries {
            add_dct_entry_in_vm_output(
                &mut vm_output,
                BuiltInFunctionName::MultiDctNftTransfer.as_bytes(),
                entry.token_id,
                entry.nonce,
                &entry.quantity,
                &[destination.as_slice()],
            );
        }
        debug!(
            "multi transfer of {} entries to {}",
            entries.len(),
            hex::encode(destination)
        );
        Ok(vm_output)
    }

    fn process_on_destination(
        &self,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let acnt_dst = acnt_dst.ok_or(BuiltInError::NilUserAccount)?;
        let (entries, end) = self.parse_entries(&vm_input.arguments, 0)?;
        if must_verify_payable(vm_input, end) {
            let payable_handler = self.payable_handler.read().clone();
            check_payable(
                payable_handler.as_ref(),
                &vm_input.caller_addr,
                &vm_input.recipient_addr,
            )?;
        }

        let is_return_with_error = vm_input.return_call_after_error;
        let mut staged = Staged::new();
        let mut quantities = Vec::with_capacity(entries.len());
        for entry in &entries {
            let received = if entry.nonce == 0 {
                DCToken::fungible(entry.quantity.clone())
            } else {
                self.marshaller.unmarshal_token(entry.value_argument)?
            };
            self.credit(
                &mut staged,
                &*acnt_dst,
                entry.token_id,
                &received,
                entry.nonce,
                is_return_with_error,
            )?;
            quantities.push(received.value);
        }
        self.persist(acnt_dst, staged)?;

        let mut vm_output = VmOutput::ok(vm_input.gas_provided);
        for (entry, quantity) in entries.iter().zip(&quantities) {
            add_dct_entry_in_vm_output(
                &mut vm_output,
                BuiltInFunctionName::MultiDctNftTransfer.as_bytes(),
                entry.token_id,
                entry.nonce,
                quantity,
                &[vm_input.recipient_addr.as_slice()],
            );
        }
        Ok(vm_output)
    }
}

impl BuiltinFunction for DctNftMultiTransfer {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() < MIN_LEN_ARGUMENTS_MULTI_TRANSFER {
            return Err(BuiltInError::InvalidArguments);
        }
        if vm_input.caller_addr == vm_input.recipient_addr {
            return self.process_on_sender(acnt_snd, vm_input);
        }
        self.process_on_destination(acnt_dst, vm_input)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas.replace(
            gas_cost.built_in_cost.dct_nft_multi_transfer,
            gas_cost.base_operation_cost,
        );
    }

    fn set_payable_handler(&self, handler: Arc<dyn PayableHandler>) {
        *self.payable_handler.write() = handler;
    }
}
