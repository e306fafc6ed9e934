// DCT Transfer
// Fungible transfer executed in two halves: debit on the sender shard,
// credit on the destination shard. Both halves run in one call when the
// accounts share a shard.

use std::sync::Arc;

use log::trace;
use num_bigint::BigUint;
use num_traits::Zero;
use parking_lot::RwLock;

use super::common::{
    add_dct_entry_in_vm_output, build_data_field, check_call_value, check_limited_transfer,
    check_payable, check_value_length, consume_gas, debit, load_fungible, must_verify_payable,
    restore_slots, save_dct_data, StoredSlot,
};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::check;
use crate::config::{is_dct_sc_address, is_smart_contract_address, METACHAIN_SHARD_ID, MIN_LEN_ARGUMENTS_DCT_TRANSFER};
use crate::dct::Marshalizer;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{
    DisabledPayableHandler, EnableEpochsHandler, GlobalSettingsHandler, PayableHandler,
    ShardCoordinator,
};
use crate::vm::{ContractCallInput, OutputTransfer, VmOutput};

/// `DCTTransfer@tokenID@amount[@function@args...]`
pub struct DctTransfer {
    marshaller: Arc<dyn Marshalizer>,
    global_settings_handler: Arc<dyn GlobalSettingsHandler>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    payable_handler: RwLock<Arc<dyn PayableHandler>>,
    gas: GasCostCell,
}

impl DctTransfer {
    pub fn new(
        func_gas_cost: u64,
        marshaller: Option<Arc<dyn Marshalizer>>,
        global_settings_handler: Option<Arc<dyn GlobalSettingsHandler>>,
        shard_coordinator: Option<Arc<dyn ShardCoordinator>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
            global_settings_handler: check::required(
                global_settings_handler,
                BuiltInError::NilGlobalSettingsHandler,
            )?,
            shard_coordinator: check::required(shard_coordinator, BuiltInError::NilShardCoordinator)?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            payable_handler: RwLock::new(Arc::new(DisabledPayableHandler)),
            gas: GasCostCell::with_func_cost(func_gas_cost),
        })
    }

    pub fn func_gas_cost(&self) -> u64 {
        self.gas.func_gas_cost()
    }

    fn check_receiver_shard(&self, recipient: &[u8]) -> BuiltInResult<()> {
        // only the system smart contract accepts tokens on the metachain
        if self.shard_coordinator.compute_id(recipient) == METACHAIN_SHARD_ID
            && !is_dct_sc_address(recipient)
        {
            return Err(BuiltInError::InvalidRcvAddr);
        }
        Ok(())
    }
}

impl BuiltinFunction for DctTransfer {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        // Step 1: Input validation
        check_call_value(vm_input)?;
        if vm_input.arguments.len() < MIN_LEN_ARGUMENTS_DCT_TRANSFER {
            return Err(BuiltInError::InvalidArguments);
        }
        let token_id = &vm_input.arguments[0];
        check_value_length(
            self.enable_epochs_handler.as_ref(),
            &vm_input.arguments[1],
            "dct transfer",
        )?;
        let value = BigUint::from_bytes_be(&vm_input.arguments[1]);
        if value.is_zero() {
            return Err(BuiltInError::NegativeValue);
        }
        if vm_input.caller_addr == vm_input.recipient_addr {
            return Err(BuiltInError::InvalidRcvAddr);
        }
        self.check_receiver_shard(&vm_input.recipient_addr)?;
        check_limited_transfer(
            self.global_settings_handler.as_ref(),
            &vm_input.caller_addr,
            &vm_input.recipient_addr,
            token_id,
        )?;

        if acnt_snd.is_none() && acnt_dst.is_none() {
            return Err(BuiltInError::NilUserAccount);
        }

        let cost = self.gas.snapshot();
        let is_return_with_error = vm_input.return_call_after_error;

        // Step 2: Compute both sides before writing anything
        let mut gas_remaining = vm_input.gas_provided;
        let mut sender_update = None;
        if let Some(sender) = acnt_snd.as_deref() {
            gas_remaining = consume_gas(vm_input.gas_provided, cost.func_gas_cost)?;
            let (key, mut token) = load_fungible(
                sender,
                token_id,
                self.marshaller.as_ref(),
                self.global_settings_handler.as_ref(),
                is_return_with_error,
            )?;
            debit(&mut token, &value)?;
            sender_update = Some((key, token));
        }

        let mut destination_update = None;
        if let Some(destination) = acnt_dst.as_deref() {
            if must_verify_payable(vm_input, MIN_LEN_ARGUMENTS_DCT_TRANSFER) {
                let payable_handler = self.payable_handler.read().clone();
                check_payable(payable_handler.as_ref(), &vm_input.caller_addr, &vm_input.recipient_addr)?;
            }
            let (key, mut token) = load_fungible(
                destination,
                token_id,
                self.marshaller.as_ref(),
                self.global_settings_handler.as_ref(),
                is_return_with_error,
            )?;
            token.value += &value;
            destination_update = Some((key, token));
        }

        // Step 3: Persist, undoing the debit when the credit cannot be written
        let mut debited = None;
        if let (Some(sender), Some((key, token))) = (acnt_snd, sender_update) {
            let previous = StoredSlot::capture(&*sender, &key)?;
            save_dct_data(&mut *sender, &key, &token, self.marshaller.as_ref())?;
            debited = Some((sender, previous));
        }
        let credited_locally = destination_update.is_some();
        if let (Some(destination), Some((key, token))) = (acnt_dst, destination_update) {
            if let Err(err) = save_dct_data(destination, &key, &token, self.marshaller.as_ref()) {
                if let Some((sender, previous)) = debited {
                    restore_slots(sender, &[previous])?;
                }
                return Err(err);
            }
        }

        // Step 4: Output
        let mut vm_output = VmOutput::ok(gas_remaining);
        let is_sc_call_after = is_smart_contract_address(&vm_input.recipient_addr)
            && vm_input.arguments.len() > MIN_LEN_ARGUMENTS_DCT_TRANSFER;
        if !credited_locally {
            // destination lives on another shard, forward the credit
            let gas_limit = if is_sc_call_after { vm_output.gas_remaining } else { 0 };
            if is_sc_call_after {
                vm_output.gas_remaining = 0;
            }
            vm_output.add_output_transfer(
                &vm_input.recipient_addr,
                OutputTransfer {
                    value: BigUint::default(),
                    gas_limit,
                    data: build_data_field(
                        BuiltInFunctionName::DctTransfer.as_str(),
                        &vm_input.arguments,
                    ),
                    call_type: vm_input.call_type,
                    sender_address: vm_input.caller_addr.clone(),
                },
            );
        }

        add_dct_entry_in_vm_output(
            &mut vm_output,
            BuiltInFunctionName::DctTransfer.as_bytes(),
            token_id,
            0,
            &value,
            &[vm_input.recipient_addr.as_slice()],
        );
        trace!(
            "dct transfer of {} {} to {}",
            value,
            String::from_utf8_lossy(token_id),
            hex::encode(&vm_input.recipient_addr)
        );

        Ok(vm_output)
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.gas
            .replace(gas_cost.built_in_cost.dct_transfer, gas_cost.base_operation_cost);
    }

    fn set_payable_handler(&self, handler: Arc<dyn PayableHandler>) {
        *self.payable_handler.write() = handler;
    }
}
