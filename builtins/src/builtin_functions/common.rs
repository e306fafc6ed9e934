//! Validation, balance and output helpers shared by built-in functions.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::account::{AccountDataHandler, UserAccountHandler};
use crate::config::{is_dct_sc_address, is_smart_contract_address, is_system_account_address, DATA_SEPARATOR, MAX_LEN_FOR_DCT_VALUES};
use crate::dct::keys::{big_to_bytes, bytes_to_u64, dct_token_key, nonce_to_bytes};
use crate::dct::{DCToken, Marshalizer, TokenType};
use crate::error::{BuiltInError, BuiltInResult};
use crate::interfaces::{DctRoleHandler, EnableEpochsHandler, GlobalSettingsHandler, PayableHandler};
use crate::vm::{CallType, ContractCallInput, LogEntry, VmOutput};

// ========================================
// Input validation
// ========================================

pub(crate) fn check_call_value(vm_input: &ContractCallInput) -> BuiltInResult<()> {
    if !vm_input.call_value.is_zero() {
        return Err(BuiltInError::BuiltInFunctionCalledWithValue);
    }
    Ok(())
}

/// Validate a local token action `(tokenID, amount)` executed by an account on itself.
///
/// Checks, in order: no attached value, exactly two arguments, caller equal
/// to recipient, sender account present, non-zero amount, enough gas for
/// `func_gas_cost`.
pub fn check_input_arguments_for_local_action(
    acnt_snd: Option<&dyn UserAccountHandler>,
    vm_input: &ContractCallInput,
    func_gas_cost: u64,
) -> BuiltInResult<()> {
    check_call_value(vm_input)?;
    if vm_input.arguments.len() != 2 {
        return Err(BuiltInError::InvalidArguments);
    }
    if vm_input.caller_addr != vm_input.recipient_addr {
        return Err(BuiltInError::InvalidRcvAddr);
    }
    if acnt_snd.is_none() {
        return Err(BuiltInError::NilUserAccount);
    }
    let value = BigUint::from_bytes_be(&vm_input.arguments[1]);
    if value.is_zero() {
        return Err(BuiltInError::NegativeValue);
    }
    if vm_input.gas_provided < func_gas_cost {
        return Err(BuiltInError::NotEnoughGas);
    }
    Ok(())
}

/// Shape of an NFT action an account runs on its own tokens
pub(crate) fn check_self_call(vm_input: &ContractCallInput, min_arguments: usize) -> BuiltInResult<()> {
    check_call_value(vm_input)?;
    if vm_input.arguments.len() < min_arguments {
        return Err(BuiltInError::InvalidArguments);
    }
    if vm_input.caller_addr != vm_input.recipient_addr {
        return Err(BuiltInError::InvalidRcvAddr);
    }
    Ok(())
}

/// Nonce argument of an NFT action, zero addresses the fungible record
pub(crate) fn nft_nonce(argument: &[u8]) -> BuiltInResult<u64> {
    let nonce = bytes_to_u64(argument)?;
    if nonce == 0 {
        return Err(BuiltInError::InvalidNonce);
    }
    Ok(nonce)
}

/// Reject token values longer than the protocol maximum once the flag is active
pub(crate) fn check_value_length(
    enable_epochs_handler: &dyn EnableEpochsHandler,
    value: &[u8],
    operation: &'static str,
) -> BuiltInResult<()> {
    if enable_epochs_handler.is_consistent_tokens_values_length_check_enabled()
        && value.len() > MAX_LEN_FOR_DCT_VALUES
    {
        return Err(BuiltInError::MaxLengthExceeded {
            operation,
            max_len: MAX_LEN_FOR_DCT_VALUES,
        });
    }
    Ok(())
}

/// Remaining gas after charging `cost`
pub(crate) fn consume_gas(gas_provided: u64, cost: u64) -> BuiltInResult<u64> {
    gas_provided
        .checked_sub(cost)
        .ok_or(BuiltInError::NotEnoughGas)
}

/// Function cost plus a per-byte charge over `bytes`
pub(crate) fn cost_with_bytes(func_gas_cost: u64, per_byte: u64, bytes: u64) -> u64 {
    func_gas_cost.saturating_add(per_byte.saturating_mul(bytes))
}

/// Total byte length of `args`, used for per-byte charges
pub(crate) fn args_len(args: &[Vec<u8>]) -> u64 {
    args.iter().map(|a| a.len() as u64).sum()
}

/// Burn is allowed with the burn role or once the token is burnable by everyone
pub(crate) fn check_allowed_to_burn(
    global_settings_handler: &dyn GlobalSettingsHandler,
    roles_handler: &dyn DctRoleHandler,
    account: &dyn UserAccountHandler,
    token_id: &[u8],
    role: &[u8],
) -> BuiltInResult<()> {
    if global_settings_handler.is_burn_for_all(token_id) {
        return Ok(());
    }
    roles_handler.check_allowed_to_execute(account, token_id, role)
}

pub(crate) fn check_limited_transfer(
    global_settings_handler: &dyn GlobalSettingsHandler,
    sender: &[u8],
    destination: &[u8],
    token_id: &[u8],
) -> BuiltInResult<()> {
    if !global_settings_handler.is_limited_transfer(token_id) {
        return Ok(());
    }
    if global_settings_handler.is_sender_or_destination_with_transfer_role(sender, destination, token_id) {
        return Ok(());
    }
    Err(BuiltInError::ActionNotAllowed)
}

/// Direct transfers to contracts without a follow-up call must hit a payable contract
pub(crate) fn must_verify_payable(vm_input: &ContractCallInput, min_len_arguments: usize) -> bool {
    if vm_input.call_type == CallType::AsynchronousCall || vm_input.return_call_after_error {
        return false;
    }
    if is_system_account_address(&vm_input.recipient_addr) || is_dct_sc_address(&vm_input.recipient_addr) {
        return false;
    }
    if vm_input.arguments.len() > min_len_arguments {
        return false;
    }
    is_smart_contract_address(&vm_input.recipient_addr)
}

pub(crate) fn check_payable(
    payable_handler: &dyn PayableHandler,
    sender: &[u8],
    receiver: &[u8],
) -> BuiltInResult<()> {
    if !payable_handler.is_payable(sender, receiver)? {
        return Err(BuiltInError::AccountNotPayable);
    }
    Ok(())
}

// ========================================
// Balance records
// ========================================

/// Read a balance record, absent or unreadable records are zero balances
pub(crate) fn get_dct_data_from_key(
    account: &dyn UserAccountHandler,
    key: &[u8],
    marshaller: &dyn Marshalizer,
) -> BuiltInResult<DCToken> {
    let data = match account.retrieve_value(key) {
        Ok(Some(data)) if !data.is_empty() => data,
        _ => return Ok(DCToken::default()),
    };
    Ok(marshaller.unmarshal_token(&data)?)
}

/// Persist a balance record, records holding nothing are deleted
pub(crate) fn save_dct_data(
    account: &mut dyn UserAccountHandler,
    key: &[u8],
    token: &DCToken,
    marshaller: &dyn Marshalizer,
) -> BuiltInResult<()> {
    if token.is_empty_record() {
        account.save_key_value(key, &[])?;
        return Ok(());
    }
    let data = marshaller.marshal_token(token)?;
    account.save_key_value(key, &data)?;
    Ok(())
}

/// Raw value of a storage slot captured before it is rewritten
pub(crate) struct StoredSlot {
    key: Vec<u8>,
    previous: Vec<u8>,
}

impl StoredSlot {
    pub(crate) fn capture(account: &dyn UserAccountHandler, key: &[u8]) -> BuiltInResult<Self> {
        Ok(Self {
            key: key.to_vec(),
            previous: account.retrieve_value(key)?.unwrap_or_default(),
        })
    }
}

/// Put captured slots back, newest first, so a key written twice ends on
/// its first captured value. Slots that were absent are deleted again.
pub(crate) fn restore_slots(
    account: &mut dyn UserAccountHandler,
    slots: &[StoredSlot],
) -> BuiltInResult<()> {
    for slot in slots.iter().rev() {
        account.save_key_value(&slot.key, &slot.previous)?;
    }
    Ok(())
}

pub(crate) fn check_frozen_and_pause(
    token_id: &[u8],
    token: &DCToken,
    global_settings_handler: &dyn GlobalSettingsHandler,
    is_return_with_error: bool,
) -> BuiltInResult<()> {
    if is_return_with_error {
        return Ok(());
    }
    if token.is_frozen() {
        return Err(BuiltInError::DctIsFrozenForAccount);
    }
    if global_settings_handler.is_paused(token_id) {
        return Err(BuiltInError::DctTokenIsPaused);
    }
    Ok(())
}

/// Load a fungible balance record ready to be mutated
pub(crate) fn load_fungible(
    account: &dyn UserAccountHandler,
    token_id: &[u8],
    marshaller: &dyn Marshalizer,
    global_settings_handler: &dyn GlobalSettingsHandler,
    is_return_with_error: bool,
) -> BuiltInResult<(Vec<u8>, DCToken)> {
    let key = dct_token_key(token_id);
    let token = get_dct_data_from_key(account, &key, marshaller)?;
    if token.token_type != TokenType::Fungible {
        return Err(BuiltInError::OnlyFungibleTokensHaveBalanceTransfer);
    }
    check_frozen_and_pause(token_id, &token, global_settings_handler, is_return_with_error)?;
    Ok((key, token))
}

pub(crate) fn debit(token: &mut DCToken, value: &BigUint) -> BuiltInResult<()> {
    if token.value < *value {
        return Err(BuiltInError::InsufficientFunds);
    }
    token.value -= value;
    Ok(())
}

pub(crate) fn add_to_dct_balance(
    account: &mut dyn UserAccountHandler,
    token_id: &[u8],
    value: &BigUint,
    marshaller: &dyn Marshalizer,
    global_settings_handler: &dyn GlobalSettingsHandler,
    is_return_with_error: bool,
) -> BuiltInResult<()> {
    let (key, mut token) = load_fungible(
        &*account,
        token_id,
        marshaller,
        global_settings_handler,
        is_return_with_error,
    )?;
    token.value += value;
    save_dct_data(account, &key, &token, marshaller)
}

pub(crate) fn sub_from_dct_balance(
    account: &mut dyn UserAccountHandler,
    token_id: &[u8],
    value: &BigUint,
    marshaller: &dyn Marshalizer,
    global_settings_handler: &dyn GlobalSettingsHandler,
    is_return_with_error: bool,
) -> BuiltInResult<()> {
    let (key, mut token) = load_fungible(
        &*account,
        token_id,
        marshaller,
        global_settings_handler,
        is_return_with_error,
    )?;
    debit(&mut token, value)?;
    save_dct_data(account, &key, &token, marshaller)
}

// ========================================
// Output
// ========================================

/// Record a token event: topics are `[tokenID, nonce, value, extra...]`
pub(crate) fn add_dct_entry_in_vm_output(
    vm_output: &mut VmOutput,
    identifier: &[u8],
    token_id: &[u8],
    nonce: u64,
    value: &BigUint,
    extra_topics: &[&[u8]],
) {
    let mut topics = Vec::with_capacity(3 + extra_topics.len());
    topics.push(token_id.to_vec());
    topics.push(nonce_to_bytes(nonce));
    topics.push(big_to_bytes(value));
    topics.extend(extra_topics.iter().map(|t| t.to_vec()));

    vm_output.logs.push(LogEntry {
        identifier: identifier.to_vec(),
        address: Vec::new(),
        topics,
        data: Vec::new(),
    });
}

/// Encode `function@hex(arg)@hex(arg)...` as carried by cross-shard transfers
pub(crate) fn build_data_field(function: &str, args: &[Vec<u8>]) -> Vec<u8> {
    let mut data = function.as_bytes().to_vec();
    for arg in args {
        data.push(DATA_SEPARATOR);
        data.extend_from_slice(hex::encode(arg).as_bytes());
    }
    data
}
