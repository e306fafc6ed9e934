use std::sync::Arc;

use log::debug;

use super::common::check_call_value;
use super::BuiltinFunction;
use crate::account::{AccountDataHandler, AccountsAdapter, UserAccountHandler};
use crate::check;
use crate::config::{is_dct_sc_address, is_system_account_address, SYSTEM_ACCOUNT_ADDRESS};
use crate::dct::keys::dct_transfer_address_key;
use crate::dct::{DCTRoles, Marshalizer};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::GasCost;
use crate::interfaces::EnableEpochsHandler;
use crate::vm::{ContractCallInput, VmOutput};

/// `DCTTransferRoleAddAddress@tokenID@address...` and its delete twin.
///
/// Keeps the list of addresses allowed to move a limited-transfer token on
/// the system account.
pub struct DctTransferAddress {
    set: bool,
    accounts: Arc<dyn AccountsAdapter>,
    marshaller: Arc<dyn Marshalizer>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    max_addresses: u32,
}

impl DctTransferAddress {
    pub fn new(
        set: bool,
        accounts: Option<Arc<dyn AccountsAdapter>>,
        marshaller: Option<Arc<dyn Marshalizer>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
        max_addresses: u32,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            set,
            accounts: check::required(accounts, BuiltInError::NilAccountsAdapter)?,
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            max_addresses,
        })
    }
}

impl BuiltinFunction for DctTransferAddress {
    fn process_builtin_function(
        &self,
        _acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() < 2 {
            return Err(BuiltInError::InvalidArguments);
        }
        if !is_dct_sc_address(&vm_input.caller_addr) {
            return Err(BuiltInError::AddressIsNotDctSystemSc);
        }
        if !is_system_account_address(&vm_input.recipient_addr) {
            return Err(BuiltInError::OnlySystemAccountAccepted);
        }

        let token_id = &vm_input.arguments[0];
        let key = dct_transfer_address_key(token_id);
        let mut system_account = self.accounts.load_account(&SYSTEM_ACCOUNT_ADDRESS)?;
        let mut addresses = match system_account.retrieve_value(&key) {
            Ok(Some(data)) if !data.is_empty() => self.marshaller.unmarshal_roles(&data)?,
            _ => DCTRoles::default(),
        };

        for address in &vm_input.arguments[1..] {
            if self.set {
                addresses.insert(address);
            } else {
                addresses.remove(address);
            }
        }
        if addresses.roles.len() > self.max_addresses as usize {
            return Err(BuiltInError::TooManyTransferAddresses {
                max: self.max_addresses,
            });
        }

        if addresses.roles.is_empty() {
            system_account.save_key_value(&key, &[])?;
        } else {
            let data = self.marshaller.marshal_roles(&addresses)?;
            system_account.save_key_value(&key, &data)?;
        }
        self.accounts.save_account(system_account)?;

        debug!(
            "transfer role list of {} now holds {} addresses",
            String::from_utf8_lossy(token_id),
            addresses.roles.len()
        );
        Ok(VmOutput::ok(vm_input.gas_provided))
    }

    fn set_new_gas_config(&self, _gas_cost: &GasCost) {}

    fn is_active(&self) -> bool {
        self.enable_epochs_handler.is_dct_transfer_role_enabled()
    }
}
