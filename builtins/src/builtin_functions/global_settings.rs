// DCT Global Settings
// Token-wide flags (pause, limited transfer, burn for all) live on the
// system account, present in every shard, so any shard can answer them
// without a cross-shard read.

use std::sync::Arc;

use log::{debug, trace};

use super::common::check_call_value;
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::{AccountDataHandler, AccountsAdapter, UserAccountHandler};
use crate::check;
use crate::config::{is_dct_sc_address, is_system_account_address, SYSTEM_ACCOUNT_ADDRESS};
use crate::dct::keys::{dct_token_key, dct_transfer_address_key};
use crate::dct::{DctGlobalMetadata, Marshalizer};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::GasCost;
use crate::interfaces::{EnableEpochsHandler, GlobalSettingsHandler};
use crate::vm::{ContractCallInput, VmOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalSettingKind {
    Pause,
    UnPause,
    SetLimitedTransfer,
    UnSetLimitedTransfer,
    SetBurnRoleForAll,
    UnSetBurnRoleForAll,
}

impl GlobalSettingKind {
    pub fn name(self) -> BuiltInFunctionName {
        match self {
            GlobalSettingKind::Pause => BuiltInFunctionName::DctPause,
            GlobalSettingKind::UnPause => BuiltInFunctionName::DctUnPause,
            GlobalSettingKind::SetLimitedTransfer => BuiltInFunctionName::DctSetLimitedTransfer,
            GlobalSettingKind::UnSetLimitedTransfer => BuiltInFunctionName::DctUnSetLimitedTransfer,
            GlobalSettingKind::SetBurnRoleForAll => BuiltInFunctionName::DctSetBurnRoleForAll,
            GlobalSettingKind::UnSetBurnRoleForAll => BuiltInFunctionName::DctUnSetBurnRoleForAll,
        }
    }

    fn apply(self, metadata: &mut DctGlobalMetadata) {
        match self {
            GlobalSettingKind::Pause => metadata.paused = true,
            GlobalSettingKind::UnPause => metadata.paused = false,
            GlobalSettingKind::SetLimitedTransfer => metadata.limited_transfer = true,
            GlobalSettingKind::UnSetLimitedTransfer => metadata.limited_transfer = false,
            GlobalSettingKind::SetBurnRoleForAll => metadata.burn_role_for_all = true,
            GlobalSettingKind::UnSetBurnRoleForAll => metadata.burn_role_for_all = false,
        }
    }

    fn is_limited_transfer(self) -> bool {
        matches!(
            self,
            GlobalSettingKind::SetLimitedTransfer | GlobalSettingKind::UnSetLimitedTransfer
        )
    }
}

fn global_metadata(system_account: &dyn UserAccountHandler, token_id: &[u8]) -> DctGlobalMetadata {
    match system_account.retrieve_value(&dct_token_key(token_id)) {
        Ok(Some(bytes)) => DctGlobalMetadata::from_bytes(&bytes),
        _ => DctGlobalMetadata::default(),
    }
}

/// Flips one global flag of a token, issued by the DCT system smart contract
pub struct DctGlobalSettings {
    kind: GlobalSettingKind,
    accounts: Arc<dyn AccountsAdapter>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
}

impl DctGlobalSettings {
    pub fn new(
        kind: GlobalSettingKind,
        accounts: Option<Arc<dyn AccountsAdapter>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            kind,
            accounts: check::required(accounts, BuiltInError::NilAccountsAdapter)?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
        })
    }
}

impl BuiltinFunction for DctGlobalSettings {
    fn process_builtin_function(
        &self,
        _acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() != 1 {
            return Err(BuiltInError::InvalidArguments);
        }
        if !is_dct_sc_address(&vm_input.caller_addr) {
            return Err(BuiltInError::AddressIsNotDctSystemSc);
        }
        if !is_system_account_address(&vm_input.recipient_addr) {
            return Err(BuiltInError::OnlySystemAccountAccepted);
        }

        let token_id = &vm_input.arguments[0];
        let mut system_account = self.accounts.load_account(&SYSTEM_ACCOUNT_ADDRESS)?;
        let mut metadata = global_metadata(&*system_account, token_id);
        self.kind.apply(&mut metadata);
        system_account.save_key_value(&dct_token_key(token_id), &metadata.to_bytes())?;
        self.accounts.save_account(system_account)?;

        debug!(
            "{} applied to {}",
            self.kind.name(),
            String::from_utf8_lossy(token_id)
        );
        Ok(VmOutput::ok(vm_input.gas_provided))
    }

    fn set_new_gas_config(&self, _gas_cost: &GasCost) {}

    fn is_active(&self) -> bool {
        if self.kind.is_limited_transfer() {
            return self.enable_epochs_handler.is_dct_transfer_role_enabled();
        }
        true
    }
}

/// Answers global flag queries from the system account
pub struct DctGlobalSettingsHandler {
    accounts: Arc<dyn AccountsAdapter>,
    marshaller: Arc<dyn Marshalizer>,
}

impl DctGlobalSettingsHandler {
    pub fn new(
        accounts: Option<Arc<dyn AccountsAdapter>>,
        marshaller: Option<Arc<dyn Marshalizer>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            accounts: check::required(accounts, BuiltInError::NilAccountsAdapter)?,
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
        })
    }

    fn metadata(&self, token_id: &[u8]) -> DctGlobalMetadata {
        match self.accounts.load_account(&SYSTEM_ACCOUNT_ADDRESS) {
            Ok(system_account) => global_metadata(&*system_account, token_id),
            Err(err) => {
                trace!("system account unavailable: {}", err);
                DctGlobalMetadata::default()
            }
        }
    }

    fn has_transfer_role(&self, system_account: &dyn UserAccountHandler, address: &[u8], token_id: &[u8]) -> bool {
        let data = match system_account.retrieve_value(&dct_transfer_address_key(token_id)) {
            Ok(Some(data)) if !data.is_empty() => data,
            _ => return false,
        };
        match self.marshaller.unmarshal_roles(&data) {
            Ok(addresses) => addresses.contains(address),
            Err(_) => false,
        }
    }
}

impl GlobalSettingsHandler for DctGlobalSettingsHandler {
    fn is_paused(&self, token_id: &[u8]) -> bool {
        self.metadata(token_id).paused
    }

    fn is_limited_transfer(&self, token_id: &[u8]) -> bool {
        self.metadata(token_id).limited_transfer
    }

    fn is_burn_for_all(&self, token_id: &[u8]) -> bool {
        self.metadata(token_id).burn_role_for_all
    }

    fn is_sender_or_destination_with_transfer_role(
        &self,
        sender: &[u8],
        destination: &[u8],
        token_id: &[u8],
    ) -> bool {
        let Ok(system_account) = self.accounts.load_account(&SYSTEM_ACCOUNT_ADDRESS) else {
            return false;
        };
        self.has_transfer_role(&*system_account, sender, token_id)
            || self.has_transfer_role(&*system_account, destination, token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DCT_SC_ADDRESS;
    use crate::dct::JsonMarshalizer;
    use crate::mock::{user_address, EnableEpochsHandlerStub, MemoryAccounts};

    fn setting_input() -> ContractCallInput {
        ContractCallInput {
            caller_addr: DCT_SC_ADDRESS.to_vec(),
            recipient_addr: SYSTEM_ACCOUNT_ADDRESS.to_vec(),
            arguments: vec![b"TKN".to_vec()],
            gas_provided: 4,
            ..Default::default()
        }
    }

    fn setting(kind: GlobalSettingKind, accounts: &Arc<MemoryAccounts>) -> DctGlobalSettings {
        DctGlobalSettings::new(
            kind,
            Some(accounts.clone()),
            Some(Arc::new(EnableEpochsHandlerStub::default())),
        )
        .unwrap()
    }

    #[test]
    fn test_flags_toggle_independently() {
        let accounts = Arc::new(MemoryAccounts::default());
        let handler = DctGlobalSettingsHandler::new(Some(accounts.clone()), Some(Arc::new(JsonMarshalizer))).unwrap();

        let output = setting(GlobalSettingKind::Pause, &accounts)
            .process_builtin_function(None, None, &setting_input())
            .unwrap();
        assert_eq!(output.gas_remaining, 4);
        assert!(handler.is_paused(b"TKN"));
        assert!(!handler.is_paused(b"OTHER"));

        setting(GlobalSettingKind::SetBurnRoleForAll, &accounts)
            .process_builtin_function(None, None, &setting_input())
            .unwrap();
        assert!(handler.is_paused(b"TKN"));
        assert!(handler.is_burn_for_all(b"TKN"));
        assert!(!handler.is_limited_transfer(b"TKN"));

        setting(GlobalSettingKind::UnPause, &accounts)
            .process_builtin_function(None, None, &setting_input())
            .unwrap();
        assert!(!handler.is_paused(b"TKN"));
        assert!(handler.is_burn_for_all(b"TKN"));
        assert_eq!(accounts.saves.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn test_recipient_must_be_system_account() {
        let accounts = Arc::new(MemoryAccounts::default());
        let mut input = setting_input();
        input.recipient_addr = user_address(1);
        let err = setting(GlobalSettingKind::Pause, &accounts)
            .process_builtin_function(None, None, &input)
            .unwrap_err();
        assert!(matches!(err, BuiltInError::OnlySystemAccountAccepted));
    }

    #[test]
    fn test_limited_transfer_gated_by_flag() {
        let accounts = Arc::new(MemoryAccounts::default());
        assert!(!setting(GlobalSettingKind::SetLimitedTransfer, &accounts).is_active());
        assert!(setting(GlobalSettingKind::Pause, &accounts).is_active());

        let enabled = DctGlobalSettings::new(
            GlobalSettingKind::UnSetLimitedTransfer,
            Some(accounts),
            Some(Arc::new(EnableEpochsHandlerStub::all_enabled())),
        )
        .unwrap();
        assert!(enabled.is_active());
    }
}
