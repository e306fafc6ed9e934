// Built-in Functions Creator
// Owns the gas configuration and the container of every built-in function.
// The container is built once from the current gas snapshot and published
// behind an ArcSwap; gas schedule changes and payable handler installation
// are pushed into the published functions.
//
// Writers (container creation, schedule change, payable installation) are
// serialised by one mutex. Readers never block.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};

use super::{
    BuiltInFunctionContainer, BuiltInFunctionName, BuiltinFunction, ChangeOwnerAddress,
    ClaimDeveloperRewards, DctBurn, DctDataStorage, DctFreezeWipe, DctGlobalSettings,
    DctGlobalSettingsHandler, DctLocalBurn, DctLocalMint, DctMetaDataModify, DctNftAddQuantity,
    DctNftAddUri, DctNftBurn, DctNftCreate, DctNftCreateRoleTransfer, DctNftMultiTransfer,
    DctNftTransfer, DctNftUpdateAttributes, DctRoles, DctTransfer, DctTransferAddress,
    FreezeWipeKind, GlobalSettingKind, GuardAccount, MetaDataModifyKind, MigrateDataTrie,
    SaveKeyValueStorage, SaveUserName, SetGuardian, UnGuardAccount,
};
use crate::account::AccountsAdapter;
use crate::check;
use crate::dct::Marshalizer;
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasScheduleMap};
use crate::interfaces::{
    DctRoleHandler, DisabledPayableHandler, EnableEpochsHandler, GlobalSettingsHandler,
    GuardedAccountHandler, NftStorageHandler, PayableHandler, ShardCoordinator,
};

/// Everything the creator needs to build the built-in functions
pub struct ArgsCreateBuiltInFunctionContainer {
    pub gas_map: GasScheduleMap,
    /// DNS contracts allowed to assign user names
    pub map_dns_addresses: HashSet<Vec<u8>>,
    /// DNS contracts allowed to change user names, once changes are enabled
    pub map_dns_v2_addresses: HashSet<Vec<u8>>,
    pub enable_user_name_change: bool,
    pub marshalizer: Option<Arc<dyn Marshalizer>>,
    pub accounts: Option<Arc<dyn AccountsAdapter>>,
    pub shard_coordinator: Option<Arc<dyn ShardCoordinator>>,
    pub enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    pub guarded_account_handler: Option<Arc<dyn GuardedAccountHandler>>,
    pub max_num_of_addresses_for_transfer_role: u32,
}

pub struct BuiltInFuncCreator {
    map_dns_addresses: HashSet<Vec<u8>>,
    map_dns_v2_addresses: HashSet<Vec<u8>>,
    enable_user_name_change: bool,
    marshalizer: Arc<dyn Marshalizer>,
    accounts: Arc<dyn AccountsAdapter>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    guarded_account_handler: Arc<dyn GuardedAccountHandler>,
    max_num_of_addresses_for_transfer_role: u32,

    gas_config: ArcSwap<GasCost>,
    container: ArcSwap<BuiltInFunctionContainer>,
    payable_handler: RwLock<Arc<dyn PayableHandler>>,
    nft_storage_handler: Arc<dyn NftStorageHandler>,
    global_settings_handler: Arc<dyn GlobalSettingsHandler>,
    writer: Mutex<()>,
}

impl BuiltInFuncCreator {
    pub fn new(args: ArgsCreateBuiltInFunctionContainer) -> BuiltInResult<Self> {
        let gas_config = GasCost::from_schedule(&args.gas_map)?;
        let marshalizer = check::required(args.marshalizer, BuiltInError::NilMarshalizer)?;
        let accounts = check::required(args.accounts, BuiltInError::NilAccountsAdapter)?;
        let shard_coordinator =
            check::required(args.shard_coordinator, BuiltInError::NilShardCoordinator)?;
        let enable_epochs_handler =
            check::required(args.enable_epochs_handler, BuiltInError::NilEnableEpochsHandler)?;
        let guarded_account_handler = check::required(
            args.guarded_account_handler,
            BuiltInError::NilGuardedAccountHandler,
        )?;

        let nft_storage_handler = Arc::new(DctDataStorage::new(Some(marshalizer.clone()))?);
        let global_settings_handler = Arc::new(DctGlobalSettingsHandler::new(
            Some(accounts.clone()),
            Some(marshalizer.clone()),
        )?);

        Ok(Self {
            map_dns_addresses: args.map_dns_addresses,
            map_dns_v2_addresses: args.map_dns_v2_addresses,
            enable_user_name_change: args.enable_user_name_change,
            marshalizer,
            accounts,
            shard_coordinator,
            enable_epochs_handler,
            guarded_account_handler,
            max_num_of_addresses_for_transfer_role: args.max_num_of_addresses_for_transfer_role,
            gas_config: ArcSwap::from_pointee(gas_config),
            container: ArcSwap::from_pointee(BuiltInFunctionContainer::new()),
            payable_handler: RwLock::new(Arc::new(DisabledPayableHandler)),
            nft_storage_handler,
            global_settings_handler,
            writer: Mutex::new(()),
        })
    }

    /// Build every built-in function from the current gas snapshot and publish
    /// the container. Nothing is published when any function fails to build.
    pub fn create_built_in_function_container(&self) -> BuiltInResult<()> {
        let _guard = self.writer.lock();
        let gas_config = self.gas_config.load_full();
        let container = self.build_container(&gas_config)?;

        let payable_handler = self.payable_handler.read().clone();
        for (_, function) in container.iter() {
            function.set_payable_handler(payable_handler.clone());
        }

        debug!("built-in function container created with {} functions", container.len());
        self.container.store(Arc::new(container));
        Ok(())
    }

    /// Snapshot of the published container
    pub fn built_in_function_container(&self) -> Arc<BuiltInFunctionContainer> {
        self.container.load_full()
    }

    /// Apply a new gas schedule to the creator and every published function.
    ///
    /// An incomplete schedule is rejected as a whole and the previous costs
    /// stay in force.
    pub fn gas_schedule_change(&self, gas_schedule: &GasScheduleMap) -> BuiltInResult<()> {
        let _guard = self.writer.lock();
        let gas_config = match GasCost::from_schedule(gas_schedule) {
            Ok(gas_config) => gas_config,
            Err(err) => {
                warn!("gas schedule change rejected, keeping the previous costs: {}", err);
                return Err(err);
            }
        };

        self.gas_config.store(Arc::new(gas_config));
        let container = self.container.load();
        for (name, function) in container.iter() {
            trace!("applying new gas config to {}", name);
            function.set_new_gas_config(&gas_config);
        }
        debug!("gas schedule applied to {} built-in functions", container.len());
        Ok(())
    }

    /// Install the payable handler on the creator and every published function
    pub fn set_payable_handler(&self, handler: Option<Arc<dyn PayableHandler>>) -> BuiltInResult<()> {
        let handler = check::required(handler, BuiltInError::NilPayableHandler)?;
        let _guard = self.writer.lock();
        *self.payable_handler.write() = handler.clone();

        let container = self.container.load();
        for (_, function) in container.iter() {
            function.set_payable_handler(handler.clone());
        }
        Ok(())
    }

    pub fn nft_storage_handler(&self) -> Arc<dyn NftStorageHandler> {
        self.nft_storage_handler.clone()
    }

    pub fn gas_config(&self) -> GasCost {
        **self.gas_config.load()
    }

    fn build_container(&self, gas_config: &GasCost) -> BuiltInResult<BuiltInFunctionContainer> {
        let cost = &gas_config.built_in_cost;
        let marshalizer = || Some(self.marshalizer.clone());
        let accounts = || Some(self.accounts.clone());
        let shard_coordinator = || Some(self.shard_coordinator.clone());
        let epochs = || Some(self.enable_epochs_handler.clone());
        let guarded = || Some(self.guarded_account_handler.clone());
        let global_settings = || Some(self.global_settings_handler.clone());
        let nft_storage = || Some(self.nft_storage_handler.clone());

        let set_roles = Arc::new(DctRoles::new(true, marshalizer())?);
        let role_handler: Arc<dyn DctRoleHandler> = set_roles.clone();
        let roles = || Some(role_handler.clone());

        let mut container = BuiltInFunctionContainer::new();
        let mut add = |name: BuiltInFunctionName, function: Arc<dyn BuiltinFunction>| {
            container.add(name.as_str(), function)
        };

        // Step 1: account level functions
        add(
            BuiltInFunctionName::ClaimDeveloperRewards,
            Arc::new(ClaimDeveloperRewards::new(cost.claim_developer_rewards)),
        )?;
        add(
            BuiltInFunctionName::ChangeOwnerAddress,
            Arc::new(ChangeOwnerAddress::new(cost.change_owner_address)),
        )?;
        add(
            BuiltInFunctionName::SetUserName,
            Arc::new(SaveUserName::new(
                cost.save_user_name,
                self.map_dns_addresses.clone(),
                self.map_dns_v2_addresses.clone(),
                self.enable_user_name_change,
            )),
        )?;
        add(
            BuiltInFunctionName::SaveKeyValue,
            Arc::new(SaveKeyValueStorage::new(gas_config)),
        )?;

        // Step 2: fungible tokens and system smart contract actions
        add(
            BuiltInFunctionName::DctTransfer,
            Arc::new(DctTransfer::new(
                cost.dct_transfer,
                marshalizer(),
                global_settings(),
                shard_coordinator(),
                epochs(),
            )?),
        )?;
        add(
            BuiltInFunctionName::DctBurn,
            Arc::new(DctBurn::new(cost.dct_burn, marshalizer(), global_settings(), epochs())?),
        )?;
        for (name, kind) in [
            (BuiltInFunctionName::DctFreeze, FreezeWipeKind::Freeze),
            (BuiltInFunctionName::DctUnFreeze, FreezeWipeKind::UnFreeze),
            (BuiltInFunctionName::DctWipe, FreezeWipeKind::Wipe),
        ] {
            add(name, Arc::new(DctFreezeWipe::new(kind, marshalizer())?))?;
        }
        for kind in [
            GlobalSettingKind::Pause,
            GlobalSettingKind::UnPause,
            GlobalSettingKind::SetLimitedTransfer,
            GlobalSettingKind::UnSetLimitedTransfer,
            GlobalSettingKind::SetBurnRoleForAll,
            GlobalSettingKind::UnSetBurnRoleForAll,
        ] {
            add(kind.name(), Arc::new(DctGlobalSettings::new(kind, accounts(), epochs())?))?;
        }
        add(BuiltInFunctionName::DctSetRole, set_roles.clone())?;
        add(
            BuiltInFunctionName::DctUnSetRole,
            Arc::new(DctRoles::new(false, marshalizer())?),
        )?;
        add(
            BuiltInFunctionName::DctLocalBurn,
            Arc::new(DctLocalBurn::new(
                cost.dct_local_burn,
                marshalizer(),
                global_settings(),
                roles(),
                epochs(),
            )?),
        )?;
        add(
            BuiltInFunctionName::DctLocalMint,
            Arc::new(DctLocalMint::new(
                cost.dct_local_mint,
                marshalizer(),
                global_settings(),
                roles(),
                epochs(),
            )?),
        )?;

        // Step 3: non fungible tokens
        add(
            BuiltInFunctionName::DctNftAddQuantity,
            Arc::new(DctNftAddQuantity::new(
                cost.dct_nft_add_quantity,
                global_settings(),
                roles(),
                nft_storage(),
                epochs(),
            )?),
        )?;
        add(
            BuiltInFunctionName::DctNftBurn,
            Arc::new(DctNftBurn::new(
                cost.dct_nft_burn,
                global_settings(),
                roles(),
                nft_storage(),
                epochs(),
            )?),
        )?;
        add(
            BuiltInFunctionName::DctNftCreate,
            Arc::new(DctNftCreate::new(
                gas_config,
                marshalizer(),
                roles(),
                nft_storage(),
                epochs(),
            )?),
        )?;
        add(
            BuiltInFunctionName::DctNftTransfer,
            Arc::new(DctNftTransfer::new(
                cost.dct_nft_transfer,
                marshalizer(),
                global_settings(),
                accounts(),
                shard_coordinator(),
                nft_storage(),
                epochs(),
            )?),
        )?;
        add(
            BuiltInFunctionName::DctNftCreateRoleTransfer,
            Arc::new(DctNftCreateRoleTransfer::new(
                Some(set_roles.clone()),
                shard_coordinator(),
            )?),
        )?;
        add(
            BuiltInFunctionName::DctNftAddUri,
            Arc::new(DctNftAddUri::new(gas_config, roles(), nft_storage())?),
        )?;
        add(
            BuiltInFunctionName::DctNftUpdateAttributes,
            Arc::new(DctNftUpdateAttributes::new(gas_config, roles(), nft_storage())?),
        )?;
        add(
            BuiltInFunctionName::MultiDctNftTransfer,
            Arc::new(DctNftMultiTransfer::new(
                cost.dct_nft_multi_transfer,
                marshalizer(),
                global_settings(),
                accounts(),
                shard_coordinator(),
                nft_storage(),
                epochs(),
            )?),
        )?;
        for (name, set) in [
            (BuiltInFunctionName::DctTransferRoleAddAddress, true),
            (BuiltInFunctionName::DctTransferRoleDeleteAddress, false),
        ] {
            add(
                name,
                Arc::new(DctTransferAddress::new(
                    set,
                    accounts(),
                    marshalizer(),
                    epochs(),
                    self.max_num_of_addresses_for_transfer_role,
                )?),
            )?;
        }

        // Step 4: guardians and data trie maintenance
        add(
            BuiltInFunctionName::SetGuardian,
            Arc::new(SetGuardian::new(cost.set_guardian, guarded(), epochs())?),
        )?;
        add(
            BuiltInFunctionName::GuardAccount,
            Arc::new(GuardAccount::new(cost.guard_account, guarded(), epochs())?),
        )?;
        add(
            BuiltInFunctionName::UnGuardAccount,
            Arc::new(UnGuardAccount::new(cost.un_guard_account, guarded(), epochs())?),
        )?;
        add(
            BuiltInFunctionName::MigrateDataTrie,
            Arc::new(MigrateDataTrie::new(gas_config, epochs())?),
        )?;

        // Step 5: dynamic metadata edits
        for (name, kind) in [
            (BuiltInFunctionName::DctModifyRoyalties, MetaDataModifyKind::ModifyRoyalties),
            (BuiltInFunctionName::DctSetNewUris, MetaDataModifyKind::SetNewUris),
            (BuiltInFunctionName::DctModifyCreator, MetaDataModifyKind::ModifyCreator),
        ] {
            add(
                name,
                Arc::new(DctMetaDataModify::new(
                    kind,
                    gas_config,
                    roles(),
                    nft_storage(),
                    epochs(),
                )?),
            )?;
        }

        Ok(container)
    }
}
