//! Built-in functions: protocol operations mutating accounts outside of
//! smart contract execution.
//!
//! Every function follows the same shape: validate the call, authorize the
//! caller, compute the new state, charge gas, persist and emit logs. Nothing
//! is written unless every check passed.

use std::sync::Arc;

use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::account::UserAccountHandler;
use crate::error::BuiltInResult;
use crate::gas::GasCost;
use crate::interfaces::PayableHandler;
use crate::vm::{ContractCallInput, VmOutput};

mod burn;
mod change_owner;
mod claim_developer_rewards;
pub mod common;
mod container;
mod creator;
mod freeze_wipe;
mod global_settings;
mod guardian;
mod local_burn;
mod local_mint;
mod metadata_modify;
mod migrate_data_trie;
mod multi_transfer;
mod nft_add_quantity;
mod nft_add_uri;
mod nft_burn;
mod nft_create;
mod nft_create_role_transfer;
mod nft_storage;
mod nft_transfer;
mod nft_update_attributes;
mod roles;
mod save_key_value;
mod save_user_name;
mod transfer;
mod transfer_address;

pub use burn::DctBurn;
pub use change_owner::ChangeOwnerAddress;
pub use claim_developer_rewards::ClaimDeveloperRewards;
pub use common::check_input_arguments_for_local_action;
pub use container::BuiltInFunctionContainer;
pub use creator::{ArgsCreateBuiltInFunctionContainer, BuiltInFuncCreator};
pub use freeze_wipe::{DctFreezeWipe, FreezeWipeKind};
pub use global_settings::{DctGlobalSettings, DctGlobalSettingsHandler, GlobalSettingKind};
pub use guardian::{GuardAccount, SetGuardian, UnGuardAccount};
pub use local_burn::DctLocalBurn;
pub use local_mint::DctLocalMint;
pub use metadata_modify::{DctMetaDataModify, MetaDataModifyKind};
pub use migrate_data_trie::MigrateDataTrie;
pub use multi_transfer::DctNftMultiTransfer;
pub use nft_add_quantity::DctNftAddQuantity;
pub use nft_add_uri::DctNftAddUri;
pub use nft_burn::DctNftBurn;
pub use nft_create::DctNftCreate;
pub use nft_create_role_transfer::DctNftCreateRoleTransfer;
pub use nft_storage::DctDataStorage;
pub use nft_transfer::DctNftTransfer;
pub use nft_update_attributes::DctNftUpdateAttributes;
pub use roles::DctRoles;
pub use save_key_value::SaveKeyValueStorage;
pub use save_user_name::SaveUserName;
pub use transfer::DctTransfer;
pub use transfer_address::DctTransferAddress;

/// A protocol operation callable by name through the VM
pub trait BuiltinFunction: Send + Sync {
    /// Execute the call. `acnt_snd` is absent when the caller lives on another
    /// shard, `acnt_dst` when the recipient does.
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput>;

    /// Replace the cost snapshot after a gas schedule change
    fn set_new_gas_config(&self, gas_cost: &GasCost);

    fn is_active(&self) -> bool {
        true
    }

    /// Install the payable handler, ignored by functions not crediting contracts
    fn set_payable_handler(&self, _handler: Arc<dyn PayableHandler>) {}
}

/// Names of every built-in function known to the protocol
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumCount,
    EnumString,
    IntoStaticStr,
    AsRefStr,
    Display,
)]
pub enum BuiltInFunctionName {
    #[strum(serialize = "ClaimDeveloperRewards")]
    ClaimDeveloperRewards,
    #[strum(serialize = "ChangeOwnerAddress")]
    ChangeOwnerAddress,
    #[strum(serialize = "SetUserName")]
    SetUserName,
    #[strum(serialize = "SaveKeyValue")]
    SaveKeyValue,
    #[strum(serialize = "DCTTransfer")]
    DctTransfer,
    #[strum(serialize = "DCTBurn")]
    DctBurn,
    #[strum(serialize = "DCTFreeze")]
    DctFreeze,
    #[strum(serialize = "DCTUnFreeze")]
    DctUnFreeze,
    #[strum(serialize = "DCTWipe")]
    DctWipe,
    #[strum(serialize = "DCTPause")]
    DctPause,
    #[strum(serialize = "DCTUnPause")]
    DctUnPause,
    #[strum(serialize = "DCTSetLimitedTransfer")]
    DctSetLimitedTransfer,
    #[strum(serialize = "DCTUnSetLimitedTransfer")]
    DctUnSetLimitedTransfer,
    #[strum(serialize = "DCTSetBurnRoleForAll")]
    DctSetBurnRoleForAll,
    #[strum(serialize = "DCTUnSetBurnRoleForAll")]
    DctUnSetBurnRoleForAll,
    #[strum(serialize = "DCTSetRole")]
    DctSetRole,
    #[strum(serialize = "DCTUnSetRole")]
    DctUnSetRole,
    #[strum(serialize = "DCTLocalBurn")]
    DctLocalBurn,
    #[strum(serialize = "DCTLocalMint")]
    DctLocalMint,
    #[strum(serialize = "DCTNFTAddQuantity")]
    DctNftAddQuantity,
    #[strum(serialize = "DCTNFTBurn")]
    DctNftBurn,
    #[strum(serialize = "DCTNFTCreate")]
    DctNftCreate,
    #[strum(serialize = "DCTNFTTransfer")]
    DctNftTransfer,
    #[strum(serialize = "DCTNFTCreateRoleTransfer")]
    DctNftCreateRoleTransfer,
    #[strum(serialize = "DCTNFTAddURI")]
    DctNftAddUri,
    #[strum(serialize = "DCTNFTUpdateAttributes")]
    DctNftUpdateAttributes,
    #[strum(serialize = "MultiDCTNFTTransfer")]
    MultiDctNftTransfer,
    #[strum(serialize = "DCTTransferRoleAddAddress")]
    DctTransferRoleAddAddress,
    #[strum(serialize = "DCTTransferRoleDeleteAddress")]
    DctTransferRoleDeleteAddress,
    #[strum(serialize = "SetGuardian")]
    SetGuardian,
    #[strum(serialize = "GuardAccount")]
    GuardAccount,
    #[strum(serialize = "UnGuardAccount")]
    UnGuardAccount,
    #[strum(serialize = "MigrateDataTrie")]
    MigrateDataTrie,
    #[strum(serialize = "DCTModifyRoyalties")]
    DctModifyRoyalties,
    #[strum(serialize = "DCTSetNewURIs")]
    DctSetNewUris,
    #[strum(serialize = "DCTModifyCreator")]
    DctModifyCreator,
}

impl BuiltInFunctionName {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}
