//! Collaborators injected into built-in functions.

use crate::account::UserAccountHandler;
use crate::dct::DCToken;
use crate::error::BuiltInResult;

/// Maps addresses to shards
pub trait ShardCoordinator: Send + Sync {
    fn number_of_shards(&self) -> u32;
    fn compute_id(&self, address: &[u8]) -> u32;
    fn self_id(&self) -> u32;

    fn same_shard(&self, first: &[u8], second: &[u8]) -> bool {
        self.compute_id(first) == self.compute_id(second)
    }
}

/// Epoch-activated feature flags
pub trait EnableEpochsHandler: Send + Sync {
    /// Reject token values longer than the maximum value length
    fn is_consistent_tokens_values_length_check_enabled(&self) -> bool;
    /// Transfer role addresses and limited transfers
    fn is_dct_transfer_role_enabled(&self) -> bool;
    fn is_guard_account_enabled(&self) -> bool;
    fn is_migrate_data_trie_enabled(&self) -> bool;
    /// Post-creation metadata edits (royalties, uris, creator)
    fn is_dynamic_dct_enabled(&self) -> bool;
}

/// Account guardian state machine, owned by the node
pub trait GuardedAccountHandler: Send + Sync {
    fn is_guarded(&self, account: &dyn UserAccountHandler) -> bool;
    fn set_guardian(
        &self,
        account: &mut dyn UserAccountHandler,
        guardian: &[u8],
        tx_guardian: &[u8],
        guardian_service_uid: &[u8],
    ) -> anyhow::Result<()>;
    fn guard_account(&self, account: &mut dyn UserAccountHandler) -> anyhow::Result<()>;
    fn un_guard_account(&self, account: &mut dyn UserAccountHandler) -> anyhow::Result<()>;
}

/// Decides whether a smart contract accepts direct token transfers
pub trait PayableHandler: Send + Sync {
    fn is_payable(&self, sender: &[u8], receiver: &[u8]) -> anyhow::Result<bool>;
}

/// Payable handler used until the node installs the real one
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPayableHandler;

impl PayableHandler for DisabledPayableHandler {
    fn is_payable(&self, _sender: &[u8], _receiver: &[u8]) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Checks roles granted to an account for a token
pub trait DctRoleHandler: Send + Sync {
    fn check_allowed_to_execute(
        &self,
        account: &dyn UserAccountHandler,
        token_id: &[u8],
        action: &[u8],
    ) -> BuiltInResult<()>;
}

/// Token-wide settings stored on the system account
pub trait GlobalSettingsHandler: Send + Sync {
    fn is_paused(&self, token_id: &[u8]) -> bool;
    fn is_limited_transfer(&self, token_id: &[u8]) -> bool;
    fn is_burn_for_all(&self, token_id: &[u8]) -> bool;
    fn is_sender_or_destination_with_transfer_role(
        &self,
        sender: &[u8],
        destination: &[u8],
        token_id: &[u8],
    ) -> bool;
}

/// Access to NFT balance records and their metadata
pub trait NftStorageHandler: Send + Sync {
    /// Record held by the sender, it must exist and carry metadata
    fn get_dct_nft_token_on_sender(
        &self,
        account: &dyn UserAccountHandler,
        token_key: &[u8],
        nonce: u64,
    ) -> BuiltInResult<DCToken>;

    /// Record held by the destination, `true` when it does not exist yet
    fn get_dct_nft_token_on_destination(
        &self,
        account: &dyn UserAccountHandler,
        token_key: &[u8],
        nonce: u64,
    ) -> BuiltInResult<(DCToken, bool)>;

    /// Persist the record, deleting it once its value reaches zero
    fn save_dct_nft_token(
        &self,
        account: &mut dyn UserAccountHandler,
        token_key: &[u8],
        nonce: u64,
        token: &DCToken,
    ) -> BuiltInResult<()>;
}
