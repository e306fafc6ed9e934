use thiserror::Error;

/// Errors produced while building or running built-in functions
#[derive(Error, Debug)]
pub enum BuiltInError {
    // ========================================
    // Construction
    // ========================================
    #[error("nil marshalizer")]
    NilMarshalizer,
    #[error("nil accounts adapter")]
    NilAccountsAdapter,
    #[error("nil shard coordinator")]
    NilShardCoordinator,
    #[error("nil enable epochs handler")]
    NilEnableEpochsHandler,
    #[error("nil guarded account handler")]
    NilGuardedAccountHandler,
    #[error("nil roles handler")]
    NilRolesHandler,
    #[error("nil global settings handler")]
    NilGlobalSettingsHandler,
    #[error("nil payable handler")]
    NilPayableHandler,
    #[error("nil dct nft storage handler")]
    NilDctNftStorageHandler,
    #[error("missing gas schedule category {category}")]
    MissingGasCategory { category: String },
    #[error("invalid gas cost {category}.{key}: missing or zero value")]
    InvalidGasCost { category: String, key: String },
    #[error("invalid gas schedule: {0}")]
    InvalidGasSchedule(String),

    // ========================================
    // Container
    // ========================================
    #[error("empty built-in function name")]
    EmptyFunctionName,
    #[error("built-in function {0} already exists")]
    FunctionAlreadyExists(String),
    #[error("built-in function {0} not found")]
    FunctionNotFound(String),
    #[error("built-in function {0} is not active")]
    BuiltInFunctionIsNotActive(String),

    // ========================================
    // Call input
    // ========================================
    #[error("built in function called with value")]
    BuiltInFunctionCalledWithValue,
    #[error("invalid arguments to process built-in function")]
    InvalidArguments,
    #[error("invalid arguments to process built-in function: max length for {operation} value is {max_len}")]
    MaxLengthExceeded { operation: &'static str, max_len: usize },
    #[error("invalid arguments to process built-in function: royalties {royalties} above {max}")]
    InvalidRoyalties { royalties: u64, max: u32 },
    #[error("negative value")]
    NegativeValue,
    #[error("invalid nonce")]
    InvalidNonce,
    #[error("invalid address length")]
    InvalidAddressLength,

    // ========================================
    // Accounts and addresses
    // ========================================
    #[error("invalid receiver address")]
    InvalidRcvAddr,
    #[error("nil user account")]
    NilUserAccount,
    #[error("nil destination smart contract account")]
    NilScDestAccount,
    #[error("caller is not the dns address")]
    CallerIsNotTheDnsAddress,
    #[error("user name change is disabled")]
    UserNameChangeIsDisabled,
    #[error("operation not permitted")]
    OperationNotPermitted,
    #[error("address is not the dct system smart contract")]
    AddressIsNotDctSystemSc,
    #[error("only system account accepted")]
    OnlySystemAccountAccepted,
    #[error("cannot set own address as guardian")]
    CannotSetOwnAddressAsGuardian,
    #[error("account is not payable")]
    AccountNotPayable,

    // ========================================
    // Token state
    // ========================================
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("not enough gas")]
    NotEnoughGas,
    #[error("action is not allowed")]
    ActionNotAllowed,
    #[error("dct is frozen for account")]
    DctIsFrozenForAccount,
    #[error("dct token is paused")]
    DctTokenIsPaused,
    #[error("cannot wipe an account that is not frozen")]
    CannotWipeAccountNotFrozen,
    #[error("only fungible tokens have balance transfer")]
    OnlyFungibleTokensHaveBalanceTransfer,
    #[error("new nft data on sender account")]
    NewNftDataOnSenderAccount,
    #[error("nft does not have metadata")]
    NftDoesNotHaveMetadata,
    #[error("too many transfer addresses, max is {max}")]
    TooManyTransferAddresses { max: u32 },

    // ========================================
    // Collaborators (storage, codec, guardians)
    // ========================================
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

/// Result type for built-in function operations
pub type BuiltInResult<T> = Result<T, BuiltInError>;
