//! Protocol constants shared by every built-in function.
//!
//! Key layout on the account data trie:
//! - `ANDESdcttoken<tokenID>[nonce]` token balance record
//! - `ANDESroledct<tokenID>` roles held by the account
//! - `ANDESnonce<tokenID>` latest created NFT nonce
//! - `ANDEStransferAddress<tokenID>` transfer role addresses (system account)

/// Prefix of every key reserved to the protocol
pub const PROTECTED_KEY_PREFIX: &[u8] = b"ANDES";
pub const DCT_KEY_IDENTIFIER: &[u8] = b"dcttoken";
pub const DCT_ROLE_IDENTIFIER: &[u8] = b"roledct";
pub const DCT_NFT_LATEST_NONCE_IDENTIFIER: &[u8] = b"nonce";
pub const DCT_TRANSFER_ADDRESS_IDENTIFIER: &[u8] = b"transferAddress";

/// Maximum byte length of a token value argument
pub const MAX_LEN_FOR_DCT_VALUES: usize = 100;

/// Royalties are expressed in basis points of 0.01%
pub const MAX_ROYALTY: u32 = 10_000;

/// Length of a regular account address
pub const ADDRESS_LEN: usize = 32;

/// Shard id of the metachain
pub const METACHAIN_SHARD_ID: u32 = u32::MAX;

/// Address of the DCT system smart contract (lives on the metachain)
pub const DCT_SC_ADDRESS: [u8; ADDRESS_LEN] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0xff, 0xff,
];

/// Address of the per-shard system account holding global token settings
pub const SYSTEM_ACCOUNT_ADDRESS: [u8; ADDRESS_LEN] = [0xff; ADDRESS_LEN];

/// Number of leading zero bytes marking a smart contract address
const SC_ADDRESS_ZERO_PREFIX: usize = 8;

/// Minimum arguments of a fungible transfer (token, value)
pub const MIN_LEN_ARGUMENTS_DCT_TRANSFER: usize = 2;
/// Minimum arguments of an NFT transfer (token, nonce, quantity, destination)
pub const MIN_LEN_ARGUMENTS_DCT_NFT_TRANSFER: usize = 4;
/// Minimum arguments of a multi transfer (destination, count)
pub const MIN_LEN_ARGUMENTS_MULTI_TRANSFER: usize = 2;
/// Argument separator of a transaction data field
pub const DATA_SEPARATOR: u8 = b'@';

/// Role names granted by the DCT system smart contract
pub mod roles {
    pub const LOCAL_MINT: &[u8] = b"DCTRoleLocalMint";
    pub const LOCAL_BURN: &[u8] = b"DCTRoleLocalBurn";
    pub const NFT_CREATE: &[u8] = b"DCTRoleNFTCreate";
    pub const NFT_ADD_QUANTITY: &[u8] = b"DCTRoleNFTAddQuantity";
    pub const NFT_BURN: &[u8] = b"DCTRoleNFTBurn";
    pub const NFT_ADD_URI: &[u8] = b"DCTRoleNFTAddURI";
    pub const NFT_UPDATE_ATTRIBUTES: &[u8] = b"DCTRoleNFTUpdateAttributes";
    pub const TRANSFER: &[u8] = b"DCTRoleTransfer";
    pub const MODIFY_ROYALTIES: &[u8] = b"DCTRoleModifyRoyalties";
    pub const SET_NEW_URI: &[u8] = b"DCTRoleSetNewURI";
    pub const MODIFY_CREATOR: &[u8] = b"DCTRoleModifyCreator";
}

pub fn is_system_account_address(address: &[u8]) -> bool {
    address == SYSTEM_ACCOUNT_ADDRESS
}

pub fn is_dct_sc_address(address: &[u8]) -> bool {
    address == DCT_SC_ADDRESS
}

/// Smart contract addresses start with eight zero bytes
pub fn is_smart_contract_address(address: &[u8]) -> bool {
    if address.len() <= SC_ADDRESS_ZERO_PREFIX || is_system_account_address(address) {
        return false;
    }
    address[..SC_ADDRESS_ZERO_PREFIX].iter().all(|b| *b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_contract_address_detection() {
        let mut sc = [0u8; ADDRESS_LEN];
        sc[31] = 7;
        assert!(is_smart_contract_address(&sc));
        assert!(is_smart_contract_address(&DCT_SC_ADDRESS));
        assert!(!is_smart_contract_address(&[1u8; ADDRESS_LEN]));
        assert!(!is_smart_contract_address(&SYSTEM_ACCOUNT_ADDRESS));
        assert!(!is_smart_contract_address(&[0u8; 4]));
    }
}
