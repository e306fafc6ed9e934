//! Storage key builders and byte encodings of numeric arguments.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::config::{
    DCT_KEY_IDENTIFIER, DCT_NFT_LATEST_NONCE_IDENTIFIER, DCT_ROLE_IDENTIFIER,
    DCT_TRANSFER_ADDRESS_IDENTIFIER, PROTECTED_KEY_PREFIX,
};
use crate::error::{BuiltInError, BuiltInResult};

fn protected_key(identifier: &[u8], token_id: &[u8]) -> Vec<u8> {
    let mut key =
        Vec::with_capacity(PROTECTED_KEY_PREFIX.len() + identifier.len() + token_id.len());
    key.extend_from_slice(PROTECTED_KEY_PREFIX);
    key.extend_from_slice(identifier);
    key.extend_from_slice(token_id);
    key
}

/// Balance record key of a token
pub fn dct_token_key(token_id: &[u8]) -> Vec<u8> {
    protected_key(DCT_KEY_IDENTIFIER, token_id)
}

/// Balance record key of one NFT instance, plain token key for nonce 0
pub fn dct_nft_token_key(token_key: &[u8], nonce: u64) -> Vec<u8> {
    let encoded = nonce_to_bytes(nonce);
    let mut key = Vec::with_capacity(token_key.len() + encoded.len());
    key.extend_from_slice(token_key);
    key.extend_from_slice(&encoded);
    key
}

pub fn dct_role_key(token_id: &[u8]) -> Vec<u8> {
    protected_key(DCT_ROLE_IDENTIFIER, token_id)
}

pub fn dct_nonce_key(token_id: &[u8]) -> Vec<u8> {
    protected_key(DCT_NFT_LATEST_NONCE_IDENTIFIER, token_id)
}

pub fn dct_transfer_address_key(token_id: &[u8]) -> Vec<u8> {
    protected_key(DCT_TRANSFER_ADDRESS_IDENTIFIER, token_id)
}

pub fn is_protected_key(key: &[u8]) -> bool {
    key.starts_with(PROTECTED_KEY_PREFIX)
}

/// Minimal big-endian bytes, zero encodes as an empty slice
pub fn big_to_bytes(value: &BigUint) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    value.to_bytes_be()
}

pub fn nonce_to_bytes(nonce: u64) -> Vec<u8> {
    let bytes = nonce.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Decode a big-endian nonce of at most eight bytes
pub fn bytes_to_u64(bytes: &[u8]) -> BuiltInResult<u64> {
    if bytes.len() > 8 {
        return Err(BuiltInError::InvalidArguments);
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_key_layout() {
        assert_eq!(dct_token_key(b"TKN-1a2b3c"), b"ANDESdcttokenTKN-1a2b3c".to_vec());
        assert_eq!(dct_role_key(b"TKN"), b"ANDESroledctTKN".to_vec());
        assert_eq!(dct_nonce_key(b"TKN"), b"ANDESnonceTKN".to_vec());
        assert!(is_protected_key(&dct_transfer_address_key(b"TKN")));
        assert!(!is_protected_key(b"user-key"));
    }

    #[test]
    fn test_nft_key_appends_minimal_nonce() {
        let token_key = dct_token_key(b"NFT");
        assert_eq!(dct_nft_token_key(&token_key, 0), token_key);
        let mut expected = token_key.clone();
        expected.extend_from_slice(&[0x01, 0x00]);
        assert_eq!(dct_nft_token_key(&token_key, 256), expected);
    }

    #[test]
    fn test_number_encodings() {
        assert!(big_to_bytes(&BigUint::default()).is_empty());
        assert_eq!(big_to_bytes(&BigUint::from(1u8)), vec![1]);
        assert!(nonce_to_bytes(0).is_empty());
        assert_eq!(nonce_to_bytes(0x0102), vec![1, 2]);
        assert_eq!(bytes_to_u64(&[1, 2]).unwrap(), 0x0102);
        assert_eq!(bytes_to_u64(&[]).unwrap(), 0);
        assert!(matches!(bytes_to_u64(&[1; 9]), Err(BuiltInError::InvalidArguments)));
    }
}
