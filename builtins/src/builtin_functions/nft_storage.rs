use std::sync::Arc;

use num_traits::Zero;

use super::common::{get_dct_data_from_key, save_dct_data};
use crate::account::UserAccountHandler;
use crate::check;
use crate::dct::keys::dct_nft_token_key;
use crate::dct::{DCToken, Marshalizer};
use crate::error::{BuiltInError, BuiltInResult};
use crate::interfaces::NftStorageHandler;

/// NFT and SFT balance records, kept on the holder under `token key + nonce`
pub struct DctDataStorage {
    marshaller: Arc<dyn Marshalizer>,
}

impl DctDataStorage {
    pub fn new(marshaller: Option<Arc<dyn Marshalizer>>) -> BuiltInResult<Self> {
        Ok(Self {
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
        })
    }
}

impl NftStorageHandler for DctDataStorage {
    fn get_dct_nft_token_on_sender(
        &self,
        account: &dyn UserAccountHandler,
        token_key: &[u8],
        nonce: u64,
    ) -> BuiltInResult<DCToken> {
        let (token, is_new) = self.get_dct_nft_token_on_destination(account, token_key, nonce)?;
        if is_new {
            return Err(BuiltInError::NewNftDataOnSenderAccount);
        }
        if nonce > 0 && token.token_meta_data.is_none() {
            return Err(BuiltInError::NftDoesNotHaveMetadata);
        }
        Ok(token)
    }

    fn get_dct_nft_token_on_destination(
        &self,
        account: &dyn UserAccountHandler,
        token_key: &[u8],
        nonce: u64,
    ) -> BuiltInResult<(DCToken, bool)> {
        let key = dct_nft_token_key(token_key, nonce);
        let token = get_dct_data_from_key(account, &key, self.marshaller.as_ref())?;
        let is_new = token.is_empty_record();
        Ok((token, is_new))
    }

    fn save_dct_nft_token(
        &self,
        account: &mut dyn UserAccountHandler,
        token_key: &[u8],
        nonce: u64,
        token: &DCToken,
    ) -> BuiltInResult<()> {
        let key = dct_nft_token_key(token_key, nonce);
        if token.value.is_zero() {
            return save_dct_data(account, &key, &DCToken::default(), self.marshaller.as_ref());
        }
        save_dct_data(account, &key, token, self.marshaller.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::*;
    use crate::dct::keys::dct_token_key;
    use crate::dct::{JsonMarshalizer, MetaData, TokenType};
    use crate::mock::{user_address, MemoryAccount};

    fn storage() -> DctDataStorage {
        DctDataStorage::new(Some(Arc::new(JsonMarshalizer))).unwrap()
    }

    fn nft(value: u8) -> DCToken {
        DCToken {
            token_type: TokenType::SemiFungible,
            value: BigUint::from(value),
            token_meta_data: Some(MetaData {
                nonce: 2,
                name: b"name".to_vec(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_sender_needs_existing_record() {
        let account = MemoryAccount::new(&user_address(1));
        let key = dct_token_key(b"NFT");
        assert!(matches!(
            storage().get_dct_nft_token_on_sender(&account, &key, 2),
            Err(BuiltInError::NewNftDataOnSenderAccount)
        ));

        let (token, is_new) = storage().get_dct_nft_token_on_destination(&account, &key, 2).unwrap();
        assert!(is_new);
        assert_eq!(token, DCToken::default());
    }

    #[test]
    fn test_sender_record_without_metadata() {
        let account = MemoryAccount::new(&user_address(1));
        let key = dct_token_key(b"NFT");
        let mut token = nft(3);
        token.token_meta_data = None;
        account.put_token(&dct_nft_token_key(&key, 2), &token);
        assert!(matches!(
            storage().get_dct_nft_token_on_sender(&account, &key, 2),
            Err(BuiltInError::NftDoesNotHaveMetadata)
        ));
    }

    #[test]
    fn test_save_and_delete_at_zero() {
        let mut account = MemoryAccount::new(&user_address(1));
        let key = dct_token_key(b"NFT");
        storage().save_dct_nft_token(&mut account, &key, 2, &nft(3)).unwrap();
        assert_eq!(storage().get_dct_nft_token_on_sender(&account, &key, 2).unwrap(), nft(3));

        storage().save_dct_nft_token(&mut account, &key, 2, &nft(0)).unwrap();
        assert!(account.raw(&dct_nft_token_key(&key, 2)).is_none());
    }
}
