use super::token::{DCTRoles, DCToken};

/// Codec for records persisted on account data tries
pub trait Marshalizer: Send + Sync {
    fn marshal_token(&self, token: &DCToken) -> anyhow::Result<Vec<u8>>;
    fn unmarshal_token(&self, data: &[u8]) -> anyhow::Result<DCToken>;
    fn marshal_roles(&self, roles: &DCTRoles) -> anyhow::Result<Vec<u8>>;
    fn unmarshal_roles(&self, data: &[u8]) -> anyhow::Result<DCTRoles>;
}

/// JSON codec, used by tooling and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMarshalizer;

impl Marshalizer for JsonMarshalizer {
    fn marshal_token(&self, token: &DCToken) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(token)?)
    }

    fn unmarshal_token(&self, data: &[u8]) -> anyhow::Result<DCToken> {
        Ok(serde_json::from_slice(data)?)
    }

    fn marshal_roles(&self, roles: &DCTRoles) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(roles)?)
    }

    fn unmarshal_roles(&self, data: &[u8]) -> anyhow::Result<DCTRoles> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::*;
    use crate::dct::token::{MetaData, TokenType};

    #[test]
    fn test_json_token_keeps_metadata() {
        let token = DCToken {
            token_type: TokenType::NonFungible,
            value: BigUint::from(1u8),
            token_meta_data: Some(MetaData {
                nonce: 7,
                name: b"ape".to_vec(),
                royalties: 250,
                uris: vec![b"ipfs://a".to_vec()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let marshalizer = JsonMarshalizer;
        let bytes = marshalizer.marshal_token(&token).unwrap();
        assert_eq!(marshalizer.unmarshal_token(&bytes).unwrap(), token);
    }

    #[test]
    fn test_json_rejects_garbage() {
        assert!(JsonMarshalizer.unmarshal_token(b"not json").is_err());
    }
}
