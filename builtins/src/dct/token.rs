use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Kind of a token held in a balance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum TokenType {
    #[default]
    Fungible = 0,
    NonFungible = 1,
    SemiFungible = 2,
    Meta = 3,
}

/// Metadata attached to a non-fungible or semi-fungible token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    pub nonce: u64,
    pub name: Vec<u8>,
    pub creator: Vec<u8>,
    pub royalties: u32,
    pub hash: Vec<u8>,
    pub uris: Vec<Vec<u8>>,
    pub attributes: Vec<u8>,
}

/// Token balance record stored on an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DCToken {
    pub token_type: TokenType,
    pub value: BigUint,
    /// Encoded [`DctUserMetadata`]
    pub properties: Vec<u8>,
    pub token_meta_data: Option<MetaData>,
    pub reserved: Vec<u8>,
}

impl DCToken {
    pub fn fungible(value: BigUint) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn is_frozen(&self) -> bool {
        DctUserMetadata::from_bytes(&self.properties).frozen
    }

    /// A record carrying nothing worth keeping in storage
    pub fn is_empty_record(&self) -> bool {
        self.value == BigUint::default()
            && self.properties.iter().all(|b| *b == 0)
            && self.token_meta_data.is_none()
    }
}

/// Roles of an account for one token, also used for address lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DCTRoles {
    pub roles: Vec<Vec<u8>>,
}

impl DCTRoles {
    pub fn contains(&self, role: &[u8]) -> bool {
        self.roles.iter().any(|r| r.as_slice() == role)
    }

    /// Add `role` if missing, returns whether the set changed
    pub fn insert(&mut self, role: &[u8]) -> bool {
        if self.contains(role) {
            return false;
        }
        self.roles.push(role.to_vec());
        true
    }

    /// Remove `role` if present, returns whether the set changed
    pub fn remove(&mut self, role: &[u8]) -> bool {
        let before = self.roles.len();
        self.roles.retain(|r| r.as_slice() != role);
        before != self.roles.len()
    }
}

const FROZEN_BIT: u8 = 0x01;

/// Per-account token flags, packed into `DCToken::properties`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DctUserMetadata {
    pub frozen: bool,
}

impl DctUserMetadata {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let first = bytes.first().copied().unwrap_or(0);
        Self {
            frozen: first & FROZEN_BIT != 0,
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        let mut first = 0u8;
        if self.frozen {
            first |= FROZEN_BIT;
        }
        vec![first, 0]
    }
}

const PAUSED_BIT: u8 = 0x01;
const LIMITED_TRANSFER_BIT: u8 = 0x02;
const BURN_ROLE_FOR_ALL_BIT: u8 = 0x04;

/// Token-wide flags kept on the system account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DctGlobalMetadata {
    pub paused: bool,
    pub limited_transfer: bool,
    pub burn_role_for_all: bool,
}

impl DctGlobalMetadata {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let first = bytes.first().copied().unwrap_or(0);
        Self {
            paused: first & PAUSED_BIT != 0,
            limited_transfer: first & LIMITED_TRANSFER_BIT != 0,
            burn_role_for_all: first & BURN_ROLE_FOR_ALL_BIT != 0,
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        let mut first = 0u8;
        if self.paused {
            first |= PAUSED_BIT;
        }
        if self.limited_transfer {
            first |= LIMITED_TRANSFER_BIT;
        }
        if self.burn_role_for_all {
            first |= BURN_ROLE_FOR_ALL_BIT;
        }
        vec![first, 0]
    }
}
