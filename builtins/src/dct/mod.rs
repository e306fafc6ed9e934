//! DCT token records, their storage keys and codecs.

pub mod keys;
mod marshal;
mod token;

pub use marshal::{JsonMarshalizer, Marshalizer};
pub use token::{DCTRoles, DCToken, DctGlobalMetadata, DctUserMetadata, MetaData, TokenType};
