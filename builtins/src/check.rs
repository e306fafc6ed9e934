//! Presence checks for handles crossing the crate boundary.

use crate::error::{BuiltInError, BuiltInResult};

/// `true` when the handle is absent
pub fn if_nil<T: ?Sized>(handle: Option<&T>) -> bool {
    handle.is_none()
}

/// Unwrap a required handle or fail with `err`
pub fn required<T>(handle: Option<T>, err: BuiltInError) -> BuiltInResult<T> {
    handle.ok_or(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_nil() {
        let value = 5u8;
        assert!(!if_nil(Some(&value)));
        assert!(if_nil::<u8>(None));
    }

    #[test]
    fn test_required() {
        assert_eq!(required(Some(1u8), BuiltInError::NilMarshalizer).unwrap(), 1);
        assert!(matches!(
            required::<u8>(None, BuiltInError::NilMarshalizer),
            Err(BuiltInError::NilMarshalizer)
        ));
    }
}
