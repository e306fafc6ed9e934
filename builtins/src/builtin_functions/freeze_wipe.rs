use std::sync::Arc;

use log::trace;

use super::common::{add_dct_entry_in_vm_output, check_call_value, get_dct_data_from_key, save_dct_data};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::{AccountDataHandler, UserAccountHandler};
use crate::check;
use crate::config::is_dct_sc_address;
use crate::dct::keys::{bytes_to_u64, dct_nft_token_key, dct_token_key};
use crate::dct::{DctUserMetadata, Marshalizer};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::GasCost;
use crate::vm::{ContractCallInput, VmOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeWipeKind {
    Freeze,
    UnFreeze,
    Wipe,
}

impl FreezeWipeKind {
    fn name(self) -> BuiltInFunctionName {
        match self {
            FreezeWipeKind::Freeze => BuiltInFunctionName::DctFreeze,
            FreezeWipeKind::UnFreeze => BuiltInFunctionName::DctUnFreeze,
            FreezeWipeKind::Wipe => BuiltInFunctionName::DctWipe,
        }
    }
}

/// `DCTFreeze@tokenID`, `DCTUnFreeze@tokenID` and `DCTWipe@tokenID[@nonce]`
/// applied by the DCT system smart contract to the destination account.
pub struct DctFreezeWipe {
    kind: FreezeWipeKind,
    marshaller: Arc<dyn Marshalizer>,
}

impl DctFreezeWipe {
    pub fn new(kind: FreezeWipeKind, marshaller: Option<Arc<dyn Marshalizer>>) -> BuiltInResult<Self> {
        Ok(Self {
            kind,
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
        })
    }

    fn token_key(&self, arguments: &[Vec<u8>]) -> BuiltInResult<(Vec<u8>, u64)> {
        let key = dct_token_key(&arguments[0]);
        match arguments.get(1) {
            Some(nonce) => {
                let nonce = bytes_to_u64(nonce)?;
                Ok((dct_nft_token_key(&key, nonce), nonce))
            }
            None => Ok((key, 0)),
        }
    }
}

impl BuiltinFunction for DctFreezeWipe {
    fn process_builtin_function(
        &self,
        _acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        let max_args = if self.kind == FreezeWipeKind::Wipe { 2 } else { 1 };
        if vm_input.arguments.is_empty() || vm_input.arguments.len() > max_args {
            return Err(BuiltInError::InvalidArguments);
        }
        if !is_dct_sc_address(&vm_input.caller_addr) {
            return Err(BuiltInError::AddressIsNotDctSystemSc);
        }
        let Some(acnt_dst) = acnt_dst else {
            return Ok(VmOutput::ok(vm_input.gas_provided));
        };

        let token_id = &vm_input.arguments[0];
        let (key, nonce) = self.token_key(&vm_input.arguments)?;
        let mut token = get_dct_data_from_key(&*acnt_dst, &key, self.marshaller.as_ref())?;
        let wiped_value = token.value.clone();

        match self.kind {
            FreezeWipeKind::Freeze | FreezeWipeKind::UnFreeze => {
                let mut user_metadata = DctUserMetadata::from_bytes(&token.properties);
                user_metadata.frozen = self.kind == FreezeWipeKind::Freeze;
                token.properties = user_metadata.to_bytes();
                save_dct_data(acnt_dst, &key, &token, self.marshaller.as_ref())?;
            }
            FreezeWipeKind::Wipe => {
                if !token.is_frozen() {
                    trace!("refusing to wipe {}: not frozen", String::from_utf8_lossy(token_id));
                    return Err(BuiltInError::CannotWipeAccountNotFrozen);
                }
                acnt_dst.save_key_value(&key, &[])?;
            }
        }

        let mut vm_output = VmOutput::ok(vm_input.gas_provided);
        add_dct_entry_in_vm_output(
            &mut vm_output,
            self.kind.name().as_bytes(),
            token_id,
            nonce,
            &wiped_value,
            &[acnt_dst.address()],
        );
        Ok(vm_output)
    }

    fn set_new_gas_config(&self, _gas_cost: &GasCost) {}
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::*;
    use crate::config::DCT_SC_ADDRESS;
    use crate::dct::{DCToken, JsonMarshalizer};
    use crate::mock::{user_address, MemoryAccount};

    fn input(args: Vec<Vec<u8>>) -> ContractCallInput {
        ContractCallInput {
            caller_addr: DCT_SC_ADDRESS.to_vec(),
            recipient_addr: user_address(1),
            arguments: args,
            gas_provided: 3,
            ..Default::default()
        }
    }

    fn new_fn(kind: FreezeWipeKind) -> DctFreezeWipe {
        DctFreezeWipe::new(kind, Some(Arc::new(JsonMarshalizer))).unwrap()
    }

    #[test]
    fn test_freeze_unfreeze_keeps_balance() {
        let mut account = MemoryAccount::new(&user_address(1));
        let key = dct_token_key(b"TKN");
        account.put_token(&key, &DCToken::fungible(BigUint::from(8u8)));

        let output = new_fn(FreezeWipeKind::Freeze)
            .process_builtin_function(None, Some(&mut account), &input(vec![b"TKN".to_vec()]))
            .unwrap();
        assert_eq!(output.gas_remaining, 3);
        let token = account.token(&key).unwrap();
        assert!(token.is_frozen());
        assert_eq!(token.value, BigUint::from(8u8));

        new_fn(FreezeWipeKind::UnFreeze)
            .process_builtin_function(None, Some(&mut account), &input(vec![b"TKN".to_vec()]))
            .unwrap();
        assert!(!account.token(&key).unwrap().is_frozen());
    }

    #[test]
    fn test_wipe_requires_frozen() {
        let mut account = MemoryAccount::new(&user_address(1));
        let key = dct_token_key(b"TKN");
        account.put_token(&key, &DCToken::fungible(BigUint::from(8u8)));

        let wipe = new_fn(FreezeWipeKind::Wipe);
        let err = wipe
            .process_builtin_function(None, Some(&mut account), &input(vec![b"TKN".to_vec()]))
            .unwrap_err();
        assert!(matches!(err, BuiltInError::CannotWipeAccountNotFrozen));

        new_fn(FreezeWipeKind::Freeze)
            .process_builtin_function(None, Some(&mut account), &input(vec![b"TKN".to_vec()]))
            .unwrap();
        let output = wipe
            .process_builtin_function(None, Some(&mut account), &input(vec![b"TKN".to_vec()]))
            .unwrap();
        assert!(account.raw(&key).is_none());
        assert_eq!(output.logs[0].identifier, b"DCTWipe".to_vec());
        assert_eq!(output.logs[0].topics[2], vec![8]);
    }

    #[test]
    fn test_only_system_sc() {
        let mut account = MemoryAccount::new(&user_address(1));
        let mut call = input(vec![b"TKN".to_vec()]);
        call.caller_addr = user_address(2);
        let err = new_fn(FreezeWipeKind::Freeze)
            .process_builtin_function(None, Some(&mut account), &call)
            .unwrap_err();
        assert!(matches!(err, BuiltInError::AddressIsNotDctSystemSc));
    }
}
