use std::sync::Arc;

use super::common::check_call_value;
use super::BuiltinFunction;
use crate::account::{AccountDataHandler, UserAccountHandler};
use crate::check;
use crate::config::{is_dct_sc_address, roles};
use crate::dct::keys::{dct_nonce_key, dct_role_key};
use crate::dct::{DCTRoles, Marshalizer};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::GasCost;
use crate::interfaces::DctRoleHandler;
use crate::vm::{ContractCallInput, VmOutput};

/// `DCTSetRole@tokenID@role...` and `DCTUnSetRole@tokenID@role...`, issued by
/// the DCT system smart contract.
///
/// The setting instance also answers role checks for other functions.
pub struct DctRoles {
    set: bool,
    marshaller: Arc<dyn Marshalizer>,
}

impl DctRoles {
    pub fn new(set: bool, marshaller: Option<Arc<dyn Marshalizer>>) -> BuiltInResult<Self> {
        Ok(Self {
            set,
            marshaller: check::required(marshaller, BuiltInError::NilMarshalizer)?,
        })
    }

    /// Roles held by `account` for `token_id`, empty when none were granted
    pub fn roles_for_account(
        &self,
        account: &dyn UserAccountHandler,
        token_id: &[u8],
    ) -> BuiltInResult<DCTRoles> {
        match account.retrieve_value(&dct_role_key(token_id)) {
            Ok(Some(data)) if !data.is_empty() => Ok(self.marshaller.unmarshal_roles(&data)?),
            _ => Ok(DCTRoles::default()),
        }
    }

    pub(crate) fn save_roles(
        &self,
        account: &mut dyn UserAccountHandler,
        token_id: &[u8],
        roles: &DCTRoles,
    ) -> BuiltInResult<()> {
        let key = dct_role_key(token_id);
        if roles.roles.is_empty() {
            account.save_key_value(&key, &[])?;
            return Ok(());
        }
        let data = self.marshaller.marshal_roles(roles)?;
        account.save_key_value(&key, &data)?;
        Ok(())
    }
}

impl DctRoleHandler for DctRoles {
    fn check_allowed_to_execute(
        &self,
        account: &dyn UserAccountHandler,
        token_id: &[u8],
        action: &[u8],
    ) -> BuiltInResult<()> {
        let held = self.roles_for_account(account, token_id)?;
        if !held.contains(action) {
            return Err(BuiltInError::ActionNotAllowed);
        }
        Ok(())
    }
}

impl BuiltinFunction for DctRoles {
    fn process_builtin_function(
        &self,
        _acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() < 2 {
            return Err(BuiltInError::InvalidArguments);
        }
        if !is_dct_sc_address(&vm_input.caller_addr) {
            return Err(BuiltInError::AddressIsNotDctSystemSc);
        }
        let Some(acnt_dst) = acnt_dst else {
            // sender shard of the system smart contract call
            return Ok(VmOutput::ok(vm_input.gas_provided));
        };

        let token_id = &vm_input.arguments[0];
        let mut held = self.roles_for_account(&*acnt_dst, token_id)?;
        for role in &vm_input.arguments[1..] {
            if self.set {
                held.insert(role);
            } else {
                held.remove(role);
            }
        }
        self.save_roles(acnt_dst, token_id, &held)?;

        // losing the create role also drops the nonce counter
        if !self.set && vm_input.arguments[1..].iter().any(|r| r.as_slice() == roles::NFT_CREATE) {
            acnt_dst.save_key_value(&dct_nonce_key(token_id), &[])?;
        }

        Ok(VmOutput::ok(vm_input.gas_provided))
    }

    fn set_new_gas_config(&self, _gas_cost: &GasCost) {}
}
