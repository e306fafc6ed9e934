use std::sync::Arc;

use log::debug;
use num_bigint::BigUint;

use super::common::{build_data_field, check_call_value};
use super::roles::DctRoles;
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::{AccountDataHandler, UserAccountHandler};
use crate::check;
use crate::config::{is_dct_sc_address, roles, ADDRESS_LEN, METACHAIN_SHARD_ID};
use crate::dct::keys::{bytes_to_u64, dct_nonce_key, nonce_to_bytes};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::GasCost;
use crate::interfaces::ShardCoordinator;
use crate::vm::{ContractCallInput, OutputTransfer, VmOutput};

/// `DCTNFTCreateRoleTransfer` moves the create role together with the latest
/// nonce from the current creator to a new one.
///
/// The DCT system smart contract calls `tokenID@newCreator` on the current
/// creator, which forwards `tokenID@nonce` to the new creator's shard.
pub struct DctNftCreateRoleTransfer {
    roles: Arc<DctRoles>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
}

impl DctNftCreateRoleTransfer {
    pub fn new(
        roles: Option<Arc<DctRoles>>,
        shard_coordinator: Option<Arc<dyn ShardCoordinator>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            roles: check::required(roles, BuiltInError::NilRolesHandler)?,
            shard_coordinator: check::required(shard_coordinator, BuiltInError::NilShardCoordinator)?,
        })
    }

    fn at_current_owner(
        &self,
        acnt_dst: &mut dyn UserAccountHandler,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let token_id = &vm_input.arguments[0];
        let next_owner = &vm_input.arguments[1];
        if next_owner.len() != ADDRESS_LEN {
            return Err(BuiltInError::InvalidAddressLength);
        }
        if self.shard_coordinator.compute_id(next_owner) == METACHAIN_SHARD_ID {
            return Err(BuiltInError::InvalidRcvAddr);
        }

        let nonce_key = dct_nonce_key(token_id);
        let nonce = match acnt_dst.retrieve_value(&nonce_key)? {
            Some(bytes) => bytes_to_u64(&bytes)?,
            None => 0,
        };
        let mut held = self.roles.roles_for_account(&*acnt_dst, token_id)?;
        held.remove(roles::NFT_CREATE);
        self.roles.save_roles(acnt_dst, token_id, &held)?;
        acnt_dst.save_key_value(&nonce_key, &[])?;

        let mut vm_output = VmOutput::ok(vm_input.gas_provided);
        vm_output.add_output_transfer(
            next_owner,
            OutputTransfer {
                value: BigUint::default(),
                gas_limit: 0,
                data: build_data_field(
                    BuiltInFunctionName::DctNftCreateRoleTransfer.as_str(),
                    &[token_id.clone(), nonce_to_bytes(nonce)],
                ),
                call_type: vm_input.call_type,
                sender_address: vm_input.recipient_addr.clone(),
            },
        );
        debug!(
            "create role of {} moves from {} to {} at nonce {}",
            String::from_utf8_lossy(token_id),
            hex::encode(&vm_input.recipient_addr),
            hex::encode(next_owner),
            nonce
        );
        Ok(vm_output)
    }

    fn at_next_owner(
        &self,
        acnt_dst: &mut dyn UserAccountHandler,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let token_id = &vm_input.arguments[0];
        let nonce = bytes_to_u64(&vm_input.arguments[1])?;

        let mut held = self.roles.roles_for_account(&*acnt_dst, token_id)?;
        held.insert(roles::NFT_CREATE);
        self.roles.save_roles(acnt_dst, token_id, &held)?;
        acnt_dst.save_key_value(&dct_nonce_key(token_id), &nonce_to_bytes(nonce))?;

        Ok(VmOutput::ok(vm_input.gas_provided))
    }
}

impl BuiltinFunction for DctNftCreateRoleTransfer {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() != 2 {
            return Err(BuiltInError::InvalidArguments);
        }
        let acnt_dst = acnt_dst.ok_or(BuiltInError::NilUserAccount)?;

        if is_dct_sc_address(&vm_input.caller_addr) {
            return self.at_current_owner(acnt_dst, vm_input);
        }
        // the next owner only accepts the role forwarded from another account
        if acnt_snd.is_some() {
            return Err(BuiltInError::OperationNotPermitted);
        }
        self.at_next_owner(acnt_dst, vm_input)
    }

    fn set_new_gas_config(&self, _gas_cost: &GasCost) {}
}
