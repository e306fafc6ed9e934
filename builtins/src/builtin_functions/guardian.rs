// Account guardians
// SetGuardian registers a guardian for the calling account; GuardAccount
// and UnGuardAccount toggle whether transactions need its co-signature.
// The state machine itself belongs to the node's guarded account handler.

use std::sync::Arc;

use log::trace;

use super::common::{check_call_value, consume_gas};
use super::{BuiltInFunctionName, BuiltinFunction};
use crate::account::UserAccountHandler;
use crate::check;
use crate::config::{is_smart_contract_address, ADDRESS_LEN};
use crate::error::{BuiltInError, BuiltInResult};
use crate::gas::{GasCost, GasCostCell};
use crate::interfaces::{EnableEpochsHandler, GuardedAccountHandler};
use crate::vm::{ContractCallInput, LogEntry, VmOutput};

struct GuardianBase {
    guarded_account_handler: Arc<dyn GuardedAccountHandler>,
    enable_epochs_handler: Arc<dyn EnableEpochsHandler>,
    gas: GasCostCell,
}

impl GuardianBase {
    fn new(
        func_gas_cost: u64,
        guarded_account_handler: Option<Arc<dyn GuardedAccountHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            guarded_account_handler: check::required(
                guarded_account_handler,
                BuiltInError::NilGuardedAccountHandler,
            )?,
            enable_epochs_handler: check::required(
                enable_epochs_handler,
                BuiltInError::NilEnableEpochsHandler,
            )?,
            gas: GasCostCell::with_func_cost(func_gas_cost),
        })
    }

    /// Common shape: the account acts on itself with `arguments` arguments
    fn check<'a>(
        &self,
        acnt_snd: Option<&'a mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
        arguments: usize,
    ) -> BuiltInResult<(&'a mut dyn UserAccountHandler, u64)> {
        check_call_value(vm_input)?;
        if vm_input.arguments.len() != arguments {
            return Err(BuiltInError::InvalidArguments);
        }
        if vm_input.caller_addr != vm_input.recipient_addr {
            return Err(BuiltInError::InvalidRcvAddr);
        }
        let acnt_snd = acnt_snd.ok_or(BuiltInError::NilUserAccount)?;
        let gas_remaining = consume_gas(vm_input.gas_provided, self.gas.func_gas_cost())?;
        Ok((acnt_snd, gas_remaining))
    }

    fn output(gas_remaining: u64, name: BuiltInFunctionName, address: &[u8], topics: Vec<Vec<u8>>) -> VmOutput {
        let mut vm_output = VmOutput::ok(gas_remaining);
        vm_output.logs.push(LogEntry {
            identifier: name.as_bytes().to_vec(),
            address: address.to_vec(),
            topics,
            data: Vec::new(),
        });
        vm_output
    }
}

/// `SetGuardian@guardian@serviceUID`
pub struct SetGuardian {
    base: GuardianBase,
}

impl SetGuardian {
    pub fn new(
        func_gas_cost: u64,
        guarded_account_handler: Option<Arc<dyn GuardedAccountHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            base: GuardianBase::new(func_gas_cost, guarded_account_handler, enable_epochs_handler)?,
        })
    }
}

impl BuiltinFunction for SetGuardian {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let (account, gas_remaining) = self.base.check(acnt_snd, vm_input, 2)?;
        let guardian = &vm_input.arguments[0];
        let service_uid = &vm_input.arguments[1];
        if guardian.len() != ADDRESS_LEN {
            return Err(BuiltInError::InvalidAddressLength);
        }
        if guardian.as_slice() == account.address() {
            return Err(BuiltInError::CannotSetOwnAddressAsGuardian);
        }
        if is_smart_contract_address(guardian) {
            return Err(BuiltInError::OperationNotPermitted);
        }

        if let Err(err) = self.base.guarded_account_handler.set_guardian(
            account,
            guardian,
            &vm_input.tx_guardian,
            service_uid,
        ) {
            trace!("set guardian refused: {}", err);
            return Err(err.into());
        }

        Ok(GuardianBase::output(
            gas_remaining,
            BuiltInFunctionName::SetGuardian,
            &vm_input.caller_addr,
            vec![guardian.clone(), service_uid.clone()],
        ))
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.base
            .gas
            .replace(gas_cost.built_in_cost.set_guardian, gas_cost.base_operation_cost);
    }

    fn is_active(&self) -> bool {
        self.base.enable_epochs_handler.is_guard_account_enabled()
    }
}

/// `GuardAccount`, activates the pending guardian
pub struct GuardAccount {
    base: GuardianBase,
}

impl GuardAccount {
    pub fn new(
        func_gas_cost: u64,
        guarded_account_handler: Option<Arc<dyn GuardedAccountHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            base: GuardianBase::new(func_gas_cost, guarded_account_handler, enable_epochs_handler)?,
        })
    }
}

impl BuiltinFunction for GuardAccount {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let (account, gas_remaining) = self.base.check(acnt_snd, vm_input, 0)?;
        self.base.guarded_account_handler.guard_account(account)?;
        Ok(GuardianBase::output(
            gas_remaining,
            BuiltInFunctionName::GuardAccount,
            &vm_input.caller_addr,
            Vec::new(),
        ))
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.base
            .gas
            .replace(gas_cost.built_in_cost.guard_account, gas_cost.base_operation_cost);
    }

    fn is_active(&self) -> bool {
        self.base.enable_epochs_handler.is_guard_account_enabled()
    }
}

/// `UnGuardAccount`, the transaction itself carries the guardian co-signature
pub struct UnGuardAccount {
    base: GuardianBase,
}

impl UnGuardAccount {
    pub fn new(
        func_gas_cost: u64,
        guarded_account_handler: Option<Arc<dyn GuardedAccountHandler>>,
        enable_epochs_handler: Option<Arc<dyn EnableEpochsHandler>>,
    ) -> BuiltInResult<Self> {
        Ok(Self {
            base: GuardianBase::new(func_gas_cost, guarded_account_handler, enable_epochs_handler)?,
        })
    }
}

impl BuiltinFunction for UnGuardAccount {
    fn process_builtin_function(
        &self,
        acnt_snd: Option<&mut dyn UserAccountHandler>,
        _acnt_dst: Option<&mut dyn UserAccountHandler>,
        vm_input: &ContractCallInput,
    ) -> BuiltInResult<VmOutput> {
        let (account, gas_remaining) = self.base.check(acnt_snd, vm_input, 0)?;
        self.base.guarded_account_handler.un_guard_account(account)?;
        Ok(GuardianBase::output(
            gas_remaining,
            BuiltInFunctionName::UnGuardAccount,
            &vm_input.caller_addr,
            Vec::new(),
        ))
    }

    fn set_new_gas_config(&self, gas_cost: &GasCost) {
        self.base
            .gas
            .replace(gas_cost.built_in_cost.un_guard_account, gas_cost.base_operation_cost);
    }

    fn is_active(&self) -> bool {
        self.base.enable_epochs_handler.is_guard_account_enabled()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::mock::{sc_address, user_address, EnableEpochsHandlerStub, GuardedAccountHandlerStub, MemoryAccount};

    fn self_call(arguments: Vec<Vec<u8>>) -> ContractCallInput {
        ContractCallInput {
            caller_addr: user_address(1),
            recipient_addr: user_address(1),
            arguments,
            gas_provided: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_set_guardian_delegates() {
        let handler = Arc::new(GuardedAccountHandlerStub::default());
        let set = SetGuardian::new(4, Some(handler.clone()), Some(Arc::new(EnableEpochsHandlerStub::all_enabled()))).unwrap();
        let mut account = MemoryAccount::new(&user_address(1));

        let output = set
            .process_builtin_function(Some(&mut account), None, &self_call(vec![user_address(2), b"uid".to_vec()]))
            .unwrap();
        assert_eq!(output.gas_remaining, 6);
        assert_eq!(handler.set_guardian_calls.load(Ordering::SeqCst), 1);
        assert_eq!(output.logs[0].identifier, b"SetGuardian".to_vec());
        assert_eq!(output.logs[0].topics, vec![user_address(2), b"uid".to_vec()]);
    }

    #[test]
    fn test_set_guardian_rejects_bad_guardians() {
        let handler = Arc::new(GuardedAccountHandlerStub::default());
        let set = SetGuardian::new(4, Some(handler.clone()), Some(Arc::new(EnableEpochsHandlerStub::all_enabled()))).unwrap();
        let mut account = MemoryAccount::new(&user_address(1));

        assert!(matches!(
            set.process_builtin_function(Some(&mut account), None, &self_call(vec![user_address(1), vec![]])),
            Err(BuiltInError::CannotSetOwnAddressAsGuardian)
        ));
        assert!(matches!(
            set.process_builtin_function(Some(&mut account), None, &self_call(vec![vec![1; 3], vec![]])),
            Err(BuiltInError::InvalidAddressLength)
        ));
        assert!(matches!(
            set.process_builtin_function(Some(&mut account), None, &self_call(vec![sc_address(2), vec![]])),
            Err(BuiltInError::OperationNotPermitted)
        ));
        assert_eq!(handler.set_guardian_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_guard_and_unguard() {
        let handler = Arc::new(GuardedAccountHandlerStub::default());
        let epochs = Arc::new(EnableEpochsHandlerStub::all_enabled());
        let guard = GuardAccount::new(1, Some(handler.clone()), Some(epochs.clone())).unwrap();
        let un_guard = UnGuardAccount::new(1, Some(handler.clone()), Some(epochs)).unwrap();
        let mut account = MemoryAccount::new(&user_address(1));

        guard.process_builtin_function(Some(&mut account), None, &self_call(vec![])).unwrap();
        un_guard.process_builtin_function(Some(&mut account), None, &self_call(vec![])).unwrap();
        assert_eq!(handler.guard_calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.un_guard_calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            guard.process_builtin_function(Some(&mut account), None, &self_call(vec![vec![1]])),
            Err(BuiltInError::InvalidArguments)
        ));
    }

    #[test]
    fn test_handler_error_surfaces() {
        let handler = Arc::new(GuardedAccountHandlerStub {
            fail_with: Some("no pending guardian".to_string()),
            ..Default::default()
        });
        let guard = GuardAccount::new(1, Some(handler), Some(Arc::new(EnableEpochsHandlerStub::all_enabled()))).unwrap();
        let mut account = MemoryAccount::new(&user_address(1));
        let err = guard
            .process_builtin_function(Some(&mut account), None, &self_call(vec![]))
            .unwrap_err();
        assert_eq!(err.to_string(), "no pending guardian");
    }

    #[test]
    fn test_gated_by_guard_flag() {
        let guard = GuardAccount::new(
            1,
            Some(Arc::new(GuardedAccountHandlerStub::default())),
            Some(Arc::new(EnableEpochsHandlerStub::default())),
        )
        .unwrap();
        assert!(!guard.is_active());
    }
}
