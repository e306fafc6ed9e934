use std::sync::Arc;

use indexmap::IndexMap;

use super::BuiltinFunction;
use crate::error::{BuiltInError, BuiltInResult};

/// Name-keyed registry of built-in functions
///
/// Keys keep insertion order; callers look functions up by name only.
#[derive(Default, Clone)]
pub struct BuiltInFunctionContainer {
    functions: IndexMap<String, Arc<dyn BuiltinFunction>>,
}

impl BuiltInFunctionContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, function: Arc<dyn BuiltinFunction>) -> BuiltInResult<()> {
        if name.is_empty() {
            return Err(BuiltInError::EmptyFunctionName);
        }
        if self.functions.contains_key(name) {
            return Err(BuiltInError::FunctionAlreadyExists(name.to_string()));
        }
        self.functions.insert(name.to_string(), function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> BuiltInResult<Arc<dyn BuiltinFunction>> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| BuiltInError::FunctionNotFound(name.to_string()))
    }

    /// Like [`get`](Self::get) but also fails while the function is not yet activated
    pub fn get_active(&self, name: &str) -> BuiltInResult<Arc<dyn BuiltinFunction>> {
        let function = self.get(name)?;
        if !function.is_active() {
            return Err(BuiltInError::BuiltInFunctionIsNotActive(name.to_string()));
        }
        Ok(function)
    }

    /// Swap the function registered under `name`
    pub fn replace(&mut self, name: &str, function: Arc<dyn BuiltinFunction>) -> BuiltInResult<()> {
        if name.is_empty() {
            return Err(BuiltInError::EmptyFunctionName);
        }
        match self.functions.get_mut(name) {
            Some(slot) => {
                *slot = function;
                Ok(())
            }
            None => Err(BuiltInError::FunctionNotFound(name.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn BuiltinFunction>> {
        self.functions.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn BuiltinFunction>)> {
        self.functions.iter().map(|(name, function)| (name.as_str(), function))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserAccountHandler;
    use crate::gas::GasCost;
    use crate::vm::{ContractCallInput, VmOutput};

    struct Noop {
        active: bool,
    }

    impl BuiltinFunction for Noop {
        fn process_builtin_function(
            &self,
            _acnt_snd: Option<&mut dyn UserAccountHandler>,
            _acnt_dst: Option<&mut dyn UserAccountHandler>,
            vm_input: &ContractCallInput,
        ) -> BuiltInResult<VmOutput> {
            Ok(VmOutput::ok(vm_input.gas_provided))
        }

        fn set_new_gas_config(&self, _gas_cost: &GasCost) {}

        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn noop(active: bool) -> Arc<dyn BuiltinFunction> {
        Arc::new(Noop { active })
    }

    #[test]
    fn test_add_rejects_empty_and_duplicate_names() {
        let mut container = BuiltInFunctionContainer::new();
        assert!(matches!(container.add("", noop(true)), Err(BuiltInError::EmptyFunctionName)));
        container.add("a", noop(true)).unwrap();
        assert!(matches!(
            container.add("a", noop(true)),
            Err(BuiltInError::FunctionAlreadyExists(name)) if name == "a"
        ));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_get_and_get_active() {
        let mut container = BuiltInFunctionContainer::new();
        container.add("on", noop(true)).unwrap();
        container.add("off", noop(false)).unwrap();

        assert!(container.get("off").is_ok());
        assert!(container.get_active("on").is_ok());
        assert!(matches!(
            container.get_active("off"),
            Err(BuiltInError::BuiltInFunctionIsNotActive(_))
        ));
        assert!(matches!(container.get("missing"), Err(BuiltInError::FunctionNotFound(_))));
    }

    #[test]
    fn test_replace_and_remove() {
        let mut container = BuiltInFunctionContainer::new();
        container.add("a", noop(false)).unwrap();
        container.add("b", noop(true)).unwrap();

        container.replace("a", noop(true)).unwrap();
        assert!(container.get_active("a").is_ok());
        assert!(matches!(container.replace("c", noop(true)), Err(BuiltInError::FunctionNotFound(_))));

        assert!(container.remove("a").is_some());
        assert!(container.remove("a").is_none());
        assert_eq!(container.keys().collect::<Vec<_>>(), vec!["b"]);
        assert!(!container.is_empty());
    }
}
