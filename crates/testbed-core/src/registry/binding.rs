//! Type bindings: subtype markers and the factories that build them.

use std::any::TypeId;
use std::fmt;
use std::mem;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use testbed_protocols::error::{BoxError, RegistryError};

/// Factory building an element from its declared name and construction arguments.
pub type Factory<T> = Arc<dyn Fn(&str, &Value) -> Result<Box<T>, BoxError> + Send + Sync>;

/// Identity of a bound factory.
///
/// Zero-sized factories (fn items, non-capturing closures) are identified by
/// type, so binding the same function twice is recognised as identical.
/// Anything else is identified by its shared allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FactoryId {
    Type(TypeId),
    Shared(usize),
}

impl FactoryId {
    fn of_shared<T: ?Sized>(factory: &Factory<T>) -> Self {
        Self::Shared(Arc::as_ptr(factory) as *const () as usize)
    }
}

/// Associates a subtype marker with the factory that constructs it.
///
/// A binding may extend a parent subtype. Entries of the child subtype are then
/// assignable to the parent for [`get_by_type`](super::PolymorphicRegistry::get_by_type)
/// and [`with_type`](super::PolymorphicRegistry::with_type).
pub struct TypeBinding<T: ?Sized> {
    subtype: String,
    parent: Option<String>,
    factory: Factory<T>,
    id: FactoryId,
}

impl<T: ?Sized + 'static> TypeBinding<T> {
    /// Create a binding from a factory closure or function.
    pub fn new<F>(subtype: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Box<T>, BoxError> + Send + Sync + 'static,
    {
        let mut binding = Self::from_factory(subtype, Arc::new(factory));
        if mem::size_of::<F>() == 0 {
            binding.id = FactoryId::Type(TypeId::of::<F>());
        }
        binding
    }

    /// Create a binding from an already shared factory.
    ///
    /// Registering the same subtype twice with the same shared factory is a no-op.
    pub fn from_factory(subtype: impl Into<String>, factory: Factory<T>) -> Self {
        Self {
            subtype: subtype.into(),
            parent: None,
            id: FactoryId::of_shared(&factory),
            factory,
        }
    }

    /// Declare the parent subtype this binding is assignable to.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

impl<T: ?Sized> TypeBinding<T> {
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn factory(&self) -> &Factory<T> {
        &self.factory
    }

    /// Same subtype, same parent and the same factory.
    pub(crate) fn is_identical(&self, other: &Self) -> bool {
        self.subtype == other.subtype && self.parent == other.parent && self.id == other.id
    }
}

impl<T: ?Sized> Clone for TypeBinding<T> {
    fn clone(&self) -> Self {
        Self {
            subtype: self.subtype.clone(),
            parent: self.parent.clone(),
            factory: Arc::clone(&self.factory),
            id: self.id,
        }
    }
}

impl<T: ?Sized> fmt::Debug for TypeBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBinding")
            .field("subtype", &self.subtype)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

/// Bindings in registration order.
pub(crate) struct BindingTable<T: ?Sized> {
    bindings: IndexMap<String, TypeBinding<T>>,
}

impl<T: ?Sized> BindingTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            bindings: IndexMap::new(),
        }
    }

    /// Insert a binding. Returns `false` when an identical binding was already present.
    pub(crate) fn insert(&mut self, binding: TypeBinding<T>) -> Result<bool, RegistryError> {
        if let Some(existing) = self.bindings.get(binding.subtype()) {
            if existing.is_identical(&binding) {
                return Ok(false);
            }
            return Err(RegistryError::DuplicateBinding {
                subtype: binding.subtype,
            });
        }

        if let Some(parent) = binding.parent() {
            if !self.bindings.contains_key(parent) {
                return Err(RegistryError::UnknownType {
                    subtype: parent.to_string(),
                    name: None,
                });
            }
        }

        self.bindings.insert(binding.subtype.clone(), binding);
        Ok(true)
    }

    pub(crate) fn get(&self, subtype: &str) -> Option<&TypeBinding<T>> {
        self.bindings.get(subtype)
    }

    pub(crate) fn contains(&self, subtype: &str) -> bool {
        self.bindings.contains_key(subtype)
    }

    /// Whether `subtype` equals `target` or extends it through its parent chain.
    pub(crate) fn is_assignable(&self, subtype: &str, target: &str) -> bool {
        let mut current = Some(subtype);
        while let Some(candidate) = current {
            if candidate == target {
                return true;
            }
            current = self.bindings.get(candidate).and_then(|b| b.parent());
        }
        false
    }

    pub(crate) fn subtypes(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_factory(_name: &str, args: &Value) -> Result<Box<u64>, BoxError> {
        Ok(Box::new(args.as_u64().unwrap_or_default()))
    }

    #[test]
    fn test_insert_and_get() {
        let mut table: BindingTable<u64> = BindingTable::new();
        assert!(table.insert(TypeBinding::new("number", number_factory)).unwrap());
        assert!(table.contains("number"));

        let binding = table.get("number").unwrap();
        let built = (binding.factory())("n", &Value::from(7)).unwrap();
        assert_eq!(*built, 7);
    }

    #[test]
    fn test_identical_binding_is_idempotent() {
        let mut table: BindingTable<u64> = BindingTable::new();
        let binding = TypeBinding::new("number", number_factory);

        assert!(table.insert(binding.clone()).unwrap());
        assert!(!table.insert(binding).unwrap());
        assert_eq!(table.subtypes(), vec!["number".to_string()]);
    }

    fn zero_factory(_name: &str, _args: &Value) -> Result<Box<u64>, BoxError> {
        Ok(Box::new(0))
    }

    #[test]
    fn test_same_function_rebinds_as_noop() {
        let mut table: BindingTable<u64> = BindingTable::new();
        assert!(table.insert(TypeBinding::new("number", number_factory)).unwrap());
        assert!(!table.insert(TypeBinding::new("number", number_factory)).unwrap());
        assert_eq!(table.subtypes(), vec!["number".to_string()]);
    }

    #[test]
    fn test_different_factory_is_rejected() {
        let mut table: BindingTable<u64> = BindingTable::new();
        table.insert(TypeBinding::new("number", number_factory)).unwrap();

        let result = table.insert(TypeBinding::new("number", zero_factory));
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateBinding { ref subtype }) if subtype == "number"
        ));
    }

    #[test]
    fn test_capturing_closures_are_distinct() {
        let offset = 5u64;
        let capturing = move || {
            move |_name: &str, args: &Value| -> Result<Box<u64>, BoxError> {
                Ok(Box::new(args.as_u64().unwrap_or_default() + offset))
            }
        };

        let mut table: BindingTable<u64> = BindingTable::new();
        table.insert(TypeBinding::new("number", capturing())).unwrap();
        let result = table.insert(TypeBinding::new("number", capturing()));
        assert!(matches!(result, Err(RegistryError::DuplicateBinding { .. })));
    }

    #[test]
    fn test_different_parent_is_rejected() {
        let mut table: BindingTable<u64> = BindingTable::new();
        let base = TypeBinding::new("base", number_factory);
        let child = TypeBinding::from_factory("child", Arc::clone(base.factory()));
        table.insert(base).unwrap();
        table.insert(child.clone()).unwrap();

        let reparented = child.extends("base");
        assert!(table.insert(reparented).is_err());
    }

    #[test]
    fn test_parent_must_be_bound() {
        let mut table: BindingTable<u64> = BindingTable::new();
        let result = table.insert(TypeBinding::new("child", number_factory).extends("base"));
        assert!(matches!(result, Err(RegistryError::UnknownType { .. })));
        assert!(!table.contains("child"));
    }

    #[test]
    fn test_assignability_follows_parent_chain() {
        let mut table: BindingTable<u64> = BindingTable::new();
        table.insert(TypeBinding::new("base", number_factory)).unwrap();
        table
            .insert(TypeBinding::new("middle", number_factory).extends("base"))
            .unwrap();
        table
            .insert(TypeBinding::new("leaf", number_factory).extends("middle"))
            .unwrap();

        assert!(table.is_assignable("leaf", "leaf"));
        assert!(table.is_assignable("leaf", "middle"));
        assert!(table.is_assignable("leaf", "base"));
        assert!(!table.is_assignable("base", "leaf"));
        assert!(!table.is_assignable("middle", "other"));
    }

    #[test]
    fn test_subtypes_in_registration_order() {
        let mut table: BindingTable<u64> = BindingTable::new();
        table.insert(TypeBinding::new("b", number_factory)).unwrap();
        table.insert(TypeBinding::new("a", number_factory)).unwrap();
        assert_eq!(table.subtypes(), vec!["b".to_string(), "a".to_string()]);
    }
}
