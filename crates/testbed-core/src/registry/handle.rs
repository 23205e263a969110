//! Handles returned by declaration and type-scoped views.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use testbed_protocols::Capability;
use testbed_protocols::error::{BoxError, RegistryError};
use testbed_protocols::types::RealizationState;

use super::container::PolymorphicRegistry;

/// Handle to a declared entry, valid for later configuration and access.
pub struct EntryHandle<'r, T: ?Sized + Capability> {
    registry: &'r PolymorphicRegistry<T>,
    name: String,
    subtype: String,
}

impl<'r, T: ?Sized + Capability> EntryHandle<'r, T> {
    pub(crate) fn new(registry: &'r PolymorphicRegistry<T>, name: String, subtype: String) -> Self {
        Self {
            registry,
            name,
            subtype,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Queue a configuration action.
    pub fn configure<F>(&self, action: F) -> Result<&Self, RegistryError>
    where
        F: FnOnce(&mut T) -> Result<(), BoxError> + Send + 'static,
    {
        self.registry.configure(&self.name, action)?;
        Ok(self)
    }

    /// Queue an action on the concrete element type.
    pub fn configure_as<S, F>(&self, action: F) -> Result<&Self, RegistryError>
    where
        S: Any,
        F: FnOnce(&mut S) -> Result<(), BoxError> + Send + 'static,
    {
        self.registry.configure_as::<S, F>(&self.name, action)?;
        Ok(self)
    }

    /// Realize (if needed) and return the element.
    pub fn get(&self) -> Result<Arc<T>, RegistryError> {
        self.registry.get(&self.name)
    }

    pub fn state(&self) -> Result<RealizationState, RegistryError> {
        self.registry.state(&self.name)
    }

    pub fn is_realized(&self) -> bool {
        matches!(self.state(), Ok(RealizationState::Realized))
    }
}

impl<T: ?Sized + Capability> fmt::Debug for EntryHandle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryHandle")
            .field("name", &self.name)
            .field("subtype", &self.subtype)
            .finish_non_exhaustive()
    }
}

/// Entries assignable to one subtype.
pub struct TypedView<'r, T: ?Sized + Capability> {
    registry: &'r PolymorphicRegistry<T>,
    subtype: String,
}

impl<'r, T: ?Sized + Capability> TypedView<'r, T> {
    pub(crate) fn new(registry: &'r PolymorphicRegistry<T>, subtype: String) -> Self {
        Self { registry, subtype }
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Register an action for every current and future matching entry.
    ///
    /// Applied at realization, after the entry's own actions. Fails with
    /// `AlreadyRealized` if a matching entry has already started realizing.
    pub fn configure_each<F>(&self, action: F) -> Result<(), RegistryError>
    where
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.registry
            .add_rule(Some(self.subtype.clone()), Arc::new(action))
    }

    /// Names of matching entries in declaration order. Never realizes anything.
    pub fn names(&self) -> Vec<String> {
        self.registry
            .matching(Some(&self.subtype))
            .iter()
            .map(|entry| entry.name().to_string())
            .collect()
    }

    /// Realize and return every matching element.
    pub fn get_all(&self) -> Result<Vec<(String, Arc<T>)>, RegistryError> {
        self.registry.get_by_type(&self.subtype)
    }
}

impl<T: ?Sized + Capability> fmt::Debug for TypedView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedView")
            .field("subtype", &self.subtype)
            .finish_non_exhaustive()
    }
}
