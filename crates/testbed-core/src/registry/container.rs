//! The polymorphic named registry.
//!
//! Lock order: `rules` may be held while reading `entries` and `bindings`;
//! no other lock is held while acquiring another, and no registry lock is held
//! while a factory or configuration action runs.

use std::any::{Any, type_name};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use testbed_protocols::Capability;
use testbed_protocols::error::{BoxError, RegistryError};
use testbed_protocols::types::RealizationState;

use super::binding::{BindingTable, TypeBinding};
use super::entry::{Entry, Recipe, SharedAction};
use super::handle::{EntryHandle, TypedView};

/// Configure-each rule. `subtype: None` matches every entry.
struct Rule<T: ?Sized> {
    subtype: Option<String>,
    action: SharedAction<T>,
}

/// Name-keyed container of lazily realized elements of a common capability `T`.
///
/// Entries are declared with a subtype whose [`TypeBinding`] builds the
/// element. Configuration actions queue up until the first access, when the
/// factory runs and every action is applied once, in order.
///
/// # Type Parameters
///
/// * `T` - The capability trait object stored (e.g. `dyn TestSuite`)
pub struct PolymorphicRegistry<T: ?Sized + Capability> {
    default_type: String,
    bindings: RwLock<BindingTable<T>>,
    entries: RwLock<IndexMap<String, Arc<Entry<T>>>>,
    rules: RwLock<Vec<Rule<T>>>,
}

impl<T: ?Sized + Capability> PolymorphicRegistry<T> {
    /// Create an empty registry whose `create(name)` declares `default_type`.
    pub fn new(default_type: impl Into<String>) -> Self {
        Self {
            default_type: default_type.into(),
            bindings: RwLock::new(BindingTable::new()),
            entries: RwLock::new(IndexMap::new()),
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Subtype used by [`create`](Self::create).
    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    /// Register a type binding.
    ///
    /// Re-registering an identical binding is a no-op; a different binding for
    /// a bound subtype fails with `DuplicateBinding`.
    pub fn register_binding(&self, binding: TypeBinding<T>) -> Result<(), RegistryError> {
        let subtype = binding.subtype().to_string();
        let parent = binding.parent().map(str::to_string);
        if self.bindings.write().insert(binding)? {
            debug!(subtype = %subtype, parent = ?parent, "Bound type");
        }
        Ok(())
    }

    /// Bind `subtype` to a factory.
    pub fn register_type<F>(
        &self,
        subtype: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&str, &Value) -> Result<Box<T>, BoxError> + Send + Sync + 'static,
    {
        self.register_binding(TypeBinding::new(subtype, factory))
    }

    /// Bound subtypes in registration order.
    pub fn bindings(&self) -> Vec<String> {
        self.bindings.read().subtypes()
    }

    /// Check if a subtype has a binding.
    pub fn has_type(&self, subtype: &str) -> bool {
        self.bindings.read().contains(subtype)
    }

    /// Declare an entry of the default subtype.
    pub fn create(&self, name: impl Into<String>) -> Result<EntryHandle<'_, T>, RegistryError> {
        self.declare(name.into(), self.default_type.clone(), Value::Null)
    }

    /// Declare an entry of the default subtype. Same as [`create`](Self::create).
    pub fn register(&self, name: impl Into<String>) -> Result<EntryHandle<'_, T>, RegistryError> {
        self.create(name)
    }

    /// Declare an entry of a specific subtype with construction arguments.
    pub fn create_with(
        &self,
        name: impl Into<String>,
        subtype: impl Into<String>,
        args: Value,
    ) -> Result<EntryHandle<'_, T>, RegistryError> {
        self.declare(name.into(), subtype.into(), args)
    }

    /// Return the existing entry named `name`, or declare one of the default subtype.
    pub fn maybe_create(
        &self,
        name: impl Into<String>,
    ) -> Result<EntryHandle<'_, T>, RegistryError> {
        let name = name.into();
        if let Ok(handle) = self.named(&name) {
            return Ok(handle);
        }
        match self.create(name.clone()) {
            Err(RegistryError::DuplicateName { .. }) => self.named(&name),
            other => other,
        }
    }

    fn declare(
        &self,
        name: String,
        subtype: String,
        args: Value,
    ) -> Result<EntryHandle<'_, T>, RegistryError> {
        if self.entries.read().contains_key(&name) {
            return Err(RegistryError::DuplicateName { name });
        }
        if !self.has_type(&subtype) {
            return Err(RegistryError::UnknownType {
                subtype,
                name: Some(name),
            });
        }

        let mut entries = self.entries.write();
        if entries.contains_key(&name) {
            return Err(RegistryError::DuplicateName { name });
        }
        let entry = Arc::new(Entry::new(name.clone(), subtype.clone(), args));
        entries.insert(name.clone(), entry);
        drop(entries);

        debug!(name = %name, subtype = %subtype, "Declared entry");
        Ok(EntryHandle::new(self, name, subtype))
    }

    /// Get a handle to an existing entry.
    pub fn named(&self, name: &str) -> Result<EntryHandle<'_, T>, RegistryError> {
        let entry = self.entry(name)?;
        Ok(EntryHandle::new(
            self,
            entry.name().to_string(),
            entry.subtype().to_string(),
        ))
    }

    /// Queue a configuration action for `name`, applied when it is realized.
    pub fn configure<F>(&self, name: &str, action: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut T) -> Result<(), BoxError> + Send + 'static,
    {
        let entry = self.entry(name)?;
        entry.push_action(Box::new(action))?;
        debug!(name = %name, "Queued configuration action");
        Ok(())
    }

    /// Queue an action that needs the concrete element type `S`.
    ///
    /// If the realized element is not an `S`, realization fails with a
    /// `TypeMismatch` cause.
    pub fn configure_as<S, F>(&self, name: &str, action: F) -> Result<(), RegistryError>
    where
        S: Any,
        F: FnOnce(&mut S) -> Result<(), BoxError> + Send + 'static,
    {
        let entry_name = name.to_string();
        self.configure(name, move |element: &mut T| {
            let concrete = element.as_any_mut().downcast_mut::<S>().ok_or_else(|| {
                RegistryError::TypeMismatch {
                    name: entry_name,
                    expected: type_name::<S>().to_string(),
                }
            })?;
            action(concrete)
        })
    }

    /// Register an action applied to every current and future entry.
    pub fn configure_each<F>(&self, action: F) -> Result<(), RegistryError>
    where
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.add_rule(None, Arc::new(action))
    }

    /// View of the entries assignable to `subtype`.
    pub fn with_type(
        &self,
        subtype: impl Into<String>,
    ) -> Result<TypedView<'_, T>, RegistryError> {
        let subtype = subtype.into();
        self.ensure_type(&subtype)?;
        Ok(TypedView::new(self, subtype))
    }

    /// Realize (if needed) and return the element named `name`.
    pub fn get(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let entry = self.entry(name)?;
        self.realize(&entry)
    }

    /// Like [`get`](Self::get), but an absent name yields `Ok(None)`.
    pub fn find(&self, name: &str) -> Result<Option<Arc<T>>, RegistryError> {
        let entry = self.entries.read().get(name).cloned();
        entry.map(|entry| self.realize(&entry)).transpose()
    }

    /// Realize and return every element assignable to `subtype`, in declaration order.
    ///
    /// Stops at the first entry that fails to realize.
    pub fn get_by_type(&self, subtype: &str) -> Result<Vec<(String, Arc<T>)>, RegistryError> {
        self.ensure_type(subtype)?;
        let mut realized = Vec::new();
        for entry in self.matching(Some(subtype)) {
            let instance = self.realize(&entry)?;
            realized.push((entry.name().to_string(), instance));
        }
        Ok(realized)
    }

    /// Eagerly realize every entry in declaration order, stopping at the first failure.
    pub fn realize_all(&self) -> Result<(), RegistryError> {
        let entries = self.matching(None);
        for entry in &entries {
            self.realize(entry)?;
        }
        info!("Realized {} entries", entries.len());
        Ok(())
    }

    /// All declared names in declaration order. Never realizes anything.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Check if an entry is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Get the number of declared entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Realization state of an entry.
    pub fn state(&self, name: &str) -> Result<RealizationState, RegistryError> {
        Ok(self.entry(name)?.state())
    }

    /// Declared subtype of an entry.
    pub fn subtype_of(&self, name: &str) -> Result<String, RegistryError> {
        Ok(self.entry(name)?.subtype().to_string())
    }

    pub(crate) fn add_rule(
        &self,
        subtype: Option<String>,
        action: SharedAction<T>,
    ) -> Result<(), RegistryError> {
        let mut rules = self.rules.write();
        if let Some(entry) = self
            .matching(subtype.as_deref())
            .into_iter()
            .find(|entry| entry.state() != RealizationState::Declared)
        {
            return Err(entry.already_realized());
        }

        debug!(subtype = ?subtype, "Registered configure-each action");
        rules.push(Rule { subtype, action });
        Ok(())
    }

    /// Entries assignable to `subtype` (all entries for `None`), in declaration order.
    pub(crate) fn matching(&self, subtype: Option<&str>) -> Vec<Arc<Entry<T>>> {
        let entries: Vec<_> = self.entries.read().values().cloned().collect();
        let Some(target) = subtype else {
            return entries;
        };
        let bindings = self.bindings.read();
        entries
            .into_iter()
            .filter(|entry| bindings.is_assignable(entry.subtype(), target))
            .collect()
    }

    fn ensure_type(&self, subtype: &str) -> Result<(), RegistryError> {
        if self.has_type(subtype) {
            Ok(())
        } else {
            Err(RegistryError::UnknownType {
                subtype: subtype.to_string(),
                name: None,
            })
        }
    }

    fn entry(&self, name: &str) -> Result<Arc<Entry<T>>, RegistryError> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    fn realize(&self, entry: &Entry<T>) -> Result<Arc<T>, RegistryError> {
        entry.realize(|| self.recipe_for(entry))
    }

    fn recipe_for(&self, entry: &Entry<T>) -> Result<Recipe<T>, RegistryError> {
        let rules: Vec<(Option<String>, SharedAction<T>)> = self
            .rules
            .read()
            .iter()
            .map(|rule| (rule.subtype.clone(), Arc::clone(&rule.action)))
            .collect();

        let bindings = self.bindings.read();
        let factory = bindings
            .get(entry.subtype())
            .map(|binding| Arc::clone(binding.factory()))
            .ok_or_else(|| RegistryError::UnknownType {
                subtype: entry.subtype().to_string(),
                name: Some(entry.name().to_string()),
            })?;
        let rules = rules
            .into_iter()
            .filter(|(subtype, _)| match subtype {
                Some(target) => bindings.is_assignable(entry.subtype(), target),
                None => true,
            })
            .map(|(_, action)| action)
            .collect();

        Ok(Recipe { factory, rules })
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
