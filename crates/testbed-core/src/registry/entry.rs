//! Registry entries and their realization state machine.
//!
//! `Declared` -> `Configuring` -> `Realized` | `Failed`. The slot lock is only
//! held to inspect or swap the state; factories and actions run without it so
//! they may call back into the registry.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use tracing::{debug, warn};

use testbed_protocols::error::{BoxError, RegistryError};
use testbed_protocols::types::RealizationState;
use testbed_protocols::Capability;

use super::binding::Factory;

/// Per-entry configuration action, applied once.
pub(crate) type Action<T> = Box<dyn FnOnce(&mut T) -> Result<(), BoxError> + Send>;

/// Configure-each action, shared by every matching entry.
pub(crate) type SharedAction<T> = Arc<dyn Fn(&mut T) -> Result<(), BoxError> + Send + Sync>;

/// Everything needed to build an entry, resolved when realization starts.
pub(crate) struct Recipe<T: ?Sized> {
    pub(crate) factory: Factory<T>,
    pub(crate) rules: Vec<SharedAction<T>>,
}

enum Slot<T: ?Sized> {
    Declared { args: Value, actions: Vec<Action<T>> },
    Configuring { owner: ThreadId },
    Realized(Arc<T>),
    Failed(RegistryError),
}

/// One declared element.
pub(crate) struct Entry<T: ?Sized> {
    name: String,
    subtype: String,
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T: ?Sized + Capability> Entry<T> {
    pub(crate) fn new(name: String, subtype: String, args: Value) -> Self {
        Self {
            name,
            subtype,
            slot: Mutex::new(Slot::Declared {
                args,
                actions: Vec::new(),
            }),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn subtype(&self) -> &str {
        &self.subtype
    }

    pub(crate) fn state(&self) -> RealizationState {
        match &*self.slot.lock() {
            Slot::Declared { .. } => RealizationState::Declared,
            Slot::Configuring { .. } => RealizationState::Configuring,
            Slot::Realized(_) => RealizationState::Realized,
            Slot::Failed(_) => RealizationState::Failed,
        }
    }

    /// Queue an action. Only declared entries accept new actions.
    pub(crate) fn push_action(&self, action: Action<T>) -> Result<(), RegistryError> {
        match &mut *self.slot.lock() {
            Slot::Declared { actions, .. } => {
                actions.push(action);
                Ok(())
            }
            _ => Err(self.already_realized()),
        }
    }

    pub(crate) fn already_realized(&self) -> RegistryError {
        RegistryError::AlreadyRealized {
            name: self.name.clone(),
            subtype: self.subtype.clone(),
        }
    }

    /// Return the realized instance, building it first if needed.
    ///
    /// `prepare` is only called by the thread that performs the realization.
    /// Other threads block until the outcome is published; the realizing
    /// thread itself gets [`RegistryError::ReentrantRealization`].
    pub(crate) fn realize<P>(&self, prepare: P) -> Result<Arc<T>, RegistryError>
    where
        P: FnOnce() -> Result<Recipe<T>, RegistryError>,
    {
        let current = thread::current().id();
        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                Slot::Realized(instance) => return Ok(Arc::clone(instance)),
                Slot::Failed(error) => return Err(error.clone()),
                Slot::Configuring { owner } => {
                    if *owner == current {
                        return Err(RegistryError::ReentrantRealization {
                            name: self.name.clone(),
                            subtype: self.subtype.clone(),
                        });
                    }
                }
                Slot::Declared { .. } => break,
            }
            self.ready.wait(&mut slot);
        }

        let Slot::Declared { args, actions } =
            std::mem::replace(&mut *slot, Slot::Configuring { owner: current })
        else {
            unreachable!("entry left the declared state while its lock was held");
        };
        drop(slot);

        debug!(name = %self.name, subtype = %self.subtype, "Realizing entry");
        let mut in_flight = InFlight {
            entry: self,
            published: false,
        };

        let outcome = match prepare() {
            Ok(recipe) => self
                .build(recipe, &args, actions)
                .map_err(|cause| RegistryError::realization(&self.name, &self.subtype, cause)),
            Err(error) => Err(error),
        };

        match &outcome {
            Ok(_) => debug!(name = %self.name, subtype = %self.subtype, "Entry realized"),
            Err(error) => warn!(
                name = %self.name,
                subtype = %self.subtype,
                error = %error,
                "Realization failed"
            ),
        }

        in_flight.publish(match &outcome {
            Ok(instance) => Slot::Realized(Arc::clone(instance)),
            Err(error) => Slot::Failed(error.clone()),
        });
        outcome
    }

    fn build(
        &self,
        recipe: Recipe<T>,
        args: &Value,
        actions: Vec<Action<T>>,
    ) -> Result<Arc<T>, BoxError> {
        let mut instance = (recipe.factory)(self.name.as_str(), args)?;
        if instance.name() != self.name {
            return Err(format!(
                "factory for {} produced an element named {}",
                self.subtype,
                instance.name()
            )
            .into());
        }

        for action in actions {
            action(&mut *instance)?;
        }
        for rule in &recipe.rules {
            rule(&mut *instance)?;
        }

        Ok(Arc::from(instance))
    }

    fn publish(&self, outcome: Slot<T>) {
        *self.slot.lock() = outcome;
        self.ready.notify_all();
    }
}

/// Marks the entry failed if a factory or action unwinds before the outcome is published.
struct InFlight<'a, T: ?Sized + Capability> {
    entry: &'a Entry<T>,
    published: bool,
}

impl<T: ?Sized + Capability> InFlight<'_, T> {
    fn publish(&mut self, outcome: Slot<T>) {
        self.published = true;
        self.entry.publish(outcome);
    }
}

impl<T: ?Sized + Capability> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.published {
            let error = RegistryError::realization(
                &self.entry.name,
                &self.entry.subtype,
                "realization panicked".into(),
            );
            self.entry.publish(Slot::Failed(error));
        }
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
