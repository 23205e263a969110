//! Test suite capability.

use std::any::Any;
use std::fmt;

use crate::capability::Capability;
use crate::types::SuiteDescriptor;

/// Capability set shared by every test suite held by the testing extension.
pub trait TestSuite: Capability + fmt::Debug {
    /// Subtype marker this suite was built for.
    fn suite_type(&self) -> &str;

    /// Targets (source sets) the suite runs against.
    fn targets(&self) -> &[String];

    /// Replace the target list.
    fn set_targets(&mut self, targets: Vec<String>);

    /// Append a target, ignoring duplicates.
    fn add_target(&mut self, target: String) {
        if !self.targets().contains(&target) {
            let mut targets = self.targets().to_vec();
            targets.push(target);
            self.set_targets(targets);
        }
    }

    /// Test framework in use, if one was selected.
    fn framework(&self) -> Option<&str>;

    /// Select the test framework.
    fn use_framework(&mut self, framework: String);

    /// Snapshot for display and serialization.
    fn descriptor(&self) -> SuiteDescriptor {
        SuiteDescriptor {
            name: self.name().to_string(),
            suite_type: self.suite_type().to_string(),
            targets: self.targets().to_vec(),
            framework: self.framework().map(str::to_string),
            requires: Vec::new(),
        }
    }
}

impl dyn TestSuite {
    /// Downcast to a concrete suite type.
    pub fn downcast_ref<S: Any>(&self) -> Option<&S> {
        self.as_any().downcast_ref::<S>()
    }

    /// Downcast to a concrete suite type, mutably.
    pub fn downcast_mut<S: Any>(&mut self) -> Option<&mut S> {
        self.as_any_mut().downcast_mut::<S>()
    }
}
