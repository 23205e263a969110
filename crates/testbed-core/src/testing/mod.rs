//! Testing extension: owns the registry of test suites.

mod suites;

pub use suites::{
    IntegrationTestSuite, JvmTestSuite, integration_test_suite, jvm_test_suite,
    register_builtin_types,
};

use tracing::debug;

use testbed_protocols::TestSuite;
use testbed_protocols::error::RegistryError;

use crate::registry::PolymorphicRegistry;

/// Owns the test suite registry and hands it out explicitly.
pub struct TestingExtension {
    test_suites: PolymorphicRegistry<dyn TestSuite>,
}

impl TestingExtension {
    /// Wrap an existing registry.
    pub fn new(test_suites: PolymorphicRegistry<dyn TestSuite>) -> Self {
        Self { test_suites }
    }

    /// Create an extension with the built-in suite types bound and
    /// [`JvmTestSuite`] as the default type.
    pub fn with_builtin_types() -> Result<Self, RegistryError> {
        let test_suites = PolymorphicRegistry::new(JvmTestSuite::TYPE);
        register_builtin_types(&test_suites)?;
        debug!("Testing extension ready with {} suite types", test_suites.bindings().len());
        Ok(Self::new(test_suites))
    }

    /// The test suite registry.
    pub fn test_suites(&self) -> &PolymorphicRegistry<dyn TestSuite> {
        &self.test_suites
    }
}
