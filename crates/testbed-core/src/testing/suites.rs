//! Built-in test suite types.

use std::any::Any;

use serde::Deserialize;
use serde_json::Value;

use testbed_protocols::error::{BoxError, RegistryError};
use testbed_protocols::{Capability, SuiteDescriptor, TestSuite};

use crate::registry::{PolymorphicRegistry, TypeBinding};

/// Arguments accepted by the built-in suite factories.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuiteArgs {
    targets: Vec<String>,
    framework: Option<String>,
    requires: Vec<String>,
}

impl SuiteArgs {
    fn parse(args: &Value) -> Result<Self, BoxError> {
        if args.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(args.clone())?)
    }
}

/// Unit test suite running on the JVM test runner.
#[derive(Debug, Clone)]
pub struct JvmTestSuite {
    name: String,
    targets: Vec<String>,
    framework: Option<String>,
}

impl JvmTestSuite {
    pub const TYPE: &'static str = "test-suite";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            targets: Vec::new(),
            framework: None,
        }
    }
}

impl Capability for JvmTestSuite {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TestSuite for JvmTestSuite {
    fn suite_type(&self) -> &str {
        Self::TYPE
    }

    fn targets(&self) -> &[String] {
        &self.targets
    }

    fn set_targets(&mut self, targets: Vec<String>) {
        self.targets = targets;
    }

    fn framework(&self) -> Option<&str> {
        self.framework.as_deref()
    }

    fn use_framework(&mut self, framework: String) {
        self.framework = Some(framework);
    }
}

/// Suite that runs against assembled components and may depend on other suites.
#[derive(Debug, Clone)]
pub struct IntegrationTestSuite {
    suite: JvmTestSuite,
    requires: Vec<String>,
}

impl IntegrationTestSuite {
    pub const TYPE: &'static str = "integration-test-suite";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            suite: JvmTestSuite::new(name),
            requires: Vec::new(),
        }
    }

    /// Suites that must pass before this one runs.
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn require(&mut self, suite: impl Into<String>) {
        let suite = suite.into();
        if !self.requires.contains(&suite) {
            self.requires.push(suite);
        }
    }
}

impl Capability for IntegrationTestSuite {
    fn name(&self) -> &str {
        self.suite.name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TestSuite for IntegrationTestSuite {
    fn suite_type(&self) -> &str {
        Self::TYPE
    }

    fn targets(&self) -> &[String] {
        self.suite.targets()
    }

    fn set_targets(&mut self, targets: Vec<String>) {
        self.suite.set_targets(targets);
    }

    fn framework(&self) -> Option<&str> {
        self.suite.framework()
    }

    fn use_framework(&mut self, framework: String) {
        self.suite.use_framework(framework);
    }

    fn descriptor(&self) -> SuiteDescriptor {
        SuiteDescriptor {
            suite_type: Self::TYPE.to_string(),
            requires: self.requires.clone(),
            ..self.suite.descriptor()
        }
    }
}

/// Factory for [`JvmTestSuite`].
pub fn jvm_test_suite(name: &str, args: &Value) -> Result<Box<dyn TestSuite>, BoxError> {
    let args = SuiteArgs::parse(args)?;
    let mut suite = JvmTestSuite::new(name);
    suite.targets = args.targets;
    suite.framework = args.framework;
    Ok(Box::new(suite))
}

/// Factory for [`IntegrationTestSuite`].
pub fn integration_test_suite(name: &str, args: &Value) -> Result<Box<dyn TestSuite>, BoxError> {
    let args = SuiteArgs::parse(args)?;
    let mut suite = IntegrationTestSuite::new(name);
    suite.suite.targets = args.targets;
    suite.suite.framework = args.framework;
    for required in args.requires {
        suite.require(required);
    }
    Ok(Box::new(suite))
}

/// Bind the built-in suite types. Calling it again on the same registry is a no-op.
pub fn register_builtin_types(
    registry: &PolymorphicRegistry<dyn TestSuite>,
) -> Result<(), RegistryError> {
    registry.register_binding(TypeBinding::new(JvmTestSuite::TYPE, jvm_test_suite))?;
    registry.register_binding(
        TypeBinding::new(IntegrationTestSuite::TYPE, integration_test_suite)
            .extends(JvmTestSuite::TYPE),
    )?;
    Ok(())
}
