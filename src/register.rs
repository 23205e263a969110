//! Suite and convention registration from configuration.

use tracing::{debug, info};

use testbed_config::{Config, ConventionConfig, SuiteConfig};
use testbed_core::testing::register_builtin_types;
use testbed_core::{PolymorphicRegistry, TestingExtension};
use testbed_protocols::TestSuite;
use testbed_protocols::error::RegistryError;

/// Build the testing extension and declare every configured suite.
///
/// Nothing is realized here; suites are built on first access.
pub(crate) fn build_testing_extension(config: &Config) -> Result<TestingExtension, RegistryError> {
    let registry = PolymorphicRegistry::new(config.registry.default_type.clone());
    register_builtin_types(&registry)?;
    let extension = TestingExtension::new(registry);

    for convention in &config.conventions {
        register_convention(&extension, convention)?;
    }
    for suite in &config.suites {
        declare_suite(&extension, suite)?;
    }

    info!(
        "Declared {} suites with {} conventions",
        config.suites.len(),
        config.conventions.len()
    );
    Ok(extension)
}

/// Names of the suite types the builtin registry can build.
pub(crate) fn known_suite_types() -> Result<Vec<String>, RegistryError> {
    Ok(TestingExtension::with_builtin_types()?.test_suites().bindings())
}

fn register_convention(
    extension: &TestingExtension,
    convention: &ConventionConfig,
) -> Result<(), RegistryError> {
    let framework = convention.framework.clone();
    let targets = convention.targets.clone();

    extension
        .test_suites()
        .with_type(convention.suite_type.as_str())?
        .configure_each(move |suite| {
            // Conventions only fill in a framework the suite did not pick.
            if let Some(ref framework) = framework {
                if suite.framework().is_none() {
                    suite.use_framework(framework.clone());
                }
            }
            for target in &targets {
                suite.add_target(target.clone());
            }
            Ok(())
        })?;

    debug!("Registered convention for {}", convention.suite_type);
    Ok(())
}

fn declare_suite(extension: &TestingExtension, suite: &SuiteConfig) -> Result<(), RegistryError> {
    let suites = extension.test_suites();
    let subtype = suite
        .suite_type
        .clone()
        .unwrap_or_else(|| suites.default_type().to_string());
    let args = suite.args.clone().unwrap_or_default();
    let handle = suites.create_with(suite.name.as_str(), subtype, args)?;

    if !suite.targets.is_empty() {
        let targets = suite.targets.clone();
        handle.configure(move |s: &mut (dyn TestSuite + 'static)| {
            for target in targets {
                s.add_target(target);
            }
            Ok(())
        })?;
    }
    if let Some(framework) = suite.framework.clone() {
        handle.configure(move |s: &mut (dyn TestSuite + 'static)| {
            s.use_framework(framework);
            Ok(())
        })?;
    }
    Ok(())
}
