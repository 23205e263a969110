//! Configuration validation.

use std::collections::HashSet;

use crate::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration against the suite types the registry can build.
    pub fn validate(config: &Config, known_types: &[&str]) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_logging(config, &mut result);
        Self::validate_registry(config, known_types, &mut result);
        Self::validate_suites(config, known_types, &mut result);
        Self::validate_conventions(config, known_types, &mut result);

        result
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }
    }

    fn validate_registry(config: &Config, known_types: &[&str], result: &mut ValidationResult) {
        let default_type = config.registry.default_type.as_str();
        if !known_types.contains(&default_type) {
            result.add_error(ValidationError::new(
                "registry.default_type",
                format!("Unknown suite type '{}'", default_type),
            ));
        }
    }

    fn validate_suites(config: &Config, known_types: &[&str], result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (index, suite) in config.suites.iter().enumerate() {
            let path = format!("suites[{}]", index);

            if suite.name.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    "Suite name cannot be empty",
                ));
            } else if !seen.insert(suite.name.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate suite name '{}'", suite.name),
                ));
            }

            if let Some(ref suite_type) = suite.suite_type {
                if !known_types.contains(&suite_type.as_str()) {
                    result.add_error(ValidationError::new(
                        format!("{}.type", path),
                        format!("Unknown suite type '{}'", suite_type),
                    ));
                }
            }

            if let Some(ref args) = suite.args {
                if !args.is_object() {
                    result.add_error(ValidationError::new(
                        format!("{}.args", path),
                        "args must be a table",
                    ));
                }
            }

            if suite.targets.is_empty() {
                result.add_warning(ValidationWarning::new(
                    format!("{}.targets", path),
                    format!("Suite '{}' has no targets", suite.name),
                ));
            }
        }
    }

    fn validate_conventions(config: &Config, known_types: &[&str], result: &mut ValidationResult) {
        for (index, convention) in config.conventions.iter().enumerate() {
            if !known_types.contains(&convention.suite_type.as_str()) {
                result.add_error(ValidationError::new(
                    format!("conventions[{}].type", index),
                    format!("Unknown suite type '{}'", convention.suite_type),
                ));
            }

            if convention.framework.is_none() && convention.targets.is_empty() {
                result.add_warning(ValidationWarning::new(
                    format!("conventions[{}]", index),
                    "Convention sets neither a framework nor targets",
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
