//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    /// Declared test suites, in declaration order.
    #[serde(default)]
    pub suites: Vec<SuiteConfig>,

    /// Rules applied to every suite of a type.
    #[serde(default)]
    pub conventions: Vec<ConventionConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Emit console output as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Subtype declared by suites without an explicit `type`.
    #[serde(default = "default_type")]
    pub default_type: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_type: default_type(),
        }
    }
}

fn default_type() -> String {
    "test-suite".to_string()
}

/// A declared test suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub name: String,

    /// Subtype; the registry default when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub suite_type: Option<String>,

    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// Construction arguments passed to the suite factory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

/// Configure-each rule for every suite assignable to `suite_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConventionConfig {
    #[serde(rename = "type")]
    pub suite_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// Targets appended to each matching suite.
    #[serde(default)]
    pub targets: Vec<String>,
}

impl Config {
    /// Default config file location (`~/.testbed/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".testbed")
            .join("config.toml")
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
