//! Common types shared across the Testbed crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Realization state of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealizationState {
    /// Declared, factory not yet run.
    Declared,
    /// Factory or configuration actions are running.
    Configuring,
    /// Built and configured.
    Realized,
    /// Factory or an action failed; the error is cached.
    Failed,
}

impl fmt::Display for RealizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Declared => "declared",
            Self::Configuring => "configuring",
            Self::Realized => "realized",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Serializable snapshot of a realized test suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteDescriptor {
    pub name: String,
    pub suite_type: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&RealizationState::Configuring).unwrap();
        assert_eq!(json, "\"configuring\"");

        let parsed: RealizationState = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, RealizationState::Failed);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RealizationState::Realized.to_string(), "realized");
    }

    #[test]
    fn test_descriptor_skips_empty_fields() {
        let descriptor = SuiteDescriptor {
            name: "unitTest".to_string(),
            suite_type: "test-suite".to_string(),
            targets: vec!["main".to_string()],
            framework: None,
            requires: Vec::new(),
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["name"], "unitTest");
        assert!(json.get("framework").is_none());
        assert!(json.get("requires").is_none());
    }
}
