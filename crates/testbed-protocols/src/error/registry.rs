//! Registry errors.

use std::sync::Arc;

use thiserror::Error;

/// Error returned by user-supplied factories and configuration actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared form of [`BoxError`], cached by failed entries and handed out on
/// every later access.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Name already declared: {name}")]
    DuplicateName { name: String },

    #[error("Type already bound to a different factory: {subtype}")]
    DuplicateBinding { subtype: String },

    #[error("Unknown type: {subtype}")]
    UnknownType {
        subtype: String,
        /// Entry being declared when the lookup failed, if any.
        name: Option<String>,
    },

    #[error("Entry not found: {name}")]
    NotFound { name: String },

    #[error("Entry {name} ({subtype}) is already realized")]
    AlreadyRealized { name: String, subtype: String },

    #[error("Failed to realize {name} ({subtype}): {source}")]
    Realization {
        name: String,
        subtype: String,
        #[source]
        source: SharedError,
    },

    #[error("Entry {name} ({subtype}) was requested while it was being realized")]
    ReentrantRealization { name: String, subtype: String },

    #[error("Entry {name} is not a {expected}")]
    TypeMismatch { name: String, expected: String },
}

impl RegistryError {
    /// Wrap a factory or action failure for the given entry.
    pub fn realization(
        name: impl Into<String>,
        subtype: impl Into<String>,
        cause: BoxError,
    ) -> Self {
        Self::Realization {
            name: name.into(),
            subtype: subtype.into(),
            source: Arc::from(cause),
        }
    }
}
