//! # Testbed Protocols
//!
//! Protocol definitions (traits) shared by the Testbed crates.
//! Contains only interface definitions and error types - no registry logic.
//!
//! ## Core Traits
//!
//! - [`Capability`] - Base trait every registry element implements
//! - [`TestSuite`] - Capability set of the test suites held by the testing extension

pub mod capability;
pub mod error;
pub mod suite;
pub mod types;

pub use capability::Capability;
pub use error::{BoxError, RegistryError, SharedError};
pub use suite::TestSuite;
pub use types::{RealizationState, SuiteDescriptor};
