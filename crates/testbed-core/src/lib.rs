//! # Testbed Core
//!
//! Polymorphic named registry and the testing extension that owns one.
//!
//! ## Components
//!
//! - [`PolymorphicRegistry`] - Name-keyed container of lazily realized elements
//! - [`TypeBinding`] - Subtype marker plus the factory that builds it
//! - [`TestingExtension`] - Owns the registry of test suites
//!
//! Elements are declared first and realized on first access: the bound
//! factory runs, then every accumulated configuration action, exactly once.

pub mod registry;
pub mod testing;

pub use registry::{EntryHandle, PolymorphicRegistry, TypeBinding, TypedView};
pub use testing::{IntegrationTestSuite, JvmTestSuite, TestingExtension};
