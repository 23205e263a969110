//! Error types for the Testbed protocol layer.

mod registry;

pub use registry::*;
