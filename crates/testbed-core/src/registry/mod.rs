//! Polymorphic named registry.

mod binding;
mod container;
mod entry;
mod handle;

pub use binding::{Factory, TypeBinding};
pub use container::PolymorphicRegistry;
pub use handle::{EntryHandle, TypedView};
