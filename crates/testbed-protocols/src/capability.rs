//! Base capability shared by every registry element.

use std::any::Any;

/// Trait for elements that can be held by a polymorphic registry.
///
/// The registry is generic over a trait object (e.g. `dyn TestSuite`) whose
/// trait extends `Capability`. The `Any` accessors let callers recover the
/// concrete element type after realization.
pub trait Capability: Send + Sync + 'static {
    /// Returns the name this element was declared under.
    fn name(&self) -> &str;

    /// Get self as Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Get mutable self as Any for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
