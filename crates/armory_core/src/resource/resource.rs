//! The [`Resource`] trait and type-erased value helpers.
//!
//! Values cross the provider boundary type-erased: arming clones each exposed
//! value into a [`Value`], and injection downcasts it back to the parameter's
//! declared type.

use core::any::{Any, TypeId};
use std::sync::Arc;

/// A type-erased resource value.
///
/// Values are shared, so publishing one into several slots or reading it on
/// every call only bumps a reference count.
pub type Value = Arc<dyn Any + Send + Sync>;

/// A type-erased payload armed on a provider.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A type whose instances can be armed on a provider.
///
/// The set of exposed names is fixed for the type. Each name maps to a field
/// or a read-only accessor whose value is cloned out on arming.
///
/// # Deriving
///
/// `#[derive(Resource)]` exposes every named field, except fields whose name
/// starts with `_` and fields marked `#[resource(skip)]`. Accessor methods
/// taking `&self` can be exposed with `#[resource(accessors(name, ...))]`.
///
/// # Manual Implementation
///
/// ```
/// use armory_core::resource::{Resource, Value, into_value};
///
/// struct Endpoint {
///     host: String,
///     port: u16,
/// }
///
/// impl Resource for Endpoint {
///     fn provides() -> &'static [&'static str] {
///         &["host", "port"]
///     }
///
///     fn resource(&self, name: &str) -> Option<Value> {
///         match name {
///             "host" => Some(into_value(self.host.clone())),
///             "port" => Some(into_value(self.port)),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Resource: Send + Sync + 'static {
    /// Returns the names this type exposes, in declaration order.
    fn provides() -> &'static [&'static str];

    /// Reads the exposed value called `name`.
    ///
    /// Returns `None` for names not listed in [`provides`](Self::provides).
    fn resource(&self, name: &str) -> Option<Value>;

    /// Returns the type name for debugging purposes.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Unique identifier for a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(TypeId);

impl ResourceId {
    /// Creates a `ResourceId` for the given type.
    #[must_use]
    pub fn of<T: Resource>() -> Self {
        Self(TypeId::of::<T>())
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.0
    }
}

/// Wraps a value for publication.
#[must_use]
pub fn into_value<T: Send + Sync + 'static>(value: T) -> Value {
    Arc::new(value)
}

/// Reads a clone of the value, if it holds a `T`.
#[must_use]
pub fn read_value<T: Clone + 'static>(value: &Value) -> Option<T> {
    (**value).downcast_ref::<T>().cloned()
}
