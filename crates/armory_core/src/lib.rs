//! The resolution engine behind Armory.
//!
//! `armory_core` provides the primitives for scoped dependency injection:
//!
//! - [`resource`] - Resource types and the values they expose
//! - [`registry`] - Process-wide handle assignment for provided resources
//! - [`context`] - Thread-local store of armed payloads and resource slots
//! - [`provider`] - Providers and their arming scopes
//! - [`spec`] - Factory specifications and the `INJECTED` marker
//! - [`mod@inject`] - Injection builder, call plans and dynamic callables
//! - [`direct`] - Providers bound to one fixed payload
//! - [`config`] - Process-level injection settings
//!
//! # Flow
//!
//! 1. A provider is created over a resource type, which assigns one handle per
//!    exposed value.
//! 2. Callables are decorated. Decoration validates the declaration and bakes
//!    handles into an [`InjectionPlan`](inject::InjectionPlan).
//! 3. Arming the provider publishes a payload's values into the current
//!    thread's slots for the lifetime of the returned guard.
//! 4. Decorated callables read their injected parameters from those slots.
//!
//! # Example
//!
//! ```
//! use std::sync::LazyLock;
//! use armory_core::prelude::*;
//!
//! #[derive(Resource)]
//! struct Pair {
//!     a: i64,
//!     b: i64,
//! }
//!
//! static PAIR: LazyLock<InstanceProvider<Pair>> = LazyLock::new(|| create_provider(false));
//!
//! #[inject(PAIR)]
//! fn sum(#[injected] a: i64, #[injected] b: i64) -> i64 {
//!     a + b
//! }
//!
//! let armed = PAIR.arm(Pair { a: 1, b: 2 }).unwrap();
//! assert_eq!(sum(INJECTED, INJECTED).unwrap(), 3);
//! assert_eq!(sum(10.into(), INJECTED).unwrap(), 12);
//! drop(armed);
//!
//! assert!(sum(INJECTED, INJECTED).is_err());
//! ```

// Self-reference so macro-generated `armory_core::` paths resolve inside this crate.
extern crate self as armory_core;

/// Process-level injection settings.
pub mod config;

/// Thread-local store of armed payloads and resource slots.
pub mod context;

/// Providers bound to one fixed payload.
pub mod direct;

/// Injection builder, call plans and dynamic callables.
pub mod inject;

/// Providers and arming scopes.
pub mod provider;

/// Handle assignment for provided resources.
pub mod registry;

/// Resource types and their exposed values.
pub mod resource;

/// Factory specifications and call-site markers.
pub mod spec;

#[doc(hidden)]
pub mod __private {
    pub use linkme;
}

/// Re-export the derive and attribute macros.
pub use armory_core_macros::{
    Factory, Resource, inject, inject_methods, inject_methods_with_suffix, inject_with_suffix,
};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::direct::*;
    pub use crate::inject::*;
    pub use crate::provider::*;
    pub use crate::registry::{Handle, ProviderId};
    pub use crate::resource::*;
    pub use crate::spec::*;
    pub use armory_core_macros::{
        Factory, Resource, inject, inject_methods, inject_methods_with_suffix,
        inject_with_suffix,
    };
}
