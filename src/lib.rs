//! Scoped dependency injection for Rust.
//!
//! Providers expose the fields of a resource type, callables declare which of
//! their parameters are injected, and arming a provider with a payload makes
//! those values available to every decorated callable on the current thread.

pub use armory_core;
pub use armory_core::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use armory_core::prelude::*;
}
