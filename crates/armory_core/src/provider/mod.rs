//! Providers and arming scopes.
//!
//! A provider exposes the names of a resource type and supplies their values
//! from whatever payload is armed on the calling thread:
//!
//! - [`Provider`] - The object-safe provider capability
//! - [`InstanceProvider`] - The instance-backed provider, built by [`create_provider`]
//! - [`Armed`] - Scope guard publishing a payload until dropped
//! - [`AsProvider`] - Conversion of provider statics into `&'static dyn Provider`
//!
//! # Arming
//!
//! Arming publishes the payload's values under the provider's handles on the
//! current thread. The returned guard retracts them when it goes out of scope,
//! whether the scope returns normally or unwinds.
//!
//! ```
//! use std::sync::LazyLock;
//! use armory_core::prelude::*;
//!
//! #[derive(Resource)]
//! struct Settings {
//!     verbose: bool,
//! }
//!
//! static SETTINGS: LazyLock<InstanceProvider<Settings>> =
//!     LazyLock::new(|| create_provider(false));
//!
//! {
//!     let _armed = SETTINGS.arm(Settings { verbose: true }).unwrap();
//!     assert!(SETTINGS.provided_payload().unwrap().verbose);
//! }
//!
//! assert!(SETTINGS.provided_payload().is_none());
//! ```

mod instance;

pub use instance::{InstanceProvider, create_provider};

use crate::context;
use crate::registry::{Handle, ProviderId};
use core::marker::PhantomData;
use hashbrown::HashSet;
use std::sync::LazyLock;

pub use crate::resource::Payload;
use crate::resource::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur when arming a provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArmError {
    /// The payload is not an instance of the provider's resource type.
    #[error("invalid payload: expected an instance of `{expected}`")]
    InvalidPayload {
        /// The provider's resource type.
        expected: &'static str,
    },

    /// The provider is already armed on this thread.
    #[error("cannot arm provider of `{resource}` twice on the same thread")]
    CannotArmTwice {
        /// The provider's resource type.
        resource: &'static str,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// A source of named resource values.
///
/// Providers live for the whole process and are usually stored in statics.
/// The set of provided names is fixed at creation; the values come from the
/// payload armed on the calling thread.
pub trait Provider: Send + Sync + 'static {
    /// Returns the process-unique identity of this provider.
    fn id(&self) -> ProviderId;

    /// Returns the name of the resource type payloads must have.
    fn resource_type_name(&self) -> &'static str;

    /// Returns the names of the resources this provider supplies.
    fn provides(&self) -> &HashSet<&'static str>;

    /// Returns whether re-arming with the identical payload is a no-op.
    fn allow_idempotent_rearming(&self) -> bool;

    /// Returns the payload armed on the calling thread, if any.
    fn provided(&self) -> Option<Payload> {
        context::armed_payload(self.id())
    }

    /// Reads the resource called `name` off a payload.
    ///
    /// Returns `None` if the payload has the wrong type or does not expose `name`.
    fn resource_of(&self, payload: &Payload, name: &str) -> Option<Value>;

    /// Arms the provider with a type-erased payload.
    ///
    /// # Errors
    ///
    /// - [`ArmError::InvalidPayload`] if the payload has the wrong type.
    /// - [`ArmError::CannotArmTwice`] if the provider is already armed on this
    ///   thread with another payload, or re-arming is not allowed.
    fn arm_dyn(&self, payload: Payload) -> Result<Armed<'_>, ArmError>;
}

impl core::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id())
            .field("resource_type", &self.resource_type_name())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Armed
// ─────────────────────────────────────────────────────────────────────────────

/// Scope guard for an armed provider.
///
/// Dropping the guard retracts the published values and clears the armed
/// record on the thread that armed it. A guard returned for an idempotent
/// re-arm owns nothing and leaves the outer scope's values in place.
///
/// The guard is `!Send`: it must be dropped on the arming thread.
#[must_use = "the provider is disarmed as soon as the guard is dropped"]
pub struct Armed<'a> {
    provider: ProviderId,
    handles: &'a [Handle],
    owns: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a> Armed<'a> {
    pub(crate) fn owning(provider: ProviderId, handles: &'a [Handle]) -> Self {
        Self {
            provider,
            handles,
            owns: true,
            _not_send: PhantomData,
        }
    }

    pub(crate) fn inert(provider: ProviderId) -> Self {
        Self {
            provider,
            handles: &[],
            owns: false,
            _not_send: PhantomData,
        }
    }

    /// Returns the armed provider's identity.
    #[must_use]
    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// Returns `false` for guards of idempotent re-arms.
    #[must_use]
    pub fn owns_scope(&self) -> bool {
        self.owns
    }
}

impl Drop for Armed<'_> {
    fn drop(&mut self) {
        if self.owns {
            context::retract(self.provider, self.handles);
            tracing::debug!(provider = %self.provider, "provider disarmed");
        }
    }
}

impl core::fmt::Debug for Armed<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Armed")
            .field("provider", &self.provider)
            .field("owns", &self.owns)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AsProvider
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion of a provider static into a provider trait object.
///
/// Implemented for [`InstanceProvider`] and for lazily initialised statics
/// wrapping one, so both can be named in `#[inject(...)]`.
pub trait AsProvider {
    /// Returns the provider as a trait object.
    fn as_provider(&'static self) -> &'static dyn Provider;
}

impl<T: AsProvider, F: FnOnce() -> T> AsProvider for LazyLock<T, F> {
    fn as_provider(&'static self) -> &'static dyn Provider {
        LazyLock::force(self).as_provider()
    }
}

/// Returns a provider static as a trait object.
#[must_use]
pub fn provider<P: AsProvider>(provider: &'static P) -> &'static dyn Provider {
    provider.as_provider()
}
