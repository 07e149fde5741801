//! Handle assignment for provided resources.
//!
//! Every `(provider, resource name)` pair is assigned a handle when its
//! provider is created. A handle is the index of the pair's slot in the
//! thread-local store (see [`context`](crate::context)); it is assigned in
//! registration order and never changes or gets reused for the life of the
//! process. Decorated callables look their handles up once, at plan time.

use core::sync::atomic::{AtomicUsize, Ordering};
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::LazyLock;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Process-unique identity of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(usize);

impl ProviderId {
    /// Allocates a fresh identity.
    pub(crate) fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl core::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "provider#{}", self.0)
    }
}

/// Index of a resource slot in the thread-local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    /// Returns the slot index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur when looking up handles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The pair was never registered.
    #[error("no handle registered for resource `{resource}` of {provider}")]
    UnknownResource {
        /// The provider that was queried.
        provider: ProviderId,
        /// The resource name that was queried.
        resource: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// HandleRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Table of `(provider, resource name)` pairs to handles.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    mapping: HashMap<(ProviderId, &'static str), Handle>,
    next: usize,
}

impl HandleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns handles to every name the provider supplies.
    ///
    /// Handles come from a counter that only moves forward. A pair that is
    /// already registered, including a name repeated in `names`, keeps the
    /// handle it was first given.
    pub fn register(&mut self, provider: ProviderId, names: &[&'static str]) -> Vec<Handle> {
        names
            .iter()
            .map(|&name| {
                *self.mapping.entry((provider, name)).or_insert_with(|| {
                    let handle = Handle(self.next);
                    self.next += 1;
                    handle
                })
            })
            .collect()
    }

    /// Looks up the handle of a pair.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResource`] if the pair was never registered.
    pub fn handle_of(&self, provider: ProviderId, name: &str) -> Result<Handle, RegistryError> {
        self.mapping
            .get(&(provider, name))
            .copied()
            .ok_or_else(|| RegistryError::UnknownResource {
                provider,
                resource: name.to_string(),
            })
    }

    /// Returns the number of handles assigned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.next
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-wide registry
// ─────────────────────────────────────────────────────────────────────────────

static REGISTRY: LazyLock<RwLock<HandleRegistry>> =
    LazyLock::new(|| RwLock::new(HandleRegistry::new()));

/// Registers a provider's names with the process-wide registry.
pub fn register_provider(provider: ProviderId, names: &[&'static str]) -> Vec<Handle> {
    let handles = REGISTRY.write().register(provider, names);
    tracing::debug!(
        %provider,
        resources = ?names,
        handles = ?handles,
        "provider registered"
    );
    handles
}

/// Looks up a handle in the process-wide registry.
///
/// # Errors
///
/// Returns [`RegistryError::UnknownResource`] if the pair was never registered.
pub fn handle_of(provider: ProviderId, name: &str) -> Result<Handle, RegistryError> {
    REGISTRY.read().handle_of(provider, name)
}

/// Returns how many handles the process-wide registry has assigned.
#[must_use]
pub fn registered_handles() -> usize {
    REGISTRY.read().len()
}
