//! Thread-local store of armed payloads and resource slots.
//!
//! Each thread owns an independent store holding:
//!
//! - the payload currently armed for each provider, and
//! - a flat slot vector indexed by [`Handle`], holding the value published
//!   for that handle or `None` when no payload supplies it.
//!
//! Arming in one thread is never visible in another. Publishing and
//! retracting are crate-private; they are only reachable through the scope
//! guards returned by [`Provider::arm_dyn`](crate::provider::Provider::arm_dyn)
//! and [`InstanceProvider::arm`](crate::provider::InstanceProvider::arm).

use crate::registry::{Handle, ProviderId};
use crate::resource::{Payload, Value};
use core::cell::RefCell;
use hashbrown::HashMap;

#[derive(Default)]
struct ContextStore {
    armed: HashMap<ProviderId, Payload>,
    resources: Vec<Option<Value>>,
}

thread_local! {
    static STORE: RefCell<ContextStore> = RefCell::new(ContextStore::default());
}

/// Returns the payload armed for the provider on this thread.
#[must_use]
pub fn armed_payload(provider: ProviderId) -> Option<Payload> {
    STORE.with_borrow(|store| store.armed.get(&provider).cloned())
}

/// Returns `true` if the provider is armed on this thread.
#[must_use]
pub fn is_armed(provider: ProviderId) -> bool {
    STORE.with_borrow(|store| store.armed.contains_key(&provider))
}

/// Reads the value published under a handle on this thread.
#[must_use]
pub fn slot(handle: Handle) -> Option<Value> {
    STORE.with_borrow(|store| store.resources.get(handle.index()).cloned().flatten())
}

/// Returns the length of this thread's slot vector.
///
/// The vector grows on demand, so this is at least one past the highest
/// handle ever published on this thread.
#[must_use]
pub fn slot_count() -> usize {
    STORE.with_borrow(|store| store.resources.len())
}

/// Records the payload and fills its handles' slots.
pub(crate) fn publish(provider: ProviderId, payload: Payload, values: Vec<(Handle, Value)>) {
    STORE.with_borrow_mut(|store| {
        store.armed.insert(provider, payload);
        for (handle, value) in values {
            let index = handle.index();
            if index >= store.resources.len() {
                store.resources.resize(index + 1, None);
            }
            store.resources[index] = Some(value);
        }
    });
}

/// Clears the provider's slots and forgets its payload.
pub(crate) fn retract(provider: ProviderId, handles: &[Handle]) {
    // Runs from guard drops; `try_with` tolerates thread-local teardown.
    let removed = STORE.try_with(|cell| {
        let mut store = cell.borrow_mut();
        let payload = store.armed.remove(&provider);
        let mut values: Vec<Value> = Vec::with_capacity(handles.len());
        for handle in handles {
            let slot = store.resources.get_mut(handle.index());
            if let Some(value) = slot.and_then(Option::take) {
                values.push(value);
            }
        }
        (payload, values)
    });
    // Dropped outside the borrow, so `Drop` impls may read the store.
    drop(removed);
}
