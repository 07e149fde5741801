//! The instance-backed provider.

use super::{Armed, ArmError, AsProvider, Provider};
use crate::context;
use crate::registry::{self, Handle, ProviderId};
use crate::resource::{Payload, Resource, Value};
use core::marker::PhantomData;
use hashbrown::HashSet;
use std::sync::Arc;

/// A provider armed with instances of the resource type `R`.
///
/// Created with [`create_provider`], which registers one handle per exposed
/// name. Typically stored in a `static LazyLock`.
pub struct InstanceProvider<R: Resource> {
    id: ProviderId,
    names: Box<[&'static str]>,
    provides: HashSet<&'static str>,
    handles: Box<[Handle]>,
    allow_idempotent_rearming: bool,
    _marker: PhantomData<fn() -> R>,
}

/// Creates a provider over `R` and registers its handles.
///
/// With `allow_idempotent_rearming`, arming the provider again with the same
/// `Arc` while it is armed on the thread returns an inert guard instead of
/// failing.
#[must_use]
pub fn create_provider<R: Resource>(allow_idempotent_rearming: bool) -> InstanceProvider<R> {
    let id = ProviderId::next();
    let mut provides = HashSet::new();
    let names: Box<[&'static str]> = R::provides()
        .iter()
        .copied()
        .filter(|&name| provides.insert(name))
        .collect();
    let handles = registry::register_provider(id, &names).into_boxed_slice();

    InstanceProvider {
        id,
        names,
        provides,
        handles,
        allow_idempotent_rearming,
        _marker: PhantomData,
    }
}

impl<R: Resource> InstanceProvider<R> {
    /// Arms the provider with a payload on the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::CannotArmTwice`] if the provider is already armed on
    /// this thread, unless idempotent re-arming is allowed and `payload` is
    /// the armed `Arc` itself.
    pub fn arm(&self, payload: impl Into<Arc<R>>) -> Result<Armed<'_>, ArmError> {
        self.arm_typed(payload.into())
    }

    /// Runs `f` with the provider armed, disarming afterwards.
    ///
    /// # Errors
    ///
    /// Returns the arming error without running `f`.
    pub fn with_armed<T>(
        &self,
        payload: impl Into<Arc<R>>,
        f: impl FnOnce() -> T,
    ) -> Result<T, ArmError> {
        let _armed = self.arm(payload)?;
        Ok(f())
    }

    /// Returns the payload armed on the calling thread, if any.
    #[must_use]
    pub fn provided_payload(&self) -> Option<Arc<R>> {
        self.provided()
            .and_then(|payload| payload.downcast::<R>().ok())
    }

    /// Returns the handles assigned to the provided names, in declaration order.
    #[must_use]
    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    fn arm_typed(&self, payload: Arc<R>) -> Result<Armed<'_>, ArmError> {
        if let Some(current) = context::armed_payload(self.id) {
            let same = core::ptr::addr_eq(Arc::as_ptr(&current), Arc::as_ptr(&payload));
            if same && self.allow_idempotent_rearming {
                tracing::trace!(provider = %self.id, "idempotent re-arm");
                return Ok(Armed::inert(self.id));
            }
            return Err(ArmError::CannotArmTwice {
                resource: core::any::type_name::<R>(),
            });
        }

        let values = self
            .names
            .iter()
            .zip(self.handles.iter())
            .filter_map(|(name, &handle)| payload.resource(name).map(|value| (handle, value)))
            .collect();

        context::publish(self.id, payload, values);
        tracing::debug!(
            provider = %self.id,
            resource = core::any::type_name::<R>(),
            "provider armed"
        );

        Ok(Armed::owning(self.id, &self.handles))
    }
}

impl<R: Resource> Provider for InstanceProvider<R> {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn resource_type_name(&self) -> &'static str {
        core::any::type_name::<R>()
    }

    fn provides(&self) -> &HashSet<&'static str> {
        &self.provides
    }

    fn allow_idempotent_rearming(&self) -> bool {
        self.allow_idempotent_rearming
    }

    fn resource_of(&self, payload: &Payload, name: &str) -> Option<Value> {
        payload.downcast_ref::<R>()?.resource(name)
    }

    fn arm_dyn(&self, payload: Payload) -> Result<Armed<'_>, ArmError> {
        let payload = payload
            .downcast::<R>()
            .map_err(|_| ArmError::InvalidPayload {
                expected: core::any::type_name::<R>(),
            })?;
        self.arm_typed(payload)
    }
}

impl<R: Resource> AsProvider for InstanceProvider<R> {
    fn as_provider(&'static self) -> &'static dyn Provider {
        self
    }
}

impl<R: Resource> core::fmt::Debug for InstanceProvider<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InstanceProvider")
            .field("id", &self.id)
            .field("resource_type", &core::any::type_name::<R>())
            .field("provides", &self.names)
            .field("allow_idempotent_rearming", &self.allow_idempotent_rearming)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;
    use crate::resource::read_value;
    use std::sync::LazyLock;

    #[derive(crate::Resource)]
    struct Pair {
        a: i64,
        b: i64,
    }

    #[derive(crate::Resource)]
    struct Other {
        a: i64,
    }

    fn pair(a: i64, b: i64) -> Arc<Pair> {
        Arc::new(Pair { a, b })
    }

    fn read(provider: &InstanceProvider<Pair>, index: usize) -> Option<i64> {
        context::slot(provider.handles()[index]).and_then(|value| read_value::<i64>(&value))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn provides_resource_names() {
        let provider = create_provider::<Pair>(false);
        let mut names: Vec<_> = provider.provides().iter().copied().collect();
        names.sort_unstable();

        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(provider.handles().len(), 2);
    }

    #[test]
    fn providers_get_distinct_handles() {
        let first = create_provider::<Pair>(false);
        let second = create_provider::<Pair>(false);

        assert_ne!(first.id(), second.id());
        assert!(first.handles().iter().all(|h| !second.handles().contains(h)));
        assert_eq!(
            registry::handle_of(second.id(), "b").unwrap(),
            second.handles()[1]
        );
    }

    struct Repeated {
        a: i64,
    }

    impl Resource for Repeated {
        fn provides() -> &'static [&'static str] {
            &["a", "a"]
        }

        fn resource(&self, name: &str) -> Option<Value> {
            (name == "a").then(|| crate::resource::into_value(self.a))
        }
    }

    #[test]
    fn repeated_names_are_registered_once() {
        let repeated = create_provider::<Repeated>(false);
        let pair = create_provider::<Pair>(false);

        assert_eq!(repeated.handles().len(), 1);
        assert!(pair.handles().iter().all(|h| !repeated.handles().contains(h)));

        let _repeated = repeated.arm(Repeated { a: 1 }).unwrap();
        {
            let _pair = pair.arm(Pair { a: 99, b: 0 }).unwrap();
            let value = context::slot(repeated.handles()[0]).unwrap();
            assert_eq!(read_value::<i64>(&value), Some(1));
        }
        assert!(context::slot(repeated.handles()[0]).is_some());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Arming
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn arm_publishes_until_dropped() {
        let provider = create_provider::<Pair>(false);

        {
            let armed = provider.arm(Pair { a: 1, b: 2 }).unwrap();
            assert!(armed.owns_scope());
            assert_eq!(read(&provider, 0), Some(1));
            assert_eq!(read(&provider, 1), Some(2));
            assert_eq!(provider.provided_payload().unwrap().b, 2);
        }

        assert_eq!(read(&provider, 0), None);
        assert!(provider.provided().is_none());
    }

    #[test]
    fn arm_twice_fails() {
        let provider = create_provider::<Pair>(false);
        let payload = pair(1, 2);
        let _armed = provider.arm(payload.clone()).unwrap();

        let err = provider.arm(payload).unwrap_err();
        assert!(matches!(err, ArmError::CannotArmTwice { .. }));

        let err = provider.arm(pair(3, 4)).unwrap_err();
        assert!(matches!(err, ArmError::CannotArmTwice { .. }));
        assert_eq!(read(&provider, 0), Some(1));
    }

    #[test]
    fn idempotent_rearm_with_same_payload_is_inert() {
        let provider = create_provider::<Pair>(true);
        let payload = pair(5, 6);
        let _outer = provider.arm(payload.clone()).unwrap();

        {
            let inner = provider.arm(payload.clone()).unwrap();
            assert!(!inner.owns_scope());
        }

        assert_eq!(read(&provider, 0), Some(5));
        assert!(provider.provided().is_some());
    }

    #[test]
    fn idempotent_rearm_with_other_payload_fails() {
        let provider = create_provider::<Pair>(true);
        let _outer = provider.arm(pair(5, 6)).unwrap();

        let err = provider.arm(pair(5, 6)).unwrap_err();
        assert!(matches!(err, ArmError::CannotArmTwice { .. }));
    }

    #[test]
    fn rearm_after_disarm_succeeds() {
        let provider = create_provider::<Pair>(false);
        drop(provider.arm(pair(1, 1)).unwrap());

        let _armed = provider.arm(pair(2, 2)).unwrap();
        assert_eq!(read(&provider, 1), Some(2));
    }

    #[test]
    fn arm_dyn_rejects_wrong_payload_type() {
        let provider = create_provider::<Pair>(false);
        let payload: Payload = Arc::new(Other { a: 1 });

        let err = provider.arm_dyn(payload).unwrap_err();
        assert_eq!(
            err,
            ArmError::InvalidPayload {
                expected: core::any::type_name::<Pair>()
            }
        );
        assert!(provider.provided().is_none());
    }

    #[test]
    fn arm_dyn_accepts_matching_payload() {
        let provider = create_provider::<Pair>(false);
        let payload: Payload = pair(7, 8);

        let _armed = provider.arm_dyn(payload.clone()).unwrap();
        let value = provider.resource_of(&payload, "a").unwrap();
        assert_eq!(read_value::<i64>(&value), Some(7));
        assert!(provider.resource_of(&payload, "c").is_none());
    }

    #[test]
    fn guard_disarms_on_panic() {
        let provider = create_provider::<Pair>(false);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _armed = provider.arm(pair(1, 2)).unwrap();
            panic!("failure inside the armed scope");
        }));

        assert!(result.is_err());
        assert!(provider.provided().is_none());
        assert_eq!(read(&provider, 0), None);
    }

    #[test]
    fn with_armed_runs_inside_scope() {
        let provider = create_provider::<Pair>(false);
        let sum = provider
            .with_armed(pair(2, 3), || {
                let payload = provider.provided_payload().unwrap();
                payload.a + payload.b
            })
            .unwrap();

        assert_eq!(sum, 5);
        assert!(provider.provided().is_none());
    }

    #[test]
    fn nesting_distinct_providers_is_independent() {
        let first = create_provider::<Pair>(false);
        let second = create_provider::<Pair>(false);

        let _outer = first.arm(pair(1, 2)).unwrap();
        {
            let _inner = second.arm(pair(3, 4)).unwrap();
            assert_eq!(read(&second, 0), Some(3));
        }

        assert_eq!(read(&first, 0), Some(1));
        assert_eq!(read(&second, 0), None);
    }

    #[test]
    fn lazy_static_converts_to_provider() {
        static LAZY: LazyLock<InstanceProvider<Pair>> = LazyLock::new(|| create_provider(false));

        let dynamic = crate::provider::provider(&LAZY);
        assert_eq!(dynamic.id(), LAZY.id());
        assert!(dynamic.provides().contains("a"));
    }
}
