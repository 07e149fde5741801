//! Providers bound to one fixed payload.
//!
//! A [`DirectInjector`] pairs a provider with the payload it should always
//! be armed with. It arms around single calls, which suits entry points that
//! run a callable against a known configuration.

use crate::inject::{CallArgs, CallError, Callable, Decorated, DecorationError, Injector};
use crate::provider::{ArmError, Armed, InstanceProvider, Provider};
use crate::resource::Resource;
use crate::spec::FactorySpecification;
use std::sync::Arc;

/// A provider paired with a fixed payload.
///
/// Nested invocations through the same injector re-arm with the same `Arc`,
/// which succeeds when the provider allows idempotent re-arming.
///
/// # Example
///
/// ```
/// use std::sync::LazyLock;
/// use armory_core::prelude::*;
///
/// #[derive(Resource)]
/// struct Locale {
///     language: &'static str,
/// }
///
/// static LOCALE: LazyLock<InstanceProvider<Locale>> = LazyLock::new(|| create_provider(true));
///
/// let direct = DirectInjector::new(&LOCALE, Locale { language: "en" });
/// let language = direct
///     .invoke(|| LOCALE.provided_payload().map(|locale| locale.language))
///     .unwrap();
///
/// assert_eq!(language, Some("en"));
/// assert!(LOCALE.provided_payload().is_none());
/// ```
pub struct DirectInjector<R: Resource> {
    provider: &'static InstanceProvider<R>,
    payload: Arc<R>,
}

impl<R: Resource> DirectInjector<R> {
    /// Binds a provider to a payload.
    pub fn new(provider: &'static InstanceProvider<R>, payload: impl Into<Arc<R>>) -> Self {
        Self {
            provider,
            payload: payload.into(),
        }
    }

    /// Returns the bound provider.
    #[must_use]
    pub fn provider(&self) -> &'static InstanceProvider<R> {
        self.provider
    }

    /// Returns the bound payload.
    #[must_use]
    pub fn payload(&self) -> &Arc<R> {
        &self.payload
    }

    /// Arms the provider with the bound payload.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::CannotArmTwice`] if the provider is already armed
    /// on this thread with another payload, or does not allow re-arming.
    pub fn arm(&self) -> Result<Armed<'static>, ArmError> {
        self.provider.arm(Arc::clone(&self.payload))
    }

    /// Runs `f` with the provider armed.
    ///
    /// # Errors
    ///
    /// Returns the arming error without running `f`.
    pub fn invoke<T>(&self, f: impl FnOnce() -> T) -> Result<T, ArmError> {
        let _armed = self.arm()?;
        Ok(f())
    }

    /// Decorates a callable with the bound provider and arms around each call.
    ///
    /// # Errors
    ///
    /// Returns the [`DecorationError`] raised while planning the callable.
    pub fn inject<C: Callable>(&self, callable: C) -> Result<DirectCall<R, C>, DecorationError> {
        let provider: &'static dyn Provider = self.provider;
        let decorated = Injector::new([provider]).decorate(callable)?;
        Ok(DirectCall {
            injector: Self {
                provider: self.provider,
                payload: Arc::clone(&self.payload),
            },
            decorated,
        })
    }
}

impl<R: Resource> Clone for DirectInjector<R> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider,
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<R: Resource> core::fmt::Debug for DirectInjector<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirectInjector")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

/// Errors raised by a [`DirectCall`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectCallError {
    /// The provider could not be armed.
    #[error(transparent)]
    Arm(#[from] ArmError),

    /// The call failed.
    #[error(transparent)]
    Call(#[from] CallError),
}

/// A callable that runs with its injector's payload armed.
pub struct DirectCall<R: Resource, C> {
    injector: DirectInjector<R>,
    decorated: Decorated<C>,
}

impl<R: Resource, C: Callable> DirectCall<R, C> {
    /// Returns the callable's specification.
    #[must_use]
    pub fn specification(&self) -> FactorySpecification {
        self.decorated.specification()
    }

    /// Arms the provider and calls the decorated callable.
    ///
    /// # Errors
    ///
    /// Returns [`DirectCallError::Arm`] if arming fails, or
    /// [`DirectCallError::Call`] if the call does.
    pub fn call(&self, args: CallArgs) -> Result<C::Output, DirectCallError> {
        let _armed = self.injector.arm()?;
        Ok(self.decorated.call(args)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::Function;
    use crate::provider::create_provider;
    use crate::spec::ParamDefault;
    use std::sync::LazyLock;

    #[derive(crate::Resource)]
    struct Scale {
        factor: i32,
    }

    static SCALE: LazyLock<InstanceProvider<Scale>> = LazyLock::new(|| create_provider(true));
    static STRICT: LazyLock<InstanceProvider<Scale>> = LazyLock::new(|| create_provider(false));

    fn scaled() -> Function<impl Fn(CallArgs) -> Result<i32, CallError>> {
        let spec = FactorySpecification::function("scaled")
            .param("value")
            .with_default("factor", ParamDefault::Injected);
        Function::new(spec, |args: CallArgs| {
            let value: i32 = args.get(0, "value")?.unwrap_or_default();
            let factor: i32 = args.get(1, "factor")?.unwrap_or(1);
            Ok(value * factor)
        })
    }

    #[test]
    fn invoke_arms_around_the_call() {
        let direct = DirectInjector::new(&SCALE, Scale { factor: 3 });

        let factor = direct
            .invoke(|| SCALE.provided_payload().map(|scale| scale.factor))
            .unwrap();

        assert_eq!(factor, Some(3));
        assert!(SCALE.provided().is_none());
    }

    #[test]
    fn nested_invocations_rearm_idempotently() {
        let direct = DirectInjector::new(&SCALE, Scale { factor: 2 });

        let nested = direct
            .invoke(|| direct.invoke(|| SCALE.provided().is_some()))
            .unwrap()
            .unwrap();

        assert!(nested);
        assert!(SCALE.provided().is_none());
    }

    #[test]
    fn nested_invocations_fail_without_idempotent_rearming() {
        let direct = DirectInjector::new(&STRICT, Scale { factor: 2 });

        let nested = direct.invoke(|| direct.invoke(|| ())).unwrap();
        assert!(matches!(nested, Err(ArmError::CannotArmTwice { .. })));
    }

    #[test]
    fn injected_callable_sees_bound_payload() {
        let direct = DirectInjector::new(&SCALE, Scale { factor: 5 });
        let call = direct.inject(scaled()).unwrap();

        assert_eq!(call.call(CallArgs::new().arg(2_i32)).unwrap(), 10);
        assert_eq!(
            call.call(CallArgs::new().arg(2_i32).arg(7_i32)).unwrap(),
            14
        );
        assert!(SCALE.provided().is_none());
    }

    #[test]
    fn injected_callable_reports_arm_conflicts() {
        let direct = DirectInjector::new(&STRICT, Scale { factor: 5 });
        let call = direct.inject(scaled()).unwrap();
        let _armed = STRICT.arm(Scale { factor: 1 }).unwrap();

        let err = call.call(CallArgs::new().arg(1_i32)).unwrap_err();
        assert!(matches!(err, DirectCallError::Arm(ArmError::CannotArmTwice { .. })));
    }
}
