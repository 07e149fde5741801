//! Dynamic callables and their arguments.
//!
//! Macro-decorated functions resolve their parameters statically. Callables
//! assembled at runtime go through this module instead: arguments travel as
//! type-erased [`CallArgs`] and decoration wraps the callable in a
//! [`Decorated`] that fills in the injectable ones.

use super::{CallError, InjectionPlan};
use crate::resource::{Value, into_value, read_value};
use crate::spec::{FactorySpecification, Introspect};
use core::marker::PhantomData;
use hashbrown::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// CallArgs
// ─────────────────────────────────────────────────────────────────────────────

/// Positional and keyword arguments of a dynamic call.
#[derive(Clone, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: HashMap<String, Value>,
}

impl CallArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.push(into_value(value));
        self
    }

    /// Adds a keyword argument.
    #[must_use]
    pub fn kwarg<T: Send + Sync + 'static>(mut self, name: &str, value: T) -> Self {
        self.keyword(name, into_value(value));
        self
    }

    /// Appends a type-erased positional argument.
    pub fn push(&mut self, value: Value) {
        self.positional.push(value);
    }

    /// Sets a type-erased keyword argument.
    pub fn keyword(&mut self, name: impl Into<String>, value: Value) {
        self.keyword.insert(name.into(), value);
    }

    /// Returns `true` if the parameter was passed positionally or by keyword.
    #[must_use]
    pub fn is_supplied(&self, position: usize, name: &str) -> bool {
        position < self.positional.len() || self.keyword.contains_key(name)
    }

    /// Clones the positional argument, or removes the keyword argument `name`.
    ///
    /// Positional arguments win, as in [`get`](Self::get).
    pub fn take(&mut self, position: usize, name: &str) -> Option<Value> {
        match self.positional.get(position) {
            Some(value) => Some(Value::clone(value)),
            None => self.keyword.remove(name),
        }
    }

    /// Reads a clone of the parameter's value.
    ///
    /// Returns `Ok(None)` if the parameter was not supplied.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::TypeMismatch`] if the value is not a `T`.
    pub fn get<T: Clone + 'static>(
        &self,
        position: usize,
        name: &str,
    ) -> Result<Option<T>, CallError> {
        let value = self
            .positional
            .get(position)
            .or_else(|| self.keyword.get(name));
        match value {
            None => Ok(None),
            Some(value) => read_value::<T>(value)
                .map(Some)
                .ok_or_else(|| CallError::TypeMismatch {
                    argument: name.to_string(),
                    expected: core::any::type_name::<T>(),
                }),
        }
    }

    /// Returns the number of supplied arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    /// Returns `true` if no argument was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for CallArgs {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallArgs")
            .field("positional", &self.positional.len())
            .field("keyword", &self.keyword.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callable
// ─────────────────────────────────────────────────────────────────────────────

/// A callable invoked with type-erased arguments.
pub trait Callable {
    /// The value a successful call returns.
    type Output;

    /// Returns the callable's parameter specification.
    fn specification(&self) -> FactorySpecification;

    /// Invokes the callable.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] if the arguments cannot be resolved.
    fn call(&self, args: CallArgs) -> Result<Self::Output, CallError>;
}

/// A closure with an explicit specification.
pub struct Function<F> {
    spec: FactorySpecification,
    f: F,
}

impl<F> Function<F> {
    /// Pairs a closure with its specification.
    pub fn new<O>(spec: FactorySpecification, f: F) -> Self
    where
        F: Fn(CallArgs) -> Result<O, CallError>,
    {
        Self { spec, f }
    }
}

impl<F, O> Callable for Function<F>
where
    F: Fn(CallArgs) -> Result<O, CallError>,
{
    type Output = O;

    fn specification(&self) -> FactorySpecification {
        self.spec.clone()
    }

    fn call(&self, args: CallArgs) -> Result<O, CallError> {
        (self.f)(args)
    }
}

/// A type built from its declared fields.
///
/// Implemented by `#[derive(Factory)]`.
pub trait Construct: Introspect + Sized {
    /// Builds an instance from the arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] if a field without fallback is missing or a
    /// value has the wrong type.
    fn construct(args: CallArgs) -> Result<Self, CallError>;
}

/// The constructor of a [`Construct`] type as a callable.
pub struct Constructor<T>(PhantomData<fn() -> T>);

impl<T: Construct> Constructor<T> {
    /// Returns the constructor of `T`.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Construct> Default for Constructor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Construct> Callable for Constructor<T> {
    type Output = T;

    fn specification(&self) -> FactorySpecification {
        T::specification()
    }

    fn call(&self, args: CallArgs) -> Result<T, CallError> {
        T::construct(args)
    }
}

/// A callable whose parameters cannot be introspected.
///
/// Its specification is empty, so decorating it is a no-op.
pub struct Opaque<F> {
    name: &'static str,
    f: F,
}

impl<F> Opaque<F> {
    /// Wraps a closure under a name.
    pub fn new<O>(name: &'static str, f: F) -> Self
    where
        F: Fn(CallArgs) -> Result<O, CallError>,
    {
        Self { name, f }
    }
}

impl<F, O> Callable for Opaque<F>
where
    F: Fn(CallArgs) -> Result<O, CallError>,
{
    type Output = O;

    fn specification(&self) -> FactorySpecification {
        FactorySpecification::opaque(self.name)
    }

    fn call(&self, args: CallArgs) -> Result<O, CallError> {
        (self.f)(args)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decorated
// ─────────────────────────────────────────────────────────────────────────────

/// The result of decorating a callable.
#[derive(Debug)]
pub enum Decorated<C> {
    /// Nothing was injectable; calls go straight to the callable.
    Unchanged(C),
    /// Calls fill in the plan's arguments before invoking the callable.
    Wrapped {
        /// The decorated callable.
        inner: C,
        /// Its injection plan.
        plan: InjectionPlan,
    },
}

impl<C> Decorated<C> {
    /// Returns `true` if decoration left the callable as it was.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged(_))
    }

    /// Returns the injection plan, if any.
    #[must_use]
    pub fn plan(&self) -> Option<&InjectionPlan> {
        match self {
            Self::Unchanged(_) => None,
            Self::Wrapped { plan, .. } => Some(plan),
        }
    }

    /// Returns the undecorated callable.
    pub fn into_inner(self) -> C {
        match self {
            Self::Unchanged(inner) | Self::Wrapped { inner, .. } => inner,
        }
    }
}

impl<C: Callable> Callable for Decorated<C> {
    type Output = C::Output;

    fn specification(&self) -> FactorySpecification {
        match self {
            Self::Unchanged(inner) | Self::Wrapped { inner, .. } => inner.specification(),
        }
    }

    fn call(&self, mut args: CallArgs) -> Result<C::Output, CallError> {
        match self {
            Self::Unchanged(inner) => inner.call(args),
            Self::Wrapped { inner, plan } => {
                plan.augment(&mut args)?;
                inner.call(args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{CallableKind, ParamDefault};

    #[derive(crate::Factory, Debug, PartialEq)]
    struct Endpoint {
        #[factory(injected)]
        host: String,
        #[factory(default = 80)]
        port: u16,
        #[factory(injected_if_available)]
        tls: Option<bool>,
    }

    #[test]
    fn positional_and_keyword_arguments() {
        let args = CallArgs::new().arg(1_u8).kwarg("b", "two");

        assert!(args.is_supplied(0, "a"));
        assert!(args.is_supplied(5, "b"));
        assert!(!args.is_supplied(1, "c"));
        assert_eq!(args.get::<u8>(0, "a").unwrap(), Some(1));
        assert_eq!(args.get::<&str>(1, "b").unwrap(), Some("two"));
        assert_eq!(args.get::<u8>(2, "c").unwrap(), None);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn take_and_get_agree_on_precedence() {
        let mut args = CallArgs::new().arg(1_u8).kwarg("a", 2_u8);

        assert_eq!(args.get::<u8>(0, "a").unwrap(), Some(1));
        let taken = args.take(0, "a").unwrap();
        assert_eq!(read_value::<u8>(&taken), Some(1));

        let taken = args.take(1, "a").unwrap();
        assert_eq!(read_value::<u8>(&taken), Some(2));
        assert!(args.take(1, "a").is_none());
    }

    #[test]
    fn mismatched_argument_is_reported() {
        let args = CallArgs::new().arg("text");
        let err = args.get::<u8>(0, "a").unwrap_err();
        assert_eq!(
            err,
            CallError::TypeMismatch {
                argument: "a".into(),
                expected: "u8"
            }
        );
    }

    #[test]
    fn constructor_uses_fallbacks() {
        let constructor = Constructor::<Endpoint>::new();
        let spec = constructor.specification();
        assert_eq!(spec.kind(), CallableKind::Constructor);
        assert_eq!(spec.default_of("port"), Some(ParamDefault::Value));

        let endpoint = constructor
            .call(CallArgs::new().kwarg("host", String::from("localhost")))
            .unwrap();
        assert_eq!(
            endpoint,
            Endpoint {
                host: "localhost".into(),
                port: 80,
                tls: None
            }
        );
    }

    #[test]
    fn constructor_requires_injected_fields() {
        let err = Constructor::<Endpoint>::new()
            .call(CallArgs::new())
            .unwrap_err();
        assert_eq!(
            err,
            CallError::MissingArgument {
                argument: "host".into()
            }
        );
    }

    #[test]
    fn opaque_callable_has_empty_specification() {
        let opaque = Opaque::new("builtin", |args: CallArgs| Ok(args.len()));
        assert!(opaque.specification().is_empty());
        assert_eq!(opaque.call(CallArgs::new().arg(())).unwrap(), 1);
    }

    #[test]
    fn function_keeps_its_specification() {
        let spec = FactorySpecification::function("id").param("x");
        let function = Function::new(spec.clone(), |args: CallArgs| args.get::<i32>(0, "x"));

        assert_eq!(function.specification(), spec);
        assert_eq!(function.call(CallArgs::new().arg(4)).unwrap(), Some(4));
    }
}
