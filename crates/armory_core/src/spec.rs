//! Factory specifications and call-site markers.
//!
//! A [`FactorySpecification`] lists a callable's parameters in order and the
//! kind of default each one declares. Specifications are built at compile
//! time by the macros, or by hand with the builder methods; there is no
//! runtime reflection. Only the decoration step reads them.

use crate::inject::Callable;
use hashbrown::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// Call-site marker
// ─────────────────────────────────────────────────────────────────────────────

/// An argument of a decorated callable.
///
/// [`Arg::Injected`] (exported as [`INJECTED`]) leaves the parameter to the
/// armed provider; [`Arg::Value`] overrides it. Plain values convert with
/// `.into()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arg<T> {
    /// Resolve the parameter from the armed provider.
    Injected,
    /// Use this value.
    Value(T),
}

pub use Arg::Injected as INJECTED;

impl<T> Arg<T> {
    /// Returns `true` if the caller left the parameter to injection.
    #[must_use]
    pub fn is_injected(&self) -> bool {
        matches!(self, Self::Injected)
    }

    /// Returns the explicit value, if any.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Injected => None,
            Self::Value(value) => Some(value),
        }
    }
}

impl<T> Default for Arg<T> {
    fn default() -> Self {
        Self::Injected
    }
}

impl<T> From<T> for Arg<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Specification
// ─────────────────────────────────────────────────────────────────────────────

/// The default a parameter declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamDefault {
    /// Must be injected; a provider has to supply it.
    Injected,
    /// Injected when a provider is armed, otherwise the parameter is absent.
    InjectedIfAvailable,
    /// An ordinary default value, overridden by injection when available.
    Value,
}

/// What kind of callable a specification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallableKind {
    /// A function or method whose parameters are read at entry.
    Function,
    /// A type constructed from its fields.
    Constructor,
    /// A callable that cannot be introspected.
    #[default]
    Opaque,
}

/// Ordered parameter names and declared defaults of a callable.
///
/// # Example
///
/// ```
/// use armory_core::spec::{FactorySpecification, ParamDefault};
///
/// let spec = FactorySpecification::function("add")
///     .param("a")
///     .with_default("b", ParamDefault::Injected);
///
/// assert_eq!(spec.argument_names(), &["a", "b"]);
/// assert_eq!(spec.default_of("a"), None);
/// assert_eq!(spec.default_of("b"), Some(ParamDefault::Injected));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FactorySpecification {
    callable: &'static str,
    kind: CallableKind,
    argument_names: Vec<&'static str>,
    argument_defaults: HashMap<&'static str, ParamDefault>,
}

impl FactorySpecification {
    /// Starts the specification of a function or method.
    #[must_use]
    pub fn function(callable: &'static str) -> Self {
        Self::new(callable, CallableKind::Function)
    }

    /// Starts the specification of a type constructor.
    #[must_use]
    pub fn constructor(callable: &'static str) -> Self {
        Self::new(callable, CallableKind::Constructor)
    }

    /// Returns the empty specification of a non-introspectable callable.
    #[must_use]
    pub fn opaque(callable: &'static str) -> Self {
        Self::new(callable, CallableKind::Opaque)
    }

    fn new(callable: &'static str, kind: CallableKind) -> Self {
        Self {
            callable,
            kind,
            ..Self::default()
        }
    }

    /// Appends a parameter without a default.
    #[must_use]
    pub fn param(mut self, name: &'static str) -> Self {
        self.push(name, None);
        self
    }

    /// Appends a parameter with a default.
    #[must_use]
    pub fn with_default(mut self, name: &'static str, default: ParamDefault) -> Self {
        self.push(name, Some(default));
        self
    }

    /// Appends a parameter.
    pub fn push(&mut self, name: &'static str, default: Option<ParamDefault>) {
        self.argument_names.push(name);
        if let Some(default) = default {
            self.argument_defaults.insert(name, default);
        }
    }

    /// Returns the callable's name.
    #[must_use]
    pub fn callable(&self) -> &'static str {
        self.callable
    }

    /// Returns the callable's kind.
    #[must_use]
    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    /// Returns the parameter names in declaration order.
    #[must_use]
    pub fn argument_names(&self) -> &[&'static str] {
        &self.argument_names
    }

    /// Returns the defaults of the parameters that declare one.
    #[must_use]
    pub fn argument_defaults(&self) -> &HashMap<&'static str, ParamDefault> {
        &self.argument_defaults
    }

    /// Returns the default of a parameter, if it declares one.
    #[must_use]
    pub fn default_of(&self, name: &str) -> Option<ParamDefault> {
        self.argument_defaults.get(name).copied()
    }

    /// Returns the position of a parameter.
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.argument_names.iter().position(|&n| n == name)
    }

    /// Returns `true` if the specification lists no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.argument_names.is_empty()
    }

    /// Keeps only the parameters without a default.
    #[must_use]
    pub fn without_defaulted(mut self) -> Self {
        let defaults = core::mem::take(&mut self.argument_defaults);
        self.argument_names
            .retain(|name| !defaults.contains_key(name));
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Introspection
// ─────────────────────────────────────────────────────────────────────────────

/// A type with a declared constructor schema.
///
/// Usually derived with `#[derive(Factory)]`:
///
/// ```
/// use armory_core::prelude::*;
///
/// #[derive(Factory)]
/// struct Connection {
///     #[factory(injected)]
///     url: String,
///     #[factory(default = 30)]
///     timeout: u32,
///     retries: u8,
/// }
///
/// let spec = extract_specification::<Connection>();
/// assert_eq!(spec.kind(), CallableKind::Constructor);
/// assert_eq!(spec.argument_names(), &["url", "timeout", "retries"]);
/// assert_eq!(spec.default_of("url"), Some(ParamDefault::Injected));
/// assert_eq!(spec.default_of("retries"), None);
/// ```
pub trait Introspect {
    /// Returns the constructor's specification.
    fn specification() -> FactorySpecification;
}

/// Extracts the specification of a type's constructor.
#[must_use]
pub fn extract_specification<T: Introspect>() -> FactorySpecification {
    T::specification()
}

/// Extracts the specification of a type's constructor, optionally keeping
/// only the fields without a default.
#[must_use]
pub fn extract_specification_with<T: Introspect>(allow_defaults: bool) -> FactorySpecification {
    let spec = T::specification();
    if allow_defaults {
        spec
    } else {
        spec.without_defaulted()
    }
}

/// Extracts the specification of a callable.
///
/// Opaque callables yield an empty specification.
#[must_use]
pub fn extract_specification_of<C: Callable + ?Sized>(callable: &C) -> FactorySpecification {
    callable.specification()
}
