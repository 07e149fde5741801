//! Injection builder, call plans and dynamic callables.
//!
//! An [`Injector`] is built over one or more providers. Planning a callable's
//! [`FactorySpecification`] validates its declaration against the providers
//! and bakes every injectable parameter's handle into an [`InjectionPlan`].
//! The plan is then used by:
//!
//! - `#[inject]` functions and `#[inject_methods]` impls, which build their
//!   plan on first call and resolve each [`Arg`](crate::spec::Arg) through it.
//!   Their plans are registered in [`DECORATED`], so [`validate_all`] can
//!   check them up front;
//! - [`Injector::decorate`], which wraps a dynamic [`Callable`] and fills in
//!   the arguments the caller did not supply.
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
//! let spec = FactorySpecification::function("sum")
//!     .with_default("a", ParamDefault::Injected)
//!     .with_default("b", ParamDefault::Injected);
//!
//! let sum = Function::new(spec, |args: CallArgs| {
//!     let a: i64 = args.get(0, "a")?.unwrap_or_default();
//!     let b: i64 = args.get(1, "b")?.unwrap_or_default();
//!     Ok(a + b)
//! });
//!
//! let sum = inject([provider(&PAIR)]).decorate(sum).unwrap();
//!
//! let _armed = PAIR.arm(Pair { a: 1, b: 2 }).unwrap();
//! assert_eq!(sum.call(CallArgs::new()).unwrap(), 3);
//! assert_eq!(sum.call(CallArgs::new().arg(10_i64)).unwrap(), 12);
//! ```

mod callable;
mod plan;

pub use callable::{CallArgs, Callable, Construct, Constructor, Decorated, Function, Opaque};
pub use plan::{InjectionPlan, PlanEntry, Strategy};

use crate::config::InjectionMode;
use crate::provider::Provider;
use crate::registry::{self, RegistryError};
use crate::spec::{FactorySpecification, ParamDefault};
use hashbrown::HashMap;
use std::sync::LazyLock;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while decorating a callable.
///
/// These are configuration errors: they are reported once, before the
/// decorated callable can run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecorationError {
    /// Two providers passed together supply the same resource name.
    #[error("resource `{resource}` is provided by both `{first}` and `{second}`")]
    DoubleProvidingProhibited {
        /// The duplicated resource name.
        resource: String,
        /// Resource type of the first provider supplying it.
        first: &'static str,
        /// Resource type of the second provider supplying it.
        second: &'static str,
    },

    /// A parameter declared as injected has no provider.
    #[error("cannot inject argument `{argument}` into `{callable}`: no provider supplies it")]
    NoSourceForArgument {
        /// The parameter name.
        argument: String,
        /// The decorated callable.
        callable: String,
    },

    /// A parameter matches a provided resource but declares no default.
    #[error("argument `{argument}` of `{callable}` is injectable but declares no default value")]
    NoDefaultValueForArgument {
        /// The parameter name.
        argument: String,
        /// The decorated callable.
        callable: String,
    },

    /// A handle lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised while calling a decorated callable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// A required parameter was not supplied and its provider is not armed.
    #[error("no values provided for argument `{argument}`: resource `{resource}` is not armed")]
    NoValuesProvided {
        /// The parameter name.
        argument: String,
        /// The resource it corresponds to.
        resource: String,
    },

    /// A parameter without any fallback was not supplied.
    #[error("missing argument `{argument}`")]
    MissingArgument {
        /// The parameter name.
        argument: String,
    },

    /// A supplied or injected value has the wrong type.
    #[error("argument `{argument}` expected a value of type `{expected}`")]
    TypeMismatch {
        /// The parameter name.
        argument: String,
        /// The type the parameter declares.
        expected: &'static str,
    },
}

/// Errors returned by macro-decorated functions.
///
/// Macro-generated plans are built on first call, so decoration errors
/// surface there as well.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    /// The declaration is invalid.
    #[error(transparent)]
    Decoration(#[from] DecorationError),

    /// The call could not be resolved.
    #[error(transparent)]
    Call(#[from] CallError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Injector
// ─────────────────────────────────────────────────────────────────────────────

/// Builds injection plans over a fixed set of providers.
#[derive(Debug, Clone)]
pub struct Injector {
    providers: Vec<&'static dyn Provider>,
    suffix: &'static str,
    mode: InjectionMode,
}

impl Injector {
    /// Creates an injector matching parameter names to resource names as is.
    #[must_use]
    pub fn new(providers: impl IntoIterator<Item = &'static dyn Provider>) -> Self {
        Self {
            providers: providers.into_iter().collect(),
            suffix: "",
            mode: InjectionMode::current(),
        }
    }

    /// Creates an injector where only parameters ending in `_` are injectable.
    ///
    /// The suffix is stripped before matching, so parameter `data_` receives
    /// resource `data`.
    #[must_use]
    pub fn with_suffix(providers: impl IntoIterator<Item = &'static dyn Provider>) -> Self {
        Self {
            suffix: "_",
            ..Self::new(providers)
        }
    }

    /// Overrides the process-wide [`InjectionMode`].
    #[must_use]
    pub fn with_mode(mut self, mode: InjectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the providers, in the order given.
    #[must_use]
    pub fn providers(&self) -> &[&'static dyn Provider] {
        &self.providers
    }

    /// Returns the parameter suffix marking injectable parameters.
    #[must_use]
    pub fn suffix(&self) -> &'static str {
        self.suffix
    }

    /// Returns the strategy preference.
    #[must_use]
    pub fn mode(&self) -> InjectionMode {
        self.mode
    }

    /// Maps every provided resource name to its provider.
    fn resource_map(&self) -> Result<HashMap<&'static str, &'static dyn Provider>, DecorationError> {
        let mut resources: HashMap<&'static str, &'static dyn Provider> = HashMap::new();
        for &provider in &self.providers {
            for &name in provider.provides() {
                if let Some(first) = resources.insert(name, provider) {
                    return Err(DecorationError::DoubleProvidingProhibited {
                        resource: name.to_string(),
                        first: first.resource_type_name(),
                        second: provider.resource_type_name(),
                    });
                }
            }
        }
        Ok(resources)
    }

    /// Matches a parameter name to a provided resource.
    fn correspondence(
        &self,
        argument: &str,
        resources: &HashMap<&'static str, &'static dyn Provider>,
    ) -> Option<(&'static str, &'static dyn Provider)> {
        let name = if self.suffix.is_empty() {
            argument
        } else {
            argument.strip_suffix(self.suffix)?
        };
        resources
            .get_key_value(name)
            .map(|(&resource, &provider)| (resource, provider))
    }

    /// Validates a specification and computes its plan.
    ///
    /// # Errors
    ///
    /// - [`DecorationError::DoubleProvidingProhibited`] if two providers supply
    ///   the same resource name.
    /// - [`DecorationError::NoSourceForArgument`] if a parameter defaults to
    ///   [`ParamDefault::Injected`] but no provider supplies it.
    /// - [`DecorationError::NoDefaultValueForArgument`] if a parameter matches
    ///   a provided resource but declares no default.
    pub fn plan(&self, spec: &FactorySpecification) -> Result<InjectionPlan, DecorationError> {
        let resources = self.resource_map()?;
        let mut entries = Vec::new();

        for (position, &argument) in spec.argument_names().iter().enumerate() {
            match (self.correspondence(argument, &resources), spec.default_of(argument)) {
                (None, Some(ParamDefault::Injected)) => {
                    return Err(DecorationError::NoSourceForArgument {
                        argument: argument.to_string(),
                        callable: spec.callable().to_string(),
                    });
                }
                (Some(_), None) => {
                    return Err(DecorationError::NoDefaultValueForArgument {
                        argument: argument.to_string(),
                        callable: spec.callable().to_string(),
                    });
                }
                (None, _) => {}
                (Some((resource, provider)), Some(default)) => {
                    let handle = registry::handle_of(provider.id(), resource)?;
                    entries.push(PlanEntry::new(
                        argument, resource, position, handle, default, provider,
                    ));
                }
            }
        }

        let strategy = match self.mode {
            InjectionMode::Wrapping => Strategy::Wrapping,
            InjectionMode::Planned => Strategy::planned_for(spec).unwrap_or_else(|reason| {
                tracing::debug!(%reason, "falling back to the wrapping strategy");
                Strategy::Wrapping
            }),
        };

        tracing::trace!(
            callable = spec.callable(),
            ?strategy,
            injected = entries.len(),
            "injection plan built"
        );
        Ok(InjectionPlan::new(spec.callable(), strategy, entries))
    }

    /// Decorates a dynamic callable.
    ///
    /// Returns [`Decorated::Unchanged`] when no parameter is injectable.
    ///
    /// # Errors
    ///
    /// Returns the [`DecorationError`] raised by [`plan`](Self::plan).
    pub fn decorate<C: Callable>(&self, callable: C) -> Result<Decorated<C>, DecorationError> {
        let plan = self.plan(&callable.specification())?;
        if plan.is_empty() {
            return Ok(Decorated::Unchanged(callable));
        }
        Ok(Decorated::Wrapped {
            inner: callable,
            plan,
        })
    }
}

/// Creates an [`Injector`] matching parameter names as is.
#[must_use]
pub fn inject(providers: impl IntoIterator<Item = &'static dyn Provider>) -> Injector {
    Injector::new(providers)
}

/// Creates an [`Injector`] matching parameters named `<resource>_`.
#[must_use]
pub fn inject_with_suffix(providers: impl IntoIterator<Item = &'static dyn Provider>) -> Injector {
    Injector::with_suffix(providers)
}

// ─────────────────────────────────────────────────────────────────────────────
// Macro support
// ─────────────────────────────────────────────────────────────────────────────

/// Lazily built plan of a macro-decorated function.
pub type PlanCell = LazyLock<Result<InjectionPlan, DecorationError>>;

/// A macro-decorated callable, registered at link time.
#[derive(Debug)]
pub struct DecoratedEntry {
    /// Fully qualified name of the callable.
    pub callable: &'static str,
    /// The callable's plan.
    pub plan: &'static PlanCell,
}

/// Every `#[inject]` function and injected `#[inject_methods]` method linked
/// into the binary.
#[linkme::distributed_slice]
pub static DECORATED: [DecoratedEntry] = [..];

/// Builds every registered plan and collects the decoration errors, ordered
/// by callable name.
#[must_use]
pub fn decoration_errors() -> Vec<(&'static str, DecorationError)> {
    let mut errors: Vec<_> = DECORATED
        .iter()
        .filter_map(|entry| {
            LazyLock::force(entry.plan)
                .as_ref()
                .err()
                .map(|err| (entry.callable, err.clone()))
        })
        .collect();
    errors.sort_by_key(|&(callable, _)| callable);
    tracing::debug!(
        decorated = DECORATED.len(),
        invalid = errors.len(),
        "decorated callables validated"
    );
    errors
}

/// Checks every registered declaration without calling anything.
///
/// # Errors
///
/// Returns the error of the first invalid callable, by name.
pub fn validate_all() -> Result<(), DecorationError> {
    match decoration_errors().into_iter().next() {
        Some((_, err)) => Err(err),
        None => Ok(()),
    }
}

/// Forces a plan cell, surfacing its decoration error.
///
/// # Errors
///
/// Returns [`InjectError::Decoration`] if the declaration was invalid.
pub fn ready(cell: &'static PlanCell) -> Result<&'static InjectionPlan, InjectError> {
    LazyLock::force(cell)
        .as_ref()
        .map_err(|err| InjectError::Decoration(err.clone()))
}
