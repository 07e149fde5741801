//! Precomputed injection plans.

use super::{CallArgs, CallError};
use crate::context;
use crate::provider::Provider;
use crate::registry::Handle;
use crate::resource::{Value, read_value};
use crate::spec::{Arg, CallableKind, FactorySpecification, ParamDefault};
use hashbrown::HashMap;

/// How a plan reads the values of its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Read the thread-local slot of the entry's pre-baked handle.
    ///
    /// A parameter the caller left injected must be available; only
    /// [`ParamDefault::InjectedIfAvailable`] parameters tolerate an unarmed
    /// provider.
    Planned,
    /// Read the provider's armed payload and look the resource up by name.
    ///
    /// When the provider is unarmed, only [`ParamDefault::Injected`]
    /// parameters fail; the others keep the callable's own default.
    Wrapping,
}

/// Why the planned strategy cannot serve a callable.
#[derive(Debug, Clone, thiserror::Error)]
#[error("planned injection unavailable for `{callable}`: {kind:?} callables are wrapped")]
pub(crate) struct PlanUnavailable {
    callable: &'static str,
    kind: CallableKind,
}

impl Strategy {
    /// Selects the planned strategy if the callable's kind allows it.
    pub(crate) fn planned_for(spec: &FactorySpecification) -> Result<Self, PlanUnavailable> {
        match spec.kind() {
            CallableKind::Function => Ok(Self::Planned),
            kind => Err(PlanUnavailable {
                callable: spec.callable(),
                kind,
            }),
        }
    }
}

/// One injectable parameter of a plan.
#[derive(Clone)]
pub struct PlanEntry {
    argument: &'static str,
    resource: &'static str,
    position: usize,
    handle: Handle,
    default: ParamDefault,
    provider: &'static dyn Provider,
}

impl PlanEntry {
    pub(crate) fn new(
        argument: &'static str,
        resource: &'static str,
        position: usize,
        handle: Handle,
        default: ParamDefault,
        provider: &'static dyn Provider,
    ) -> Self {
        Self {
            argument,
            resource,
            position,
            handle,
            default,
            provider,
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn argument(&self) -> &'static str {
        self.argument
    }

    /// Returns the resource name the parameter corresponds to.
    #[must_use]
    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// Returns the parameter position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the resource's slot handle.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Returns the parameter's declared default.
    #[must_use]
    pub fn default(&self) -> ParamDefault {
        self.default
    }

    /// Returns the provider supplying the resource.
    #[must_use]
    pub fn provider(&self) -> &'static dyn Provider {
        self.provider
    }
}

impl core::fmt::Debug for PlanEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlanEntry")
            .field("argument", &self.argument)
            .field("resource", &self.resource)
            .field("position", &self.position)
            .field("handle", &self.handle)
            .field("default", &self.default)
            .field("provider", &self.provider.id())
            .finish()
    }
}

/// The fixed injection plan of a decorated callable.
///
/// Built once, at decoration, and never recomputed.
#[derive(Debug, Clone)]
pub struct InjectionPlan {
    callable: &'static str,
    strategy: Strategy,
    entries: Vec<PlanEntry>,
    by_position: HashMap<usize, usize>,
}

impl InjectionPlan {
    pub(crate) fn new(callable: &'static str, strategy: Strategy, entries: Vec<PlanEntry>) -> Self {
        let by_position = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.position, index))
            .collect();
        Self {
            callable,
            strategy,
            entries,
            by_position,
        }
    }

    /// Returns the decorated callable's name.
    #[must_use]
    pub fn callable(&self) -> &'static str {
        self.callable
    }

    /// Returns the strategy the plan resolves with.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Returns the entries, in parameter order.
    #[must_use]
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Returns `true` if no parameter is injectable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry of the parameter at `position`.
    #[must_use]
    pub fn entry_at(&self, position: usize) -> Option<&PlanEntry> {
        self.by_position
            .get(&position)
            .and_then(|&index| self.entries.get(index))
    }

    /// Reads the current value of an entry on this thread.
    #[must_use]
    pub fn fetch(&self, entry: &PlanEntry) -> Option<Value> {
        match self.strategy {
            Strategy::Planned => context::slot(entry.handle),
            Strategy::Wrapping => {
                let payload = entry.provider.provided()?;
                entry.provider.resource_of(&payload, entry.resource)
            }
        }
    }

    /// Decides whether an unavailable entry is an error.
    fn missing(&self, entry: &PlanEntry) -> Result<(), CallError> {
        let fatal = match (self.strategy, entry.default) {
            (_, ParamDefault::InjectedIfAvailable) => false,
            (Strategy::Planned, _) => true,
            (Strategy::Wrapping, default) => default == ParamDefault::Injected,
        };
        if fatal {
            return Err(CallError::NoValuesProvided {
                argument: entry.argument.to_string(),
                resource: entry.resource.to_string(),
            });
        }
        Ok(())
    }

    /// Reads an entry, applying the strategy's failure rule.
    ///
    /// Returns `Ok(None)` when the value is unavailable but the parameter
    /// may fall back to its own default.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::NoValuesProvided`] when the value is unavailable
    /// and the parameter has no usable fallback.
    pub fn lookup(&self, entry: &PlanEntry) -> Result<Option<Value>, CallError> {
        match self.fetch(entry) {
            Some(value) => Ok(Some(value)),
            None => self.missing(entry).map(|()| None),
        }
    }

    /// Resolves the argument at `position`.
    ///
    /// An explicit value is returned as is. An injected one is read through
    /// the plan; `Ok(None)` means the parameter's own default applies.
    ///
    /// # Errors
    ///
    /// - [`CallError::NoValuesProvided`] if the value is required but unavailable.
    /// - [`CallError::TypeMismatch`] if the injected value is not a `T`.
    pub fn resolve<T: Clone + 'static>(
        &self,
        position: usize,
        arg: Arg<T>,
    ) -> Result<Option<T>, CallError> {
        let entry = match arg {
            Arg::Value(value) => return Ok(Some(value)),
            Arg::Injected => match self.entry_at(position) {
                Some(entry) => entry,
                None => return Ok(None),
            },
        };
        let Some(value) = self.lookup(entry)? else {
            return Ok(None);
        };
        read_value::<T>(&value)
            .map(Some)
            .ok_or_else(|| CallError::TypeMismatch {
                argument: entry.argument.to_string(),
                expected: core::any::type_name::<T>(),
            })
    }

    /// Resolves an argument that has no fallback of its own.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`resolve`](Self::resolve), or
    /// [`CallError::MissingArgument`] if nothing supplied a value.
    pub fn require<T: Clone + 'static>(
        &self,
        position: usize,
        argument: &str,
        arg: Arg<T>,
    ) -> Result<T, CallError> {
        self.resolve(position, arg)?
            .ok_or_else(|| CallError::MissingArgument {
                argument: argument.to_string(),
            })
    }

    /// Fills in the injectable arguments the caller did not supply.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::NoValuesProvided`] for the first required value
    /// that is unavailable.
    pub fn augment(&self, args: &mut CallArgs) -> Result<(), CallError> {
        for entry in &self.entries {
            if args.is_supplied(entry.position, entry.argument) {
                continue;
            }
            if let Some(value) = self.lookup(entry)? {
                args.keyword(entry.argument, value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectionMode;
    use crate::inject::Injector;
    use crate::provider::{InstanceProvider, create_provider, provider};
    use crate::resource::into_value;
    use std::sync::LazyLock;

    #[derive(crate::Resource)]
    struct Settings {
        level: u8,
        name: String,
    }

    static SETTINGS: LazyLock<InstanceProvider<Settings>> =
        LazyLock::new(|| create_provider(false));

    fn settings() -> Settings {
        Settings {
            level: 3,
            name: "armory".into(),
        }
    }

    fn plan_with(mode: InjectionMode, default: ParamDefault) -> InjectionPlan {
        let spec = FactorySpecification::function("configure")
            .param("flag")
            .with_default("level", default)
            .with_default("name", ParamDefault::Value);
        Injector::new([provider(&SETTINGS)])
            .with_mode(mode)
            .plan(&spec)
            .unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Positions
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn entries_are_indexed_by_position() {
        let plan = plan_with(InjectionMode::Planned, ParamDefault::Injected);

        assert_eq!(plan.entries().len(), 2);
        assert_eq!(plan.entry_at(1).unwrap().argument(), "level");
        assert_eq!(plan.entry_at(2).unwrap().default(), ParamDefault::Value);
        assert!(plan.entry_at(0).is_none());
        assert_eq!(plan.callable(), "configure");
    }

    #[test]
    fn unplanned_position_resolves_to_none() {
        let plan = plan_with(InjectionMode::Planned, ParamDefault::Injected);
        assert_eq!(plan.resolve(0, Arg::<bool>::Injected).unwrap(), None);
        assert_eq!(plan.resolve(0, Arg::Value(true)).unwrap(), Some(true));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Armed
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn both_strategies_read_armed_values() {
        for mode in [InjectionMode::Planned, InjectionMode::Wrapping] {
            let plan = plan_with(mode, ParamDefault::Injected);
            let _armed = SETTINGS.arm(settings()).unwrap();

            assert_eq!(plan.resolve(1, Arg::<u8>::Injected).unwrap(), Some(3));
            assert_eq!(
                plan.require(2, "name", Arg::<String>::Injected).unwrap(),
                "armory"
            );
            assert_eq!(plan.resolve(1, Arg::Value(9_u8)).unwrap(), Some(9));
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Unarmed
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn planned_requires_values_even_with_plain_default() {
        let plan = plan_with(InjectionMode::Planned, ParamDefault::Value);

        let err = plan.resolve(1, Arg::<u8>::Injected).unwrap_err();
        assert!(matches!(err, CallError::NoValuesProvided { .. }));
    }

    #[test]
    fn wrapping_keeps_plain_defaults() {
        let plan = plan_with(InjectionMode::Wrapping, ParamDefault::Value);
        assert_eq!(plan.resolve(1, Arg::<u8>::Injected).unwrap(), None);
    }

    #[test]
    fn wrapping_requires_injected_values() {
        let plan = plan_with(InjectionMode::Wrapping, ParamDefault::Injected);

        let err = plan.resolve(1, Arg::<u8>::Injected).unwrap_err();
        assert_eq!(
            err,
            CallError::NoValuesProvided {
                argument: "level".into(),
                resource: "level".into()
            }
        );
    }

    #[test]
    fn if_available_never_fails() {
        for mode in [InjectionMode::Planned, InjectionMode::Wrapping] {
            let plan = plan_with(mode, ParamDefault::InjectedIfAvailable);
            assert_eq!(plan.resolve(1, Arg::<u8>::Injected).unwrap(), None);
        }
    }

    #[test]
    fn require_reports_missing_argument() {
        let plan = plan_with(InjectionMode::Wrapping, ParamDefault::InjectedIfAvailable);
        let err = plan.require(1, "level", Arg::<u8>::Injected).unwrap_err();
        assert_eq!(
            err,
            CallError::MissingArgument {
                argument: "level".into()
            }
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Augment
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn augment_skips_supplied_arguments() {
        let plan = plan_with(InjectionMode::Wrapping, ParamDefault::Injected);
        let _armed = SETTINGS.arm(settings()).unwrap();

        let mut args = CallArgs::new()
            .arg(true)
            .arg(7_u8)
            .kwarg("unrelated", 0_i32);
        plan.augment(&mut args).unwrap();

        assert_eq!(args.get::<u8>(1, "level").unwrap(), Some(7));
        assert_eq!(args.get::<String>(2, "name").unwrap().as_deref(), Some("armory"));
    }

    #[test]
    fn augment_leaves_defaults_when_unarmed() {
        let plan = plan_with(InjectionMode::Wrapping, ParamDefault::Value);

        let mut args = CallArgs::new();
        args.push(into_value(false));
        plan.augment(&mut args).unwrap();

        assert!(!args.is_supplied(1, "level"));
        assert!(!args.is_supplied(2, "name"));
    }
}
