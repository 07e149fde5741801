//! Process-level injection settings.
//!
//! The only setting is the [`InjectionMode`], read once from the
//! `ARMORY_WRAPPING_INJECTOR` environment variable. Builders can override it
//! per decoration with [`Injector::with_mode`](crate::inject::Injector::with_mode).

use std::sync::LazyLock;

/// Environment variable forcing the wrapping strategy for every callable.
pub const WRAPPING_INJECTOR_ENV: &str = "ARMORY_WRAPPING_INJECTOR";

/// Strategy preference for decorated callables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InjectionMode {
    /// Resolve through precomputed slot reads where the callable allows it.
    #[default]
    Planned,
    /// Always resolve through the provider's armed payload.
    Wrapping,
}

impl InjectionMode {
    /// Reads the mode from the environment.
    ///
    /// Any non-empty value of [`WRAPPING_INJECTOR_ENV`] other than `0` or
    /// `false` selects [`InjectionMode::Wrapping`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(WRAPPING_INJECTOR_ENV).ok().as_deref())
    }

    /// Interprets a raw environment value.
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("" | "0") => Self::Planned,
            Some(flag) if flag.eq_ignore_ascii_case("false") => Self::Planned,
            Some(_) => Self::Wrapping,
        }
    }

    /// Returns the process-wide mode, read from the environment on first use.
    #[must_use]
    pub fn current() -> Self {
        static MODE: LazyLock<InjectionMode> = LazyLock::new(|| {
            let mode = InjectionMode::from_env();
            tracing::debug!(?mode, "injection mode selected");
            mode
        });
        *MODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_disabled_selects_planned() {
        assert_eq!(InjectionMode::from_env_value(None), InjectionMode::Planned);
        assert_eq!(InjectionMode::from_env_value(Some("")), InjectionMode::Planned);
        assert_eq!(InjectionMode::from_env_value(Some("0")), InjectionMode::Planned);
        assert_eq!(InjectionMode::from_env_value(Some("False")), InjectionMode::Planned);
    }

    #[test]
    fn any_other_value_selects_wrapping() {
        assert_eq!(InjectionMode::from_env_value(Some("1")), InjectionMode::Wrapping);
        assert_eq!(InjectionMode::from_env_value(Some("yes")), InjectionMode::Wrapping);
    }

    #[test]
    fn default_is_planned() {
        assert_eq!(InjectionMode::default(), InjectionMode::Planned);
    }
}
