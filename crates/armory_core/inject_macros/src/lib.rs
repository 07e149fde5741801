//! Procedural macros for the `armory_core` crate.
//!
//! This crate provides:
//!
//! - `#[derive(Resource)]` - exposes a struct's fields as provided resources
//! - `#[derive(Factory)]` - declares a struct's constructor schema
//! - `#[inject]` / `#[inject_with_suffix]` - inject a function's parameters
//! - `#[inject_methods]` / `#[inject_methods_with_suffix]` - inject the public
//!   methods of an impl block
//!
//! # Example
//!
//! ```ignore
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
//! #[inject(PAIR)]
//! fn sum(#[injected] a: i64, #[injected] b: i64) -> i64 {
//!     a + b
//! }
//!
//! // The generated function takes `Arg<i64>` parameters and returns
//! // `Result<i64, InjectError>`:
//! let _armed = PAIR.arm(Pair { a: 1, b: 2 })?;
//! assert_eq!(sum(INJECTED, INJECTED)?, 3);
//! ```

mod factory;
mod inject;
mod resource;

use proc_macro::TokenStream;
use syn::{DeriveInput, GenericArgument, PathArguments, Type, parse_macro_input};

/// Implements `Resource` for a struct with named fields.
///
/// Every named field is exposed under its own name, except fields whose name
/// starts with `_` and fields marked `#[resource(skip)]`. Methods taking
/// `&self` can be exposed with `#[resource(accessors(name, ...))]` on the
/// struct. Exposed values must be `Clone + Send + Sync + 'static`.
///
/// # Usage
///
/// ```ignore
/// #[derive(Resource)]
/// #[resource(accessors(area))]
/// struct Rect {
///     width: u32,
///     height: u32,
///     #[resource(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Resource, attributes(resource))]
pub fn derive_resource(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    resource::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `Introspect` and `Construct` for a struct with named fields.
///
/// Field attributes declare each field's default:
///
/// - `#[factory(injected)]` - must be injected
/// - `#[factory(injected_if_available)]` - injected when available, on an
///   `Option<T>` field
/// - `#[factory(default = expr)]` - falls back to `expr`
/// - no attribute - must be supplied
///
/// # Usage
///
/// ```ignore
/// #[derive(Factory)]
/// struct Client {
///     #[factory(injected)]
///     url: String,
///     #[factory(default = 3)]
///     retries: u8,
/// }
/// ```
#[proc_macro_derive(Factory, attributes(factory))]
pub fn derive_factory(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    factory::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Injects the marked parameters of a function from the given providers.
///
/// Parameter attributes:
///
/// - `#[injected]` - resolved from the providers, required
/// - `#[injected_if_available]` - resolved when available, on an `Option<T>`
///   parameter
/// - `#[default(expr)]` - resolved when available, `expr` otherwise
///
/// Marked parameters take an `Arg<T>` at the call site, so callers pass
/// either `INJECTED` or an explicit value. The function returns
/// `Result<R, InjectError>`.
///
/// # Generated Code
///
/// For a function like:
/// ```ignore
/// #[inject(PAIR)]
/// fn sum(#[injected] a: i64, #[default(0)] b: i64) -> i64 {
///     a + b
/// }
/// ```
///
/// The macro generates:
/// ```ignore
/// fn sum(a: Arg<i64>, b: Arg<i64>) -> Result<i64, InjectError> {
///     let __armory_plan = ready(&__ARMORY_PLAN_SUM)?;
///     let a = __armory_plan.require(0, "a", a)?;
///     let b = match __armory_plan.resolve(1, b)? {
///         Some(value) => value,
///         None => 0,
///     };
///     Ok((move || -> i64 { a + b })())
/// }
///
/// static __ARMORY_PLAN_SUM: PlanCell = PlanCell::new(|| {
///     Injector::new([provider(&PAIR)]).plan(
///         &FactorySpecification::function(concat!(module_path!(), "::", "sum"))
///             .with_default("a", ParamDefault::Injected)
///             .with_default("b", ParamDefault::Value),
///     )
/// });
///
/// #[distributed_slice(DECORATED)]
/// static __ARMORY_PLAN_SUM_ENTRY: DecoratedEntry = DecoratedEntry {
///     callable: concat!(module_path!(), "::", "sum"),
///     plan: &__ARMORY_PLAN_SUM,
/// };
/// ```
///
/// The registration lets `validate_all` check the declaration without
/// calling `sum`.
#[proc_macro_attribute]
pub fn inject(attr: TokenStream, item: TokenStream) -> TokenStream {
    inject::expand_fn(attr.into(), item.into(), inject::Suffix::None)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Like `#[inject]`, but only parameters named `<resource>_` are injectable.
#[proc_macro_attribute]
pub fn inject_with_suffix(attr: TokenStream, item: TokenStream) -> TokenStream {
    inject::expand_fn(attr.into(), item.into(), inject::Suffix::Underscore)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Injects the public methods of an inherent impl block.
///
/// Public methods carrying injection attributes are decorated as with
/// `#[inject]`; other methods are left as they are. Private members named
/// `__name` are renamed to `_<Owner>__name` throughout the block. An
/// associated `validate_injection()` function is added, which checks the
/// declarations of every public method against the providers.
///
/// # Usage
///
/// ```ignore
/// struct Calculator;
///
/// #[inject_methods(PAIR)]
/// impl Calculator {
///     pub fn sum(&self, #[injected] a: i64, #[injected] b: i64) -> i64 {
///         self.__combine(a, b)
///     }
///
///     fn __combine(&self, a: i64, b: i64) -> i64 {
///         a + b
///     }
/// }
///
/// Calculator::validate_injection()?;
/// ```
#[proc_macro_attribute]
pub fn inject_methods(attr: TokenStream, item: TokenStream) -> TokenStream {
    inject::expand_impl(attr.into(), item.into(), inject::Suffix::None)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Like `#[inject_methods]`, but only parameters named `<resource>_` are
/// injectable.
#[proc_macro_attribute]
pub fn inject_methods_with_suffix(attr: TokenStream, item: TokenStream) -> TokenStream {
    inject::expand_impl(attr.into(), item.into(), inject::Suffix::Underscore)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// If `ty` is `Option<T>`, returns `T`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };

    let last_segment = type_path.path.segments.last()?;
    if last_segment.ident != "Option" {
        return None;
    }

    let PathArguments::AngleBracketed(angle_args) = &last_segment.arguments else {
        return None;
    };

    match angle_args.args.first() {
        Some(GenericArgument::Type(inner)) if angle_args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
