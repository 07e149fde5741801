//! `#[inject]` and `#[inject_methods]` expansion.
//!
//! A decorated function keeps its name and parameter order. Each marked
//! parameter is retyped to `Arg<T>`, the return type becomes
//! `Result<R, InjectError>`, and a prologue resolves the marked parameters
//! through a lazily built plan before the original body runs.
//!
//! Each plan lives in a module-level static registered in
//! `armory_core::inject::DECORATED`, so `validate_all` can build it without
//! calling the function.

use crate::option_inner;
use armory_macro_utils::core_path;
use armory_macro_utils::mangle::mangle_impl;
use proc_macro2::{TokenStream, TokenTree};
use quote::{ToTokens, format_ident, quote};
use syn::ext::IdentExt;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Block, Expr, FnArg, Ident, ImplItem, ItemFn, ItemImpl, Pat, Path, ReturnType,
    Signature, Token, Type, Visibility, parse_quote,
};

/// Whether injectable parameter names carry the `_` marker.
#[derive(Clone, Copy)]
pub(crate) enum Suffix {
    None,
    Underscore,
}

/// The injection marker on a parameter.
enum Marker {
    Injected,
    InjectedIfAvailable,
    Default(Expr),
}

/// A non-receiver parameter of a decorated signature.
struct Param {
    ident: Option<Ident>,
    name: String,
    marker: Option<Marker>,
}

/// Everything generated code needs to build a plan.
struct Context {
    core: TokenStream,
    providers: Vec<Path>,
    suffix: Suffix,
}

impl Context {
    fn new(attr: TokenStream, suffix: Suffix) -> syn::Result<Self> {
        let providers: Vec<Path> = Punctuated::<Path, Token![,]>::parse_terminated
            .parse2(attr.clone())?
            .into_iter()
            .collect();
        if providers.is_empty() {
            return Err(syn::Error::new_spanned(
                attr,
                "expected at least one provider, e.g. `#[inject(PROVIDER)]`",
            ));
        }
        Ok(Self {
            core: core_path(),
            providers,
            suffix,
        })
    }

    /// `Injector::new([...])` or `Injector::with_suffix([...])`.
    fn injector(&self) -> TokenStream {
        let core = &self.core;
        let providers = &self.providers;
        let constructor = match self.suffix {
            Suffix::None => quote!(new),
            Suffix::Underscore => quote!(with_suffix),
        };
        quote! {
            #core::inject::Injector::#constructor([
                #(#core::provider::provider(&#providers)),*
            ])
        }
    }

    /// The `FactorySpecification` of a signature.
    fn specification(&self, callable: &TokenStream, params: &[Param]) -> TokenStream {
        let core = &self.core;
        let calls = params.iter().map(|param| {
            let name = &param.name;
            let default = match &param.marker {
                None => return quote!(.param(#name)),
                Some(Marker::Injected) => quote!(Injected),
                Some(Marker::InjectedIfAvailable) => quote!(InjectedIfAvailable),
                Some(Marker::Default(_)) => quote!(Value),
            };
            quote!(.with_default(#name, #core::spec::ParamDefault::#default))
        });
        quote! {
            #core::spec::FactorySpecification::function(#callable) #(#calls)*
        }
    }

    /// Rewrites a signature and body in place.
    ///
    /// Returns the plan static and its registration, to be emitted next to
    /// the decorated item.
    fn decorate(
        &self,
        callable: &TokenStream,
        plan: &Ident,
        sig: &mut Signature,
        block: &mut Block,
        params: &[Param],
    ) -> syn::Result<TokenStream> {
        if let Some(asyncness) = &sig.asyncness {
            return Err(syn::Error::new_spanned(
                asyncness,
                "injection is synchronous, async functions cannot be decorated",
            ));
        }

        let core = &self.core;
        let mut prologue = Vec::new();

        for (position, (input, param)) in typed_inputs(sig).zip(params).enumerate() {
            let Some(marker) = &param.marker else {
                continue;
            };
            let Some(ident) = &param.ident else {
                return Err(syn::Error::new_spanned(
                    &input.pat,
                    "injected parameters must be plain identifiers",
                ));
            };
            let name = &param.name;
            let mutability = take_mutability(&mut input.pat);
            let ty = &input.ty;

            let (resolution, arg_ty) = match marker {
                Marker::Injected => (
                    quote!(__armory_plan.require(#position, #name, #ident)?),
                    quote!(#ty),
                ),
                Marker::InjectedIfAvailable => {
                    let inner = option_inner(ty).ok_or_else(|| {
                        syn::Error::new_spanned(
                            ty,
                            "injected_if_available parameters must be `Option<T>`",
                        )
                    })?;
                    (
                        quote!(__armory_plan.resolve(#position, #ident)?),
                        quote!(#inner),
                    )
                }
                Marker::Default(default) => (
                    quote! {
                        match __armory_plan.resolve(#position, #ident)? {
                            ::core::option::Option::Some(value) => value,
                            ::core::option::Option::None => #default,
                        }
                    },
                    quote!(#ty),
                ),
            };

            prologue.push(quote!(let #mutability #ident = #resolution;));
            input.ty = Box::new(parse_quote!(#core::spec::Arg<#arg_ty>));
        }

        let output = match &sig.output {
            ReturnType::Default => parse_quote!(()),
            ReturnType::Type(_, ty) => (**ty).clone(),
        };
        let body = if needs_inference(&output) {
            quote!((move || #block)())
        } else {
            quote!((move || -> #output #block)())
        };

        let injector = self.injector();
        let specification = self.specification(callable, params);
        let entry = format_ident!("{}_ENTRY", plan);

        sig.output = parse_quote!(
            -> ::core::result::Result<#output, #core::inject::InjectError>
        );
        *block = parse_quote!({
            let __armory_plan = #core::inject::ready(&#plan)?;
            #(#prologue)*
            ::core::result::Result::Ok(#body)
        });

        Ok(quote! {
            #[doc(hidden)]
            static #plan: #core::inject::PlanCell =
                #core::inject::PlanCell::new(|| #injector.plan(&#specification));

            #[#core::__private::linkme::distributed_slice(#core::inject::DECORATED)]
            #[linkme(crate = #core::__private::linkme)]
            static #entry: #core::inject::DecoratedEntry = #core::inject::DecoratedEntry {
                callable: #callable,
                plan: &#plan,
            };
        })
    }
}

/// Expands `#[inject]` on a free function.
pub(crate) fn expand_fn(attr: TokenStream, item: TokenStream, suffix: Suffix) -> syn::Result<TokenStream> {
    let context = Context::new(attr, suffix)?;
    let mut function: ItemFn = syn::parse2(item)?;

    let name = function.sig.ident.unraw().to_string();
    let callable = quote!(::core::concat!(::core::module_path!(), "::", #name));
    let plan = plan_ident(&[&name]);
    let params = take_params(&mut function.sig)?;

    let registration = context.decorate(
        &callable,
        &plan,
        &mut function.sig,
        &mut function.block,
        &params,
    )?;
    Ok(quote! {
        #function
        #registration
    })
}

/// Expands `#[inject_methods]` on an inherent impl block.
pub(crate) fn expand_impl(attr: TokenStream, item: TokenStream, suffix: Suffix) -> syn::Result<TokenStream> {
    let context = Context::new(attr, suffix)?;
    let mut item: ItemImpl = syn::parse2(item)?;

    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "inject_methods applies to inherent impl blocks",
        ));
    }
    let owner = match &*item.self_ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.unraw().to_string()),
        _ => None,
    };
    let Some(owner) = owner else {
        return Err(syn::Error::new_spanned(
            &item.self_ty,
            "inject_methods requires a named self type",
        ));
    };

    mangle_impl(&mut item);

    let core = &context.core;
    let injector = context.injector();
    let mut validations = Vec::new();
    let mut registrations = Vec::new();

    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let public = matches!(method.vis, Visibility::Public(_));
        let marked = typed_inputs(&mut method.sig).any(|input| has_marker(&input.attrs));

        if !public {
            if marked {
                return Err(syn::Error::new_spanned(
                    &method.sig.ident,
                    "only public methods are injected",
                ));
            }
            continue;
        }

        let name = method.sig.ident.unraw().to_string();
        let callable = quote!(::core::concat!(::core::module_path!(), "::", #owner, "::", #name));
        let params = take_params(&mut method.sig)?;
        let specification = context.specification(&callable, &params);
        validations.push(quote!(#injector.plan(&#specification)?;));

        if marked {
            let plan = plan_ident(&[&owner, &name]);
            registrations.push(context.decorate(
                &callable,
                &plan,
                &mut method.sig,
                &mut method.block,
                &params,
            )?);
        }
    }

    item.items.push(parse_quote! {
        /// Checks the injection declarations of every public method.
        ///
        /// # Errors
        ///
        /// Returns the first `DecorationError` found.
        pub fn validate_injection() -> ::core::result::Result<(), #core::inject::DecorationError> {
            #(#validations)*
            ::core::result::Result::Ok(())
        }
    });

    Ok(quote! {
        #item
        #(#registrations)*
    })
}

/// Names the module-level plan static of a decorated callable.
fn plan_ident(parts: &[&str]) -> Ident {
    format_ident!("__ARMORY_PLAN_{}", parts.join("__").to_uppercase())
}

/// Iterates the non-receiver parameters.
fn typed_inputs(sig: &mut Signature) -> impl Iterator<Item = &mut syn::PatType> {
    sig.inputs.iter_mut().filter_map(|input| match input {
        FnArg::Typed(pat_type) => Some(pat_type),
        FnArg::Receiver(_) => None,
    })
}

fn has_marker(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        let path = attr.path();
        path.is_ident("injected") || path.is_ident("injected_if_available") || path.is_ident("default")
    })
}

/// Collects the parameters, stripping their injection markers.
fn take_params(sig: &mut Signature) -> syn::Result<Vec<Param>> {
    let mut params = Vec::new();
    for input in typed_inputs(sig) {
        let mut marker = None;
        let mut kept = Vec::with_capacity(input.attrs.len());

        for attr in input.attrs.drain(..) {
            let parsed = if attr.path().is_ident("injected") {
                attr.meta.require_path_only()?;
                Marker::Injected
            } else if attr.path().is_ident("injected_if_available") {
                attr.meta.require_path_only()?;
                Marker::InjectedIfAvailable
            } else if attr.path().is_ident("default") {
                Marker::Default(attr.parse_args()?)
            } else {
                kept.push(attr);
                continue;
            };
            if marker.replace(parsed).is_some() {
                return Err(syn::Error::new_spanned(
                    attr,
                    "a parameter takes at most one injection marker",
                ));
            }
        }
        input.attrs = kept;

        let ident = match &*input.pat {
            Pat::Ident(pat) if pat.by_ref.is_none() && pat.subpat.is_none() => Some(pat.ident.clone()),
            _ => None,
        };
        let name = ident
            .as_ref()
            .map_or_else(|| String::from("_"), |ident| ident.unraw().to_string());
        params.push(Param {
            ident,
            name,
            marker,
        });
    }
    Ok(params)
}

/// Removes `mut` from an identifier pattern, returning it.
fn take_mutability(pat: &mut Pat) -> Option<Token![mut]> {
    match pat {
        Pat::Ident(pat) => pat.mutability.take(),
        _ => None,
    }
}

/// Returns `true` if a closure returning `ty` cannot be annotated with it.
///
/// Elided lifetimes and `impl Trait` do not carry over into closure return
/// types, so those are left to inference.
fn needs_inference(ty: &Type) -> bool {
    fn scan(tokens: TokenStream) -> bool {
        tokens.into_iter().any(|token| match token {
            TokenTree::Punct(punct) => punct.as_char() == '&' || punct.as_char() == '\'',
            TokenTree::Ident(ident) => ident == "impl",
            TokenTree::Group(group) => scan(group.stream()),
            TokenTree::Literal(_) => false,
        })
    }
    scan(ty.to_token_stream())
}
