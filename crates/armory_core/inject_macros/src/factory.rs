//! `#[derive(Factory)]` expansion.

use crate::option_inner;
use armory_macro_utils::core_path;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Expr, Field, Fields};

/// The default a field declares.
enum FieldDefault {
    Injected,
    InjectedIfAvailable,
    Value(Expr),
}

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let core = core_path();
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "Factory can only be derived for structs",
        ));
    };

    let fields: Vec<&Field> = match &data.fields {
        Fields::Named(fields) => fields.named.iter().collect(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(fields) => {
            return Err(syn::Error::new_spanned(fields, "Factory requires named fields"));
        }
    };

    let args = if fields.is_empty() {
        format_ident!("_args")
    } else {
        format_ident!("args")
    };

    let mut spec_calls = Vec::new();
    let mut builders = Vec::new();

    for (position, field) in fields.into_iter().enumerate() {
        let Some(ident) = &field.ident else {
            continue;
        };
        let argument = ident.unraw().to_string();
        let ty = &field.ty;
        let missing = quote! {
            ::core::option::Option::ok_or_else(
                #args.get::<#ty>(#position, #argument)?,
                || #core::inject::CallError::MissingArgument {
                    argument: ::std::string::String::from(#argument),
                },
            )?
        };

        match field_default(field)? {
            None => {
                spec_calls.push(quote!(.param(#argument)));
                builders.push(quote!(#ident: #missing));
            }
            Some(FieldDefault::Injected) => {
                spec_calls.push(quote! {
                    .with_default(#argument, #core::spec::ParamDefault::Injected)
                });
                builders.push(quote!(#ident: #missing));
            }
            Some(FieldDefault::InjectedIfAvailable) => {
                let inner = option_inner(ty).ok_or_else(|| {
                    syn::Error::new_spanned(ty, "injected_if_available fields must be `Option<T>`")
                })?;
                spec_calls.push(quote! {
                    .with_default(#argument, #core::spec::ParamDefault::InjectedIfAvailable)
                });
                builders.push(quote!(#ident: #args.get::<#inner>(#position, #argument)?));
            }
            Some(FieldDefault::Value(default)) => {
                spec_calls.push(quote! {
                    .with_default(#argument, #core::spec::ParamDefault::Value)
                });
                builders.push(quote! {
                    #ident: ::core::option::Option::unwrap_or_else(
                        #args.get::<#ty>(#position, #argument)?,
                        || #default,
                    )
                });
            }
        }
    }

    let construction = if matches!(data.fields, Fields::Unit) {
        quote!(Self)
    } else {
        quote!(Self { #(#builders),* })
    };

    Ok(quote! {
        impl #impl_generics #core::spec::Introspect for #name #ty_generics #where_clause {
            fn specification() -> #core::spec::FactorySpecification {
                #core::spec::FactorySpecification::constructor(
                    ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#name))
                )
                #(#spec_calls)*
            }
        }

        impl #impl_generics #core::inject::Construct for #name #ty_generics #where_clause {
            fn construct(
                #args: #core::inject::CallArgs,
            ) -> ::core::result::Result<Self, #core::inject::CallError> {
                ::core::result::Result::Ok(#construction)
            }
        }
    })
}

/// Parses the `#[factory(...)]` attribute of a field.
fn field_default(field: &Field) -> syn::Result<Option<FieldDefault>> {
    let mut default = None;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("factory")) {
        attr.parse_nested_meta(|meta| {
            let parsed = if meta.path.is_ident("injected") {
                FieldDefault::Injected
            } else if meta.path.is_ident("injected_if_available") {
                FieldDefault::InjectedIfAvailable
            } else if meta.path.is_ident("default") {
                FieldDefault::Value(meta.value()?.parse()?)
            } else {
                return Err(meta.error(
                    "unsupported factory attribute, expected `injected`, `injected_if_available` or `default = ...`",
                ));
            };
            if default.replace(parsed).is_some() {
                return Err(meta.error("a field declares at most one default"));
            }
            Ok(())
        })?;
    }
    Ok(default)
}
