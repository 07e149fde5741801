//! `#[derive(Resource)]` expansion.

use armory_macro_utils::core_path;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Ident};

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let core = core_path();
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "Resource can only be derived for structs",
        ));
    };

    let mut names: Vec<String> = Vec::new();
    let mut reads = Vec::new();

    match &data.fields {
        Fields::Named(fields) => {
            for field in &fields.named {
                let Some(ident) = &field.ident else {
                    continue;
                };
                if is_skipped(&field.attrs)? {
                    continue;
                }
                let resource = ident.unraw().to_string();
                if resource.starts_with('_') {
                    continue;
                }
                reads.push(quote! {
                    #resource => ::core::option::Option::Some(
                        #core::resource::into_value(::core::clone::Clone::clone(&self.#ident))
                    )
                });
                names.push(resource);
            }
        }
        Fields::Unit => {}
        Fields::Unnamed(fields) => {
            return Err(syn::Error::new_spanned(
                fields,
                "Resource requires named fields",
            ));
        }
    }

    for accessor in accessors(input)? {
        let resource = accessor.unraw().to_string();
        if names.contains(&resource) {
            return Err(syn::Error::new_spanned(
                &accessor,
                format!("resource `{resource}` is already exposed by a field"),
            ));
        }
        reads.push(quote! {
            #resource => ::core::option::Option::Some(#core::resource::into_value(self.#accessor()))
        });
        names.push(resource);
    }

    Ok(quote! {
        impl #impl_generics #core::resource::Resource for #name #ty_generics #where_clause {
            fn provides() -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn resource(&self, name: &str) -> ::core::option::Option<#core::resource::Value> {
                match name {
                    #(#reads,)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

/// Returns `true` if the field carries `#[resource(skip)]`.
fn is_skipped(attrs: &[syn::Attribute]) -> syn::Result<bool> {
    let mut skip = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("resource")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported resource field attribute, expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}

/// Collects the methods listed in `#[resource(accessors(...))]`.
fn accessors(input: &DeriveInput) -> syn::Result<Vec<Ident>> {
    let mut accessors = Vec::new();
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("resource")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("accessors") {
                return Err(meta.error("unsupported resource attribute, expected `accessors(...)`"));
            }
            meta.parse_nested_meta(|accessor| {
                let ident = accessor
                    .path
                    .get_ident()
                    .ok_or_else(|| accessor.error("expected a method name"))?;
                accessors.push(ident.clone());
                Ok(())
            })
        })?;
    }
    Ok(accessors)
}
