//! Shared utilities for Armory procedural macro crates.
//!
//! Provides:
//!
//! - crate-path resolution, so generated code emits correct fully-qualified
//!   paths whether the consumer depends on `armory_core` directly or on the
//!   `armory` umbrella crate;
//! - the [`mangle`] pass, which rewrites references to private members of an
//!   impl block to their owner-qualified names.

pub mod mangle;

use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Returns the path generated code should use to reach `armory_core`.
///
/// A direct (possibly renamed) dependency wins. Otherwise the `armory`
/// umbrella crate is used as `armory::armory_core`. If neither is found, the
/// plain name is emitted and the compiler reports the missing dependency.
pub fn core_path() -> TokenStream {
    match crate_name("armory_core") {
        Ok(FoundCrate::Itself) => quote!(armory_core),
        Ok(FoundCrate::Name(found)) => {
            let ident = format_ident!("{}", found);
            quote!(#ident)
        }
        Err(_) => match crate_name("armory") {
            Ok(FoundCrate::Name(found)) => {
                let armory = format_ident!("{}", found);
                quote!(#armory::armory_core)
            }
            _ => quote!(armory_core),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_crates_fall_back_to_the_plain_name() {
        // This crate depends on neither `armory_core` nor `armory`.
        assert_eq!(core_path().to_string(), "armory_core");
    }
}
