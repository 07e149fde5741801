//! Private-name mangling for lifted impl members.
//!
//! Members whose name starts with two underscores (and does not end with
//! two) are private to their owner type. Their definitions and every
//! reference to them inside one impl block are renamed to
//! `_<Owner>__name`, so the names stay unique to the owner once the macro
//! has rewritten the block.

use syn::ext::IdentExt;
use syn::visit_mut::{self, VisitMut};
use syn::{ExprMethodCall, Ident, ImplItemFn, Path, parse_quote};

/// Returns `true` for names of the form `__name`, excluding `__name__`.
#[must_use]
pub fn is_private_name(name: &str) -> bool {
    name.starts_with("__") && !name.ends_with("__")
}

/// Returns the owner-qualified form of a private name.
///
/// Leading underscores of the owner are stripped. Returns `None` when the
/// name is not private or the owner is empty.
#[must_use]
pub fn mangled_name(owner: &str, name: &str) -> Option<String> {
    if !is_private_name(name) {
        return None;
    }
    let owner = owner.trim_start_matches('_');
    if owner.is_empty() {
        return None;
    }
    Some(format!("_{owner}{name}"))
}

/// Rewrites private member names within an impl block.
///
/// Handles method calls (`<expr>.__name(..)`), associated paths
/// (`Self::__name`, `<Owner>::__name`) and method definitions
/// (`fn __name`). Struct fields are declared outside the impl block and are
/// left as they are.
pub struct ManglePrivateMembers {
    owner: String,
}

impl ManglePrivateMembers {
    /// Creates a pass for the given owner type name.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
        }
    }

    /// Returns the owner type name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn mangle(&self, ident: &Ident) -> Option<Ident> {
        mangled_name(&self.owner, &ident.unraw().to_string()).map(|name| Ident::new(&name, ident.span()))
    }

    fn names_owner(&self, ident: &Ident) -> bool {
        ident == "Self" || ident.unraw() == self.owner.as_str()
    }

    fn mangle_path(&self, path: &mut Path) {
        if path.segments.len() != 2 {
            return;
        }
        if !self.names_owner(&path.segments[0].ident) {
            return;
        }
        if let Some(mangled) = self.mangle(&path.segments[1].ident) {
            path.segments[1].ident = mangled;
        }
    }
}

impl VisitMut for ManglePrivateMembers {
    fn visit_expr_method_call_mut(&mut self, node: &mut ExprMethodCall) {
        visit_mut::visit_expr_method_call_mut(self, node);
        if let Some(mangled) = self.mangle(&node.method) {
            node.method = mangled;
        }
    }

    fn visit_path_mut(&mut self, node: &mut Path) {
        visit_mut::visit_path_mut(self, node);
        self.mangle_path(node);
    }

    fn visit_impl_item_fn_mut(&mut self, node: &mut ImplItemFn) {
        visit_mut::visit_impl_item_fn_mut(self, node);
        if let Some(mangled) = self.mangle(&node.sig.ident) {
            node.sig.ident = mangled;
            node.attrs.push(parse_quote!(#[allow(non_snake_case)]));
        }
    }
}

/// Applies the pass to an impl block, using the last segment of its self type
/// as the owner.
///
/// Returns `false` if the self type is not a plain path.
pub fn mangle_impl(item: &mut syn::ItemImpl) -> bool {
    let owner = match &*item.self_ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.unraw().to_string()),
        _ => None,
    };
    let Some(owner) = owner else {
        return false;
    };
    ManglePrivateMembers::new(owner).visit_item_impl_mut(item);
    true
}
