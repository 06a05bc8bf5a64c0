//! Parameter projection: turn parameter patterns into argument-capturing expressions.

use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{parse_quote, Expr, Ident, Member, Pat, PatIdent, Stmt};

use crate::transform::declaration::Parameter;

/// Prefix of the fresh outer bindings that replace destructuring patterns.
pub const ARG_PREFIX: &str = "__bridgetape_arg";

/// How the outer (wrapping) definition receives, captures, and forwards its
/// parameters.
pub struct ParamPlan {
    /// Outer parameter patterns, in declaration order.
    pub outer: Vec<Pat>,
    /// Owned arguments handed to the inner definition.
    pub forward: Vec<Ident>,
    /// `let` statements re-applying destructuring patterns by reference.
    pub rebind: Vec<Stmt>,
    /// One captured value per parameter.
    pub projections: Vec<Expr>,
}

impl ParamPlan {
    pub fn new(params: &[Parameter<'_>], root: &syn::Path) -> Self {
        let mut plan = ParamPlan {
            outer: Vec::with_capacity(params.len()),
            forward: Vec::with_capacity(params.len()),
            rebind: Vec::new(),
            projections: Vec::with_capacity(params.len()),
        };

        for (idx, param) in params.iter().enumerate() {
            if let Some(ident) = param.simple_ident() {
                plan.outer.push(plain_binding(ident.clone()));
                plan.forward.push(ident.clone());
                plan.projections.push(capture(root, ident));
                continue;
            }

            let fresh = format_ident!("{}{}", ARG_PREFIX, idx);
            plan.outer.push(plain_binding(fresh.clone()));
            plan.forward.push(fresh.clone());
            if matches!(param.pat, Pat::Wild(_)) {
                plan.projections.push(hole(root));
                continue;
            }
            let pattern = by_reference(param.pat);
            plan.rebind.push(parse_quote! { let #pattern = &#fresh; });
            plan.projections.push(project(param.pat, root));
        }

        plan
    }

    /// Expression building the captured argument list.
    pub fn args_expr(&self) -> Expr {
        let projections = &self.projections;
        if self.rebind.is_empty() {
            return parse_quote! { ::std::vec![#(#projections),*] };
        }
        let rebind = &self.rebind;
        parse_quote! {
            {
                #(#rebind)*
                ::std::vec![#(#projections),*]
            }
        }
    }
}

/// Projection of one pattern whose bindings are in scope.
///
/// Struct patterns become objects keyed by field name. Tuple, tuple-struct, and
/// slice patterns become arrays with a hole for each `_` and one for a `..` rest
/// (named or not). A newtype pattern `Meters(m)` projects as `m`, the way serde
/// serializes newtype structs.
pub fn project(pat: &Pat, root: &syn::Path) -> Expr {
    match pat {
        Pat::Ident(pat) => capture(root, &pat.ident),
        Pat::Reference(pat) => project(&pat.pat, root),
        Pat::Paren(pat) => project(&pat.pat, root),
        Pat::Type(pat) => project(&pat.pat, root),
        Pat::Struct(pat) => {
            let fields = pat.fields.iter().map(|field| {
                let key = match &field.member {
                    Member::Named(ident) => ident.unraw().to_string(),
                    Member::Unnamed(index) => index.index.to_string(),
                };
                let value = project(&field.pat, root);
                quote! { (#key, #value) }
            });
            parse_quote! { #root::runtime::object([#(#fields),*]) }
        }
        Pat::Tuple(pat) => positional(&pat.elems, root),
        Pat::TupleStruct(pat) if pat.elems.len() == 1 => match &pat.elems[0] {
            elem if is_rest(elem) => hole(root),
            elem => project(elem, root),
        },
        Pat::TupleStruct(pat) => positional(&pat.elems, root),
        Pat::Slice(pat) => positional(&pat.elems, root),
        _ => hole(root),
    }
}

fn positional(elems: &Punctuated<Pat, syn::Token![,]>, root: &syn::Path) -> Expr {
    let items = elems.iter().map(|elem| match elem {
        Pat::Wild(_) => hole(root),
        elem if is_rest(elem) => hole(root),
        other => project(other, root),
    });
    parse_quote! { #root::runtime::array([#(#items),*]) }
}

/// `..` or `name @ ..`.
fn is_rest(pat: &Pat) -> bool {
    match pat {
        Pat::Rest(_) => true,
        Pat::Ident(pat) => matches!(pat.subpat.as_ref(), Some((_, sub)) if matches!(**sub, Pat::Rest(_))),
        _ => false,
    }
}

fn capture(root: &syn::Path, ident: &Ident) -> Expr {
    parse_quote! { #root::runtime::capture(&#ident) }
}

fn hole(root: &syn::Path) -> Expr {
    parse_quote! { #root::runtime::hole() }
}

fn plain_binding(ident: Ident) -> Pat {
    Pat::Ident(PatIdent {
        attrs: Vec::new(),
        by_ref: None,
        mutability: None,
        ident,
        subpat: None,
    })
}

/// Copy of `pat` suitable for matching against a reference: binding modes,
/// `mut`, `&` patterns, and `@` subpatterns are dropped so every name binds by
/// reference. A named rest `name @ ..` becomes a bare `..`.
pub fn by_reference(pat: &Pat) -> Pat {
    match pat {
        Pat::Ident(ident) => match &ident.subpat {
            Some((_, sub)) if matches!(**sub, Pat::Rest(_)) => (**sub).clone(),
            _ => plain_binding(ident.ident.clone()),
        },
        Pat::Reference(pat) => by_reference(&pat.pat),
        Pat::Paren(pat) => by_reference(&pat.pat),
        Pat::Type(pat) => by_reference(&pat.pat),
        Pat::Struct(pat) => {
            let mut pat = pat.clone();
            for field in pat.fields.iter_mut() {
                *field.pat = by_reference(&field.pat);
            }
            Pat::Struct(pat)
        }
        Pat::Tuple(pat) => {
            let mut pat = pat.clone();
            rebind_elems(&mut pat.elems);
            Pat::Tuple(pat)
        }
        Pat::TupleStruct(pat) => {
            let mut pat = pat.clone();
            rebind_elems(&mut pat.elems);
            Pat::TupleStruct(pat)
        }
        Pat::Slice(pat) => {
            let mut pat = pat.clone();
            rebind_elems(&mut pat.elems);
            Pat::Slice(pat)
        }
        other => other.clone(),
    }
}

fn rebind_elems(elems: &mut Punctuated<Pat, syn::Token![,]>) {
    for elem in elems.iter_mut() {
        *elem = by_reference(elem);
    }
}

/// Fresh identifier with call-site hygiene.
pub fn internal_ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}
