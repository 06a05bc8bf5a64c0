//! Rewriting of eligible declarations into hook-calling wrappers.

use proc_macro2::TokenStream;
use quote::quote;
use serde::{Deserialize, Serialize};
use syn::{
    parse_quote, Block, Expr, ExprBlock, ExprClosure, FnArg, GenericParam, Item, ItemFn,
    ReturnType, Stmt, TypeBareFn, Visibility,
};

use crate::trace::CallShape;
use crate::transform::declaration::{
    strip_pat_type, BoundItem, Origin, ReturnKind, SourceDeclaration,
};
use crate::transform::error::TransformError;
use crate::transform::params::{internal_ident, ParamPlan};

/// Name of the inner definition holding the original body.
pub const INNER_FN: &str = "__bridgetape_inner";

/// Which hook the rewritten declaration calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Run the original body and record its behavior.
    #[default]
    Trace,
    /// Answer from recorded behavior without running the original body.
    Mock,
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Variant::Trace),
            "mock" => Ok(Variant::Mock),
            other => Err(format!("unknown variant: {other}")),
        }
    }
}

/// Settings shared by every rewrite in one file.
pub struct RewriteContext<'a> {
    pub variant: Variant,
    /// Path of the crate exposing `runtime`, e.g. `::bridgetape`.
    pub root: &'a syn::Path,
    /// Expression naming the source file in generated calls.
    pub source_path: &'a Expr,
}

/// Produce the wrapped replacement of an eligible declaration with a
/// non-empty body. The input is left untouched.
pub fn rewrite(decl: &SourceDeclaration<'_>, cx: &RewriteContext<'_>) -> Result<Item, TransformError> {
    let shape = decl.shape();
    if cx.variant == Variant::Mock && shape != CallShape::SyncFunction {
        return Err(TransformError::UnsupportedShape {
            name: decl.name(),
            shape,
        });
    }

    let plan = ParamPlan::new(&decl.params, cx.root);
    tracing::debug!(
        name = %decl.name(),
        shape = %shape,
        variant = ?cx.variant,
        "Rewriting declaration"
    );
    let item = match decl.origin {
        Origin::Function(item) => Item::Fn(rewrite_fn(decl, item, &plan, cx)),
        Origin::Closure {
            item,
            closure,
            signature,
        } => rewrite_bound(decl, item, closure, signature, &plan, cx),
    };
    Ok(item)
}

fn rewrite_fn(
    decl: &SourceDeclaration<'_>,
    item: &ItemFn,
    plan: &ParamPlan,
    cx: &RewriteContext<'_>,
) -> ItemFn {
    let mut sig = item.sig.clone();
    for (input, pat) in sig.inputs.iter_mut().zip(&plan.outer) {
        if let FnArg::Typed(typed) = input {
            *typed.pat = pat.clone();
        }
    }

    let mut stmts = Vec::new();
    if cx.variant == Variant::Trace {
        let mut inner = item.clone();
        inner.attrs.clear();
        inner.vis = Visibility::Inherited;
        inner.sig.ident = internal_ident(INNER_FN);
        stmts.push(Stmt::Item(Item::Fn(inner)));
    }

    let turbofish = turbofish(&item.sig.generics);
    let call = inner_call(plan, turbofish, item.sig.unsafety.is_some());
    stmts.push(Stmt::Expr(invocation(decl, plan, cx, call), None));

    ItemFn {
        attrs: item.attrs.clone(),
        vis: item.vis.clone(),
        sig,
        block: Box::new(Block {
            brace_token: item.block.brace_token,
            stmts,
        }),
    }
}

fn rewrite_bound(
    decl: &SourceDeclaration<'_>,
    item: BoundItem<'_>,
    closure: &ExprClosure,
    signature: &TypeBareFn,
    plan: &ParamPlan,
    cx: &RewriteContext<'_>,
) -> Item {
    let mut stmts = Vec::new();
    if cx.variant == Variant::Trace {
        let inputs = closure.inputs.iter().zip(&signature.inputs).map(|(pat, arg)| {
            let pat = strip_pat_type(pat);
            let ty = &arg.ty;
            quote! { #pat: #ty }
        });
        let generics = signature.lifetimes.as_ref().map(|bound| {
            let lifetimes = &bound.lifetimes;
            quote! { <#lifetimes> }
        });
        let asyncness = &closure.asyncness;
        let unsafety = &signature.unsafety;
        let output = &signature.output;
        let body = closure_body(&closure.body);
        let inner = internal_ident(INNER_FN);
        let inner: ItemFn = parse_quote! {
            #asyncness #unsafety fn #inner #generics (#(#inputs),*) #output #body
        };
        stmts.push(Stmt::Item(Item::Fn(inner)));
    }

    let call = inner_call(plan, None, signature.unsafety.is_some());
    stmts.push(Stmt::Expr(invocation(decl, plan, cx, call), None));

    let mut wrapped = closure.clone();
    wrapped.inputs = plan.outer.iter().cloned().collect();
    wrapped.output = ReturnType::Default;
    wrapped.body = Box::new(Expr::Block(ExprBlock {
        attrs: Vec::new(),
        label: None,
        block: Block {
            brace_token: Default::default(),
            stmts,
        },
    }));
    let wrapped = Expr::Closure(wrapped);

    match item {
        BoundItem::Const(item) => {
            let mut item = item.clone();
            *item.expr = wrapped;
            Item::Const(item)
        }
        BoundItem::Static(item) => {
            let mut item = item.clone();
            *item.expr = wrapped;
            Item::Static(item)
        }
    }
}

/// A closure body as a block; an expression body becomes the block's tail.
fn closure_body(body: &Expr) -> Block {
    match body {
        Expr::Block(block) if block.attrs.is_empty() && block.label.is_none() => {
            block.block.clone()
        }
        other => parse_quote! {{ #other }},
    }
}

/// Explicit type and const arguments for the inner call.
fn turbofish(generics: &syn::Generics) -> Option<TokenStream> {
    let args: Vec<TokenStream> = generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(ty) => {
                let ident = &ty.ident;
                Some(quote! { #ident })
            }
            GenericParam::Const(konst) => {
                let ident = &konst.ident;
                Some(quote! { #ident })
            }
            GenericParam::Lifetime(_) => None,
        })
        .collect();
    if args.is_empty() {
        None
    } else {
        Some(quote! { ::<#(#args),*> })
    }
}

fn inner_call(plan: &ParamPlan, turbofish: Option<TokenStream>, unsafe_call: bool) -> TokenStream {
    let inner = internal_ident(INNER_FN);
    let forward = &plan.forward;
    let call = quote! { #inner #turbofish (#(#forward),*) };
    if unsafe_call {
        quote! { unsafe { #call } }
    } else {
        call
    }
}

/// The tail expression calling the runtime hook.
fn invocation(
    decl: &SourceDeclaration<'_>,
    plan: &ParamPlan,
    cx: &RewriteContext<'_>,
    call: TokenStream,
) -> Expr {
    let root = cx.root;
    let name = decl.name();
    let path = cx.source_path;
    let args = plan.args_expr();
    let fallible = decl.return_kind == ReturnKind::Fallible;

    match (cx.variant, decl.shape()) {
        (Variant::Mock, _) if fallible => parse_quote! {
            ::core::result::Result::Ok(#root::runtime::mock_sync(#name, #path, #args))
        },
        (Variant::Mock, _) => parse_quote! {
            #root::runtime::mock_sync(#name, #path, #args)
        },
        (Variant::Trace, CallShape::SyncFunction) if fallible => parse_quote! {
            #root::runtime::trace_sync(#name, #path, #args, move || #call)
        },
        (Variant::Trace, CallShape::SyncFunction) => parse_quote! {
            #root::runtime::trace_sync(
                #name,
                #path,
                #args,
                move || #root::runtime::Returned(#call),
            ).0
        },
        (Variant::Trace, CallShape::AsyncFunction) if fallible => parse_quote! {
            #root::runtime::trace_async(#name, #path, #args, #call).await
        },
        (Variant::Trace, CallShape::AsyncFunction) => parse_quote! {
            #root::runtime::trace_async(
                #name,
                #path,
                #args,
                async move { #root::runtime::Returned(#call.await) },
            ).await.0
        },
        (Variant::Trace, CallShape::SyncGenerator) => parse_quote! {
            #root::runtime::trace_iter(#name, #path, #args, move || #call)
        },
        (Variant::Trace, CallShape::AsyncGenerator) => parse_quote! {
            #root::runtime::trace_stream(#name, #path, #args, move || #call)
        },
    }
}
