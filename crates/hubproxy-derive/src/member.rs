//! Syntactic model of one contract member.
//!
//! Mirrors the runtime classifier: the shape computed here decides which
//! bound member the generated proxy claims. Any member the runtime would
//! reject gets no field, and its body is never reachable.

use proc_macro2::TokenStream;
use proc_macro2::TokenTree;
use quote::ToTokens;
use quote::format_ident;
use quote::quote;
use syn::Error;
use syn::FnArg;
use syn::GenericArgument;
use syn::Ident;
use syn::LitStr;
use syn::Pat;
use syn::PatIdent;
use syn::PathArguments;
use syn::Result;
use syn::ReturnType;
use syn::TraitItemFn;
use syn::Type;
use syn::TypeParamBound;
use syn::ext::IdentExt;

use crate::attr;

/// Largest handler arity with an `IntoEventHandler` implementation.
const MAX_HANDLER_ARITY: usize = 7;

/// Method names the generated proxy already carries, either inherently or
/// through `HubClient`.
const RESERVED: &[&str] = &["hub_table", "invoke", "invoke_typed", "subscribe"];

/// Declared return type, by its last path segment.
pub enum Returns {
    Unit,
    Completion,
    Pending(Type),
    Subscription,
    Observable(Type),
    Named(Type),
}

pub enum ParamKind {
    Value,
    /// `impl Fn(..)` with the listed argument types.
    Handler(Vec<Type>),
}

pub struct Param {
    pub ident: Ident,
    pub ty: Type,
    pub kind: ParamKind,
}

/// Which bound member serves a member, if any.
pub enum Shape {
    Call,
    TypedCall,
    Event(Vec<Type>),
    Stream,
}

pub struct Member {
    pub ident: Ident,
    pub name: String,
    pub method_name: Option<LitStr>,
    pub not_mapped: bool,
    pub params: Vec<Param>,
    pub returns: Returns,
    pub shape: Option<Shape>,
}

impl Member {
    /// Reads a trait method and strips its helper attributes.
    pub fn parse(item: &mut TraitItemFn) -> Result<Self> {
        let method_name = attr::method_name(&item.attrs)?;
        let not_mapped = attr::not_mapped(&item.attrs)?;
        attr::strip_helpers(&mut item.attrs);

        let sig = &item.sig;
        let name = sig.ident.unraw().to_string();
        if RESERVED.contains(&name.as_str()) {
            return Err(Error::new_spanned(
                &sig.ident,
                format!("`{}` is reserved on generated proxies; rename the member and use #[method_name]", name),
            ));
        }
        if not_mapped {
            if item.default.is_none() {
                return Err(Error::new_spanned(sig, "#[not_mapped] members need a default body"));
            }
        } else {
            if let Some(asyncness) = &sig.asyncness {
                return Err(Error::new_spanned(asyncness, "hub members return `Completion` or `Pending<T>` instead of being async"));
            }
            if !sig.generics.params.is_empty() {
                return Err(Error::new_spanned(&sig.generics, "hub members cannot be generic"));
            }
            match sig.receiver() {
                Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
                _ => return Err(Error::new_spanned(sig, "hub members take `&self`")),
            }
        }

        let mut params = Vec::new();
        let typed = sig.inputs.iter().filter_map(|arg| match arg {
            FnArg::Typed(arg) => Some(arg),
            FnArg::Receiver(_) => None,
        });
        for (i, arg) in typed.enumerate() {
            let ident = match arg.pat.as_ref() {
                Pat::Ident(PatIdent { ident, .. }) => ident.clone(),
                _ => format_ident!("__arg{}", i),
            };
            let ty = (*arg.ty).clone();
            let kind = match handler_args(&ty) {
                Some(args) => {
                    if !not_mapped {
                        check_handler(&ty, &args)?;
                    }
                    ParamKind::Handler(args)
                }
                None => ParamKind::Value,
            };
            params.push(Param { ident, ty, kind });
        }

        let returns = match &sig.output {
            ReturnType::Default => Returns::Unit,
            ReturnType::Type(_, ty) => returns(ty),
        };

        let mut member = Self {
            ident: sig.ident.clone(),
            name,
            method_name,
            not_mapped,
            params,
            returns,
            shape: None,
        };
        if !not_mapped {
            member.shape = member.shape();
        }
        Ok(member)
    }

    /// A parameterless stream member is a property; everything else is a method.
    pub fn is_property(&self) -> bool {
        self.params.is_empty() && matches!(self.returns, Returns::Observable(_))
    }

    fn shape(&self) -> Option<Shape> {
        match &self.returns {
            Returns::Completion => Some(Shape::Call),
            Returns::Pending(_) => Some(Shape::TypedCall),
            Returns::Subscription => match self.params.as_slice() {
                [Param { kind: ParamKind::Handler(args), .. }] if args.len() <= MAX_HANDLER_ARITY => {
                    Some(Shape::Event(args.clone()))
                }
                _ => None,
            },
            Returns::Observable(_) if self.is_property() => Some(Shape::Stream),
            _ => None,
        }
    }

    /// Descriptor builder expression for this member.
    pub fn descriptor(&self) -> TokenStream {
        let name = &self.name;
        let value = self.returns.descriptor();

        let mut expr = if self.is_property() {
            quote!(::hubproxy::contract::MemberDescriptor::property(#name, #value, false))
        } else {
            quote!(::hubproxy::contract::MemberDescriptor::method(#name, #value))
        };

        for param in &self.params {
            let param_name = param.ident.unraw().to_string();
            let ty = match &param.kind {
                ParamKind::Handler(args) => {
                    let arity = args.len();
                    quote!(::hubproxy::contract::TypeDescriptor::Handler { arity: #arity })
                }
                ParamKind::Value => {
                    let ty = type_name(&param.ty);
                    quote!(::hubproxy::contract::TypeDescriptor::Named(#ty.into()))
                }
            };
            expr = quote!(#expr.param(#param_name, #ty));
        }
        if let Some(wire) = &self.method_name {
            expr = quote!(#expr.method_name(#wire));
        }
        if self.not_mapped {
            expr = quote!(#expr.not_mapped());
        }
        expr
    }
}

impl Returns {
    fn descriptor(&self) -> TokenStream {
        match self {
            Self::Unit => quote!(::hubproxy::contract::TypeDescriptor::Unit),
            Self::Completion => quote!(::hubproxy::contract::TypeDescriptor::Completion),
            Self::Subscription => quote!(::hubproxy::contract::TypeDescriptor::Subscription),
            Self::Pending(ty) => {
                let ty = type_name(ty);
                quote!(::hubproxy::contract::TypeDescriptor::Pending(#ty.into()))
            }
            Self::Observable(ty) => {
                let ty = type_name(ty);
                quote!(::hubproxy::contract::TypeDescriptor::Observable(#ty.into()))
            }
            Self::Named(ty) => {
                let ty = type_name(ty);
                quote!(::hubproxy::contract::TypeDescriptor::Named(#ty.into()))
            }
        }
    }
}

fn unroll(mut ty: &Type) -> &Type {
    loop {
        ty = match ty {
            Type::Group(ty) => ty.elem.as_ref(),
            Type::Paren(ty) => ty.elem.as_ref(),
            _ => return ty,
        }
    }
}

fn returns(ty: &Type) -> Returns {
    let ty = unroll(ty);
    match ty {
        Type::Tuple(tuple) if tuple.elems.is_empty() => return Returns::Unit,
        Type::Path(path) if path.qself.is_none() => {
            if let Some(segment) = path.path.segments.last() {
                let single = single_type_arg(&segment.arguments);
                match (segment.ident.to_string().as_str(), single) {
                    ("Completion", None) if segment.arguments.is_empty() => return Returns::Completion,
                    ("Subscription", None) if segment.arguments.is_empty() => return Returns::Subscription,
                    ("Pending", Some(inner)) => return Returns::Pending(inner.clone()),
                    ("Observable", Some(inner)) => return Returns::Observable(inner.clone()),
                    _ => {}
                }
            }
        }
        _ => {}
    }
    Returns::Named(ty.clone())
}

fn single_type_arg(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    let mut args = args.args.iter();
    match (args.next(), args.next()) {
        (Some(GenericArgument::Type(ty)), None) => Some(ty),
        _ => None,
    }
}

/// Argument types of an `impl Fn(..)` parameter.
fn handler_args(ty: &Type) -> Option<Vec<Type>> {
    let Type::ImplTrait(bounds) = unroll(ty) else {
        return None;
    };
    bounds.bounds.iter().find_map(|bound| {
        let TypeParamBound::Trait(bound) = bound else {
            return None;
        };
        let segment = bound.path.segments.last()?;
        if segment.ident != "Fn" {
            return None;
        }
        match &segment.arguments {
            PathArguments::Parenthesized(args) => Some(args.inputs.iter().cloned().collect()),
            _ => None,
        }
    })
}

/// Rejects handlers the generated `IntoEventHandler` call could not accept:
/// missing `Send + Sync + 'static`, or borrowed arguments.
fn check_handler(ty: &Type, args: &[Type]) -> Result<()> {
    let Type::ImplTrait(handler) = unroll(ty) else {
        return Ok(());
    };
    let has_trait = |name: &str| {
        handler.bounds.iter().any(|bound| match bound {
            TypeParamBound::Trait(bound) => bound.path.segments.last().is_some_and(|s| s.ident == name),
            _ => false,
        })
    };
    let is_static = handler.bounds.iter().any(|bound| match bound {
        TypeParamBound::Lifetime(lifetime) => lifetime.ident == "static",
        _ => false,
    });
    if !(has_trait("Send") && has_trait("Sync") && is_static) {
        return Err(Error::new_spanned(ty, "event handlers must be `impl Fn(..) + Send + Sync + 'static`"));
    }

    for arg in args {
        if borrows(arg) {
            return Err(Error::new_spanned(
                arg,
                "event handler arguments are decoded into owned values; borrowed types are not supported",
            ));
        }
    }
    Ok(())
}

/// Whether a type mentions a reference or a lifetime anywhere.
fn borrows(ty: &Type) -> bool {
    fn walk(tokens: TokenStream) -> bool {
        tokens.into_iter().any(|tt| match tt {
            TokenTree::Punct(p) => p.as_char() == '&' || p.as_char() == '\'',
            TokenTree::Group(g) => walk(g.stream()),
            _ => false,
        })
    }
    walk(ty.to_token_stream())
}

/// Source form of a type with token spacing tightened.
pub fn type_name(ty: &Type) -> String {
    ty.to_token_stream()
        .to_string()
        .replace(" :: ", "::")
        .replace(":: ", "::")
        .replace(" < ", "<")
        .replace("< ", "<")
        .replace(" >", ">")
        .replace(" ,", ",")
        .replace("& ", "&")
        .replace("( ", "(")
        .replace(" )", ")")
}
