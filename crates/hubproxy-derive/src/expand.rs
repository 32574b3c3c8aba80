//! Expansion of `#[hub_contract]`.

use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;
use syn::Error;
use syn::FnArg;
use syn::Ident;
use syn::Item;
use syn::ItemTrait;
use syn::Pat;
use syn::PatIdent;
use syn::Result;
use syn::TraitItem;
use syn::ext::IdentExt;
use syn::parse2;

use crate::attr::ContractArgs;
use crate::member::Member;
use crate::member::ParamKind;
use crate::member::Shape;

pub fn hub_contract(attr: TokenStream, input: TokenStream) -> Result<TokenStream> {
    let args = ContractArgs::parse(attr)?;
    match parse2::<Item>(input)? {
        Item::Trait(item) => contract_trait(args, item),
        Item::Struct(item) => concrete(args, &item.ident, &item.generics, quote!(#item)),
        Item::Enum(item) => concrete(args, &item.ident, &item.generics, quote!(#item)),
        item => Err(Error::new_spanned(item, "#[hub_contract] applies to traits")),
    }
}

fn hub_name_call(args: &ContractArgs) -> TokenStream {
    match &args.hub_name {
        Some(name) => quote!(.hub_name(#name)),
        None => TokenStream::new(),
    }
}

/// A struct or enum: a descriptor the assembler will refuse.
fn concrete(args: ContractArgs, ident: &Ident, generics: &syn::Generics, item: TokenStream) -> Result<TokenStream> {
    if !generics.params.is_empty() {
        return Err(Error::new_spanned(generics, "generic hub contracts are not supported"));
    }
    let name = ident.unraw().to_string();
    let hub_name = hub_name_call(&args);

    Ok(quote! {
        #item

        impl<__T: ::hubproxy::Transport> ::hubproxy::Contract<__T> for #ident {
            fn descriptor() -> ::hubproxy::contract::ContractDescriptor {
                ::hubproxy::contract::ContractDescriptor::concrete(#name) #hub_name
            }

            fn from_hub(hub: ::hubproxy::HubProxy<__T>) -> ::hubproxy::Result<Self> {
                ::std::result::Result::Err(::hubproxy::Error::InvalidContractKind {
                    contract: ::std::string::ToString::to_string(hub.contract()),
                })
            }
        }
    })
}

fn contract_trait(args: ContractArgs, mut item: ItemTrait) -> Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(&item.generics, "generic hub contracts are not supported"));
    }

    let mut members = Vec::new();
    for trait_item in item.items.iter_mut() {
        match trait_item {
            TraitItem::Fn(method) => members.push(Member::parse(method)?),
            other => return Err(Error::new_spanned(other, "hub contracts declare methods only")),
        }
    }

    let trait_ident = &item.ident;
    let trait_name = trait_ident.unraw().to_string();
    let vis = &item.vis;
    let proxy = args
        .proxy
        .clone()
        .unwrap_or_else(|| format_ident!("{}Proxy", trait_ident.unraw()));
    let hub_name = hub_name_call(&args);

    let descriptors = members.iter().map(Member::descriptor);

    let bound: Vec<&Member> = members.iter().filter(|m| m.shape.is_some()).collect();
    let fields = bound.iter().map(|m| {
        let ident = &m.ident;
        let ty = match m.shape {
            Some(Shape::Call) => quote!(::hubproxy::bind::BoundCall<__T>),
            Some(Shape::TypedCall) => quote!(::hubproxy::bind::BoundTypedCall<__T>),
            Some(Shape::Event(_)) => quote!(::hubproxy::bind::BoundEvent<__T>),
            _ => quote!(::hubproxy::bind::BoundStream),
        };
        quote!(#ident: #ty)
    });
    let takes = bound.iter().map(|m| {
        let ident = &m.ident;
        let name = &m.name;
        let take = match m.shape {
            Some(Shape::Call) => quote!(take_call),
            Some(Shape::TypedCall) => quote!(take_typed_call),
            Some(Shape::Event(_)) => quote!(take_event),
            _ => quote!(take_stream),
        };
        quote!(let #ident = __table.#take(#name)?;)
    });
    let field_idents = bound.iter().map(|m| &m.ident);

    let methods = item
        .items
        .iter()
        .zip(&members)
        .filter(|(_, m)| !m.not_mapped)
        .map(|(trait_item, member)| match trait_item {
            TraitItem::Fn(method) => proxy_method(&trait_name, method, member),
            _ => TokenStream::new(),
        })
        .collect::<Vec<_>>();

    let proxy_doc = format!("Typed `{}` proxy over a hub transport.", trait_name);

    Ok(quote! {
        #item

        #[doc = #proxy_doc]
        #vis struct #proxy<__T: ::hubproxy::Transport> {
            __hub: ::hubproxy::HubProxy<__T>,
            #(#fields,)*
        }

        impl<__T: ::hubproxy::Transport> #proxy<__T> {
            /// Builds the proxy with the transport's default limits.
            pub fn new(transport: ::hubproxy::__private::Arc<__T>) -> ::hubproxy::Result<Self> {
                ::hubproxy::ProxyBuilder::new(transport).build()
            }

            /// The assembled member table.
            pub fn hub_table(&self) -> &::hubproxy::HubProxy<__T> {
                &self.__hub
            }
        }

        impl<__T: ::hubproxy::Transport> ::hubproxy::Contract<__T> for #proxy<__T> {
            fn descriptor() -> ::hubproxy::contract::ContractDescriptor {
                ::hubproxy::contract::ContractDescriptor::interface(#trait_name)
                    #hub_name
                    .with_base_members()
                    #(.member(#descriptors))*
            }

            #[allow(unused_mut)]
            fn from_hub(mut __table: ::hubproxy::HubProxy<__T>) -> ::hubproxy::Result<Self> {
                __table.expect_contract(&<Self as ::hubproxy::Contract<__T>>::descriptor())?;
                #(#takes)*
                ::std::result::Result::Ok(Self {
                    __hub: __table.finish()?,
                    #(#field_idents,)*
                })
            }
        }

        impl<__T: ::hubproxy::Transport> #trait_ident for #proxy<__T> {
            #(#methods)*
        }

        #[allow(deprecated)]
        impl<__T: ::hubproxy::Transport> ::hubproxy::HubClient for #proxy<__T> {
            fn invoke(
                &self,
                method: &str,
                args: ::std::vec::Vec<::hubproxy::__private::Value>,
            ) -> ::hubproxy::Completion {
                ::hubproxy::HubClient::invoke(&self.__hub, method, args)
            }

            fn invoke_typed<R>(
                &self,
                method: &str,
                args: ::std::vec::Vec<::hubproxy::__private::Value>,
            ) -> ::hubproxy::Pending<R>
            where
                R: ::hubproxy::__private::DeserializeOwned + ::std::marker::Send + 'static,
            {
                ::hubproxy::HubClient::invoke_typed(&self.__hub, method, args)
            }

            fn subscribe(&self, event: &str, handler: ::hubproxy::EventHandler) -> ::hubproxy::Subscription {
                ::hubproxy::HubClient::subscribe(&self.__hub, event, handler)
            }
        }

        impl<__T: ::hubproxy::Transport> ::std::fmt::Debug for #proxy<__T> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(&self.__hub, f)
            }
        }
    })
}

/// The trait method implementation on the proxy.
fn proxy_method(trait_name: &str, method: &syn::TraitItemFn, member: &Member) -> TokenStream {
    let mut sig = method.sig.clone();
    let mut params = member.params.iter();
    for input in sig.inputs.iter_mut() {
        if let FnArg::Typed(arg) = input {
            if let Some(param) = params.next() {
                arg.pat = Box::new(Pat::Ident(PatIdent {
                    attrs: Vec::new(),
                    by_ref: None,
                    mutability: None,
                    ident: param.ident.clone(),
                    subpat: None,
                }));
                arg.attrs.clear();
            }
        }
    }

    let field = &member.ident;
    let args = member.params.iter().map(|p| {
        let ident = &p.ident;
        quote! {
            match ::hubproxy::transport::encode_arg(&#ident) {
                ::std::result::Result::Ok(value) => value,
                ::std::result::Result::Err(err) => return ::hubproxy::transport::rejected(err),
            }
        }
    });

    let body = match &member.shape {
        Some(Shape::Call) | Some(Shape::TypedCall) => quote! {
            let args = ::std::vec![#(#args),*];
            self.#field.invoke(args)
        },
        Some(Shape::Event(types)) => {
            let handler = member
                .params
                .iter()
                .find(|p| matches!(p.kind, ParamKind::Handler(_)))
                .map(|p| &p.ident);
            quote! {
                self.#field.subscribe(
                    ::hubproxy::IntoEventHandler::<(#(#types,)*)>::into_event_handler(#handler)
                )
            }
        }
        Some(Shape::Stream) => quote! {
            self.#field.observable()
        },
        None => {
            let name = &member.name;
            quote! {
                ::hubproxy::proxy::unbound(#trait_name, #name)
            }
        }
    };

    quote! {
        #[allow(unused_variables)]
        #sig {
            #body
        }
    }
}
