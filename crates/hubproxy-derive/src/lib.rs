//! Attribute macro for hubproxy contracts.
//!
//! `#[hub_contract]` on a trait emits the trait unchanged (minus helper
//! attributes), a `ContractDescriptor` for it, and a `{Trait}Proxy<T>` struct
//! that implements the trait over any `hubproxy::Transport`.
//!
//! `#[hub_contract]` on a struct or enum emits a concrete descriptor. Building
//! a proxy for it always fails with `InvalidContractKind`.
//!
//! Helper attributes on trait members:
//! - `#[method_name("Wire")]` overrides the wire name.
//! - `#[not_mapped]` leaves a default-bodied member unbound.

use proc_macro::TokenStream;

mod attr;
mod expand;
mod member;

/// Generates a typed hub proxy for a trait.
///
/// # Example
///
/// ```text
/// #[hub_contract(hub_name = "chat")]
/// pub trait IChatHub {
///     fn send(&self, user: String, text: String) -> Completion;
///     #[method_name("GetHistory")]
///     fn history(&self) -> Pending<Vec<String>>;
///     fn on_message(&self, handler: impl Fn(String, String) + Send + Sync + 'static) -> Subscription;
///     fn typing(&self) -> Observable<bool>;
/// }
/// ```
///
/// Arguments:
/// - `hub_name = "..."` overrides the hub name derived from the trait name.
/// - `proxy = Name` names the generated struct (default `{Trait}Proxy`).
///
/// Event handlers are declared as `impl Fn(..) + Send + Sync + 'static` with
/// at most seven owned parameters, each deserializable from the event payload.
///
/// Members may not be named `hub_table`, `invoke`, `invoke_typed` or
/// `subscribe`; the generated proxy already has methods by those names. Use
/// `#[method_name("...")]` to reach such a wire name.
#[proc_macro_attribute]
pub fn hub_contract(attr: TokenStream, input: TokenStream) -> TokenStream {
    expand::hub_contract(attr.into(), input.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
