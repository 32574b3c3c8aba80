//! Attribute parsing for `#[hub_contract]` and its member helpers.

use proc_macro2::TokenStream;
use syn::Attribute;
use syn::Error;
use syn::Ident;
use syn::LitStr;
use syn::Result;
use syn::parse::Parser;

pub const METHOD_NAME: &str = "method_name";
pub const NOT_MAPPED: &str = "not_mapped";

/// Arguments of the `#[hub_contract(...)]` attribute itself.
#[derive(Default)]
pub struct ContractArgs {
    pub hub_name: Option<LitStr>,
    pub proxy: Option<Ident>,
}

impl ContractArgs {
    pub fn parse(attr: TokenStream) -> Result<Self> {
        let mut args = Self::default();
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("hub_name") {
                args.hub_name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("proxy") {
                args.proxy = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `hub_name = \"...\"` or `proxy = Name`"))
            }
        });
        parser.parse2(attr)?;
        Ok(args)
    }
}

/// Parses `#[method_name("...")]`, rejecting duplicates.
pub fn method_name(attrs: &[Attribute]) -> Result<Option<LitStr>> {
    let mut output = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident(METHOD_NAME)) {
        if output.is_some() {
            return Err(Error::new_spanned(attr, "duplicate #[method_name(...)] attribute"));
        }
        output = Some(attr.parse_args::<LitStr>()?);
    }
    Ok(output)
}

/// Whether `#[not_mapped]` is present. The marker takes no arguments.
pub fn not_mapped(attrs: &[Attribute]) -> Result<bool> {
    let mut found = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident(NOT_MAPPED)) {
        attr.meta.require_path_only()?;
        found = true;
    }
    Ok(found)
}

/// Removes the member helper attributes so the compiler never sees them.
pub fn strip_helpers(attrs: &mut Vec<Attribute>) {
    attrs.retain(|a| !a.path().is_ident(METHOD_NAME) && !a.path().is_ident(NOT_MAPPED));
}
