//! # Name Resolution
//!
//! Pure functions from declared names and overrides to wire names.

use crate::contract::ContractDescriptor;
use crate::contract::MemberDescriptor;

/// Resolves the hub name a connection addresses for a contract.
///
/// An override wins. Otherwise a leading `I` is stripped when it is followed
/// by another uppercase letter (`IChatHub` → `ChatHub`); any other name is
/// used verbatim (`Inbox` stays `Inbox`).
pub fn hub_name(declared: &str, hub_override: Option<&str>) -> String {
    if let Some(name) = hub_override {
        return name.to_string();
    }
    let mut chars = declared.chars();
    match (chars.next(), chars.next()) {
        (Some('I'), Some(second)) if second.is_uppercase() => declared[1..].to_string(),
        _ => declared.to_string(),
    }
}

/// Resolves the hub name of a whole contract.
pub fn contract_hub_name(contract: &ContractDescriptor) -> String {
    hub_name(&contract.name, contract.hub_name.as_deref())
}

/// Resolves the wire name of one member: its override, or its declared name
/// unchanged.
pub fn wire_name(member: &MemberDescriptor) -> &str {
    member.method_name.as_deref().unwrap_or(&member.name)
}
