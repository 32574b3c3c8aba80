//! # Member Scanner
//!
//! Walks a contract's members in declaration order and yields the ones the
//! proxy has to bind.
//!
//! Skipped:
//! - members inherited from the base [`HubClient`](crate::proxy::HubClient)
//! - members carrying the `not_mapped` marker
//! - properties whose value is not an `Observable<T>`
//! - accessors of a property declared in the same contract

use std::collections::HashSet;

use crate::contract::ContractDescriptor;
use crate::contract::MemberDescriptor;
use crate::contract::MemberKind;
use crate::contract::Origin;
use crate::contract::TypeDescriptor;

/// Lazy, single-pass iterator over the members to bind.
pub struct Scan<'a> {
    members: std::slice::Iter<'a, MemberDescriptor>,
    properties: HashSet<&'a str>,
}

/// Starts scanning `contract`.
pub fn scan(contract: &ContractDescriptor) -> Scan<'_> {
    let properties = contract
        .members
        .iter()
        .filter(|m| matches!(m.kind, MemberKind::Property { .. }))
        .map(|m| m.name.as_str())
        .collect();

    Scan {
        members: contract.members.iter(),
        properties,
    }
}

impl<'a> Scan<'a> {
    fn keep(&self, member: &MemberDescriptor) -> bool {
        if member.origin == Origin::Base || member.not_mapped {
            return false;
        }
        match &member.kind {
            MemberKind::Method => true,
            MemberKind::Property { .. } => matches!(member.value_type, TypeDescriptor::Observable(_)),
            MemberKind::Accessor { property } => !self.properties.contains(property.as_str()),
        }
    }
}

impl<'a> Iterator for Scan<'a> {
    type Item = &'a MemberDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let member = self.members.next()?;
            if self.keep(member) {
                return Some(member);
            }
            tracing::trace!(member = %member.name, "scanner skipped member");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<'a>(scan: Scan<'a>) -> Vec<&'a str> {
        scan.map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_scan_preserves_declaration_order() {
        let contract = ContractDescriptor::interface("IOrder")
            .member(MemberDescriptor::method("c", TypeDescriptor::Completion))
            .member(MemberDescriptor::method("a", TypeDescriptor::Completion))
            .member(MemberDescriptor::method("b", TypeDescriptor::Completion));

        assert_eq!(names(scan(&contract)), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_scan_drops_base_members() {
        let contract = ContractDescriptor::interface("IChat")
            .with_base_members()
            .member(MemberDescriptor::method("send", TypeDescriptor::Completion).params(1));

        assert_eq!(names(scan(&contract)), vec!["send"]);
    }

    #[test]
    fn test_scan_drops_not_mapped() {
        let contract = ContractDescriptor::interface("IChat")
            .member(MemberDescriptor::method("send", TypeDescriptor::Completion))
            .member(MemberDescriptor::method("local_only", TypeDescriptor::Unit).not_mapped());

        assert_eq!(names(scan(&contract)), vec!["send"]);
    }

    #[test]
    fn test_scan_keeps_only_observable_properties() {
        let contract = ContractDescriptor::interface("IFeed")
            .member(MemberDescriptor::property("prices", TypeDescriptor::Observable("f64".into()), false))
            .member(MemberDescriptor::accessor("get_prices", "prices", TypeDescriptor::Observable("f64".into())))
            .member(MemberDescriptor::property("title", TypeDescriptor::Named("String".into()), true))
            .member(MemberDescriptor::accessor("get_title", "title", TypeDescriptor::Named("String".into())))
            .member(MemberDescriptor::accessor("set_title", "title", TypeDescriptor::Unit).params(1));

        assert_eq!(names(scan(&contract)), vec!["prices"]);
    }

    #[test]
    fn test_scan_passes_orphan_accessors_through() {
        let contract = ContractDescriptor::interface("IFeed")
            .member(MemberDescriptor::accessor("get_ghost", "ghost", TypeDescriptor::Named("u8".into())));

        assert_eq!(names(scan(&contract)), vec!["get_ghost"]);
    }
}
