//! # Proxy Assembler
//!
//! Runs scanner, classifier, name resolver and binder over a contract and
//! collects the bound members into a [`HubProxy`].
//!
//! ## Invariants
//!
//! - Fail-fast: the first error aborts the build and nothing is returned.
//! - Every check runs before the first member is bound, so a rejected contract
//!   never touches the transport.
//! - Duplicate wire names are reported on the later declaration.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::bind::Binder;
use crate::bind::Limits;
use crate::bind::effective_arity;
use crate::classify::Shape;
use crate::classify::classify;
use crate::contract::ContractDescriptor;
use crate::contract::ContractKind;
use crate::contract::MemberDescriptor;
use crate::error::Error;
use crate::error::Result;
use crate::naming;
use crate::proxy::HubProxy;
use crate::scan::scan;
use crate::transport::Transport;

/// A member that passed every check and is ready to bind.
struct Planned<'a> {
    member: &'a MemberDescriptor,
    wire_name: &'a str,
    shape: Shape,
}

/// Validates `contract` and binds its members to `transport`.
///
/// `hub_override` replaces the contract's own hub name when present.
pub fn assemble<T: Transport>(
    contract: &ContractDescriptor,
    transport: Arc<T>,
    limits: &Limits,
    hub_override: Option<&str>,
) -> Result<HubProxy<T>> {
    let plan = plan(contract, limits)?;

    let members = plan
        .into_iter()
        .map(|p| Binder::bind(p.member, p.wire_name, p.shape, &transport, limits))
        .collect::<Result<Vec<_>>>()?;

    let hub_name = match hub_override {
        Some(name) => name.to_string(),
        None => naming::contract_hub_name(contract),
    };

    tracing::debug!(
        contract = %contract.name,
        hub = %hub_name,
        members = members.len(),
        "assembled hub proxy"
    );

    Ok(HubProxy::new(contract.clone(), hub_name, transport, members))
}

fn plan<'a>(contract: &'a ContractDescriptor, limits: &Limits) -> Result<Vec<Planned<'a>>> {
    if contract.kind != ContractKind::Interface {
        return Err(Error::InvalidContractKind { contract: contract.name.clone() });
    }

    let mut plan = Vec::new();
    let mut wire_names: HashMap<&str, &str> = HashMap::new();

    for member in scan(contract) {
        let Some(shape) = classify(member)? else {
            tracing::trace!(member = %member.name, "skipped accessor");
            continue;
        };

        limits.check(&member.name, &shape, effective_arity(member, &shape))?;

        let wire_name = naming::wire_name(member);
        match wire_names.entry(wire_name) {
            Entry::Occupied(first) => {
                return Err(Error::DuplicateWireName {
                    member: member.name.clone(),
                    wire_name: wire_name.to_string(),
                    first: first.get().to_string(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(&member.name);
            }
        }

        plan.push(Planned { member, wire_name, shape });
    }

    Ok(plan)
}
