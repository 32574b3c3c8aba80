//! # Hub Proxy
//!
//! The assembled member table of one contract over one transport, and the
//! traits a typed proxy is built from.
//!
//! A typed proxy (usually generated by `#[hub_contract]`) implements
//! [`Contract`]: it names its descriptor and, given the assembled
//! [`HubProxy`], claims every bound member out of the table. Claiming is
//! checked both ways: a member the proxy expects but the table lacks is
//! `MissingMember`, a member left in the table is `UnclaimedMember`.
//! Before claiming, the proxy checks the table was assembled from its own
//! descriptor (`ContractMismatch` otherwise).

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::bind::BoundCall;
use crate::bind::BoundEvent;
use crate::bind::BoundMember;
use crate::bind::BoundStream;
use crate::bind::BoundTypedCall;
use crate::bind::MemberBinding;
use crate::classify::Shape;
use crate::contract::ContractDescriptor;
use crate::error::Error;
use crate::error::Result;
use crate::event::EventHandler;
use crate::event::Subscription;
use crate::transport::Completion;
use crate::transport::Pending;
use crate::transport::Transport;

/// A contract a proxy can be generated for.
pub trait Contract<T: Transport>: Sized {
    /// The reflective metadata of the contract.
    fn descriptor() -> ContractDescriptor;

    /// Claims the bound members out of an assembled table.
    fn from_hub(hub: HubProxy<T>) -> Result<Self>;
}

/// The untyped surface every proxy carries.
///
/// Members of this trait are never bound from a contract; they go straight to
/// the transport by name.
pub trait HubClient {
    /// Invokes a hub method by name.
    #[deprecated(note = "declare the hub method on the contract instead")]
    fn invoke(&self, method: &str, args: Vec<Value>) -> Completion;

    /// Invokes a hub method by name and decodes its result.
    #[deprecated(note = "declare the hub method on the contract instead")]
    fn invoke_typed<R>(&self, method: &str, args: Vec<Value>) -> Pending<R>
    where
        R: DeserializeOwned + Send + 'static;

    /// Subscribes an untyped handler to a hub event by name.
    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription;
}

/// Description of one bound member, kept after the member is claimed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub wire_name: String,
    pub shape: Shape,
    pub arity: usize,
}

/// Assembled member table for one contract over one transport.
pub struct HubProxy<T: Transport> {
    descriptor: ContractDescriptor,
    hub_name: String,
    transport: Arc<T>,
    members: Vec<BoundMember<T>>,
    manifest: Vec<MemberInfo>,
}

impl<T: Transport> HubProxy<T> {
    pub(crate) fn new(
        descriptor: ContractDescriptor,
        hub_name: String,
        transport: Arc<T>,
        members: Vec<BoundMember<T>>,
    ) -> Self {
        let manifest = members
            .iter()
            .map(|m| MemberInfo {
                name: m.name.clone(),
                wire_name: m.wire_name.clone(),
                shape: m.shape.clone(),
                arity: m.arity,
            })
            .collect();

        Self {
            descriptor,
            hub_name,
            transport,
            members,
            manifest,
        }
    }

    /// Declared name of the contract.
    pub fn contract(&self) -> &str {
        &self.descriptor.name
    }

    /// The descriptor this table was assembled from.
    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    /// Fails unless this table was assembled from `expected`. Typed proxies
    /// call this before claiming any member.
    pub fn expect_contract(&self, expected: &ContractDescriptor) -> Result<()> {
        if self.descriptor != *expected {
            return Err(Error::ContractMismatch {
                expected: expected.name.clone(),
                found: self.descriptor.name.clone(),
            });
        }
        Ok(())
    }

    /// Hub name a connection should address for this contract.
    pub fn hub_name(&self) -> &str {
        &self.hub_name
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Every bound member in declaration order, claimed or not.
    pub fn manifest(&self) -> &[MemberInfo] {
        &self.manifest
    }

    /// Looks up a member's description by declared name.
    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.manifest.iter().find(|m| m.name == name)
    }

    /// Bound members not yet claimed.
    pub fn unclaimed(&self) -> impl Iterator<Item = &BoundMember<T>> {
        self.members.iter()
    }

    fn take(&mut self, member: &str, expected: &'static str) -> Result<MemberBinding<T>> {
        let index = self
            .members
            .iter()
            .position(|m| m.name == member)
            .ok_or_else(|| Error::MissingMember { member: member.to_string(), expected })?;
        Ok(self.members.remove(index).binding)
    }

    fn mismatch<B>(member: &str, expected: &'static str) -> Result<B> {
        Err(Error::MissingMember { member: member.to_string(), expected })
    }

    /// Claims the fire-and-forget call declared as `member`.
    pub fn take_call(&mut self, member: &str) -> Result<BoundCall<T>> {
        match self.take(member, "call")? {
            MemberBinding::Call(call) => Ok(call),
            _ => Self::mismatch(member, "call"),
        }
    }

    /// Claims the typed call declared as `member`.
    pub fn take_typed_call(&mut self, member: &str) -> Result<BoundTypedCall<T>> {
        match self.take(member, "typed call")? {
            MemberBinding::TypedCall(call) => Ok(call),
            _ => Self::mismatch(member, "typed call"),
        }
    }

    /// Claims the event declared as `member`.
    pub fn take_event(&mut self, member: &str) -> Result<BoundEvent<T>> {
        match self.take(member, "event")? {
            MemberBinding::Event(event) => Ok(event),
            _ => Self::mismatch(member, "event"),
        }
    }

    /// Claims the stream property declared as `member`.
    pub fn take_stream(&mut self, member: &str) -> Result<BoundStream> {
        match self.take(member, "stream")? {
            MemberBinding::Stream(stream) => Ok(stream),
            _ => Self::mismatch(member, "stream"),
        }
    }

    /// Verifies that every bound member has been claimed.
    pub fn finish(self) -> Result<Self> {
        if !self.members.is_empty() {
            return Err(Error::UnclaimedMember {
                members: self.members.iter().map(|m| m.name.clone()).collect(),
            });
        }
        Ok(self)
    }
}

impl<T: Transport> HubClient for HubProxy<T> {
    fn invoke(&self, method: &str, args: Vec<Value>) -> Completion {
        let transport = self.transport.clone();
        let method = method.to_string();
        Box::pin(async move { transport.call(&method, args).await })
    }

    fn invoke_typed<R>(&self, method: &str, args: Vec<Value>) -> Pending<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let transport = self.transport.clone();
        let method = method.to_string();
        Box::pin(async move { transport.call_typed::<R>(&method, args).await })
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        self.transport.subscribe(event, handler)
    }
}

impl<T: Transport> fmt::Debug for HubProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubProxy")
            .field("contract", &self.descriptor.name)
            .field("hub_name", &self.hub_name)
            .field("members", &self.manifest)
            .finish()
    }
}

/// Body of a contract member that can never be reached: proxy construction
/// rejects the member before a proxy exists.
#[doc(hidden)]
pub fn unbound(contract: &str, member: &str) -> ! {
    unreachable!("member '{}' of '{}' was rejected at construction time", member, contract)
}
