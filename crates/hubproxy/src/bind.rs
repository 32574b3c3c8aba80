//! # Member Binder
//!
//! Turns a classified, named member into a handle that drives the transport.
//!
//! ## Architecture
//!
//! - **Binder**: Checks arity against [`Limits`] and produces a [`BoundMember`].
//! - **MemberBinding**: One variant per shape. Each variant captures the
//!   transport handle and the resolved wire name, nothing else.
//! - **Streams**: Bound eagerly. The subject is opened and registered with the
//!   transport when the member is bound, not when it is first read.
//!
//! Arguments are forwarded as one ordered list. The binder never pads,
//! truncates or reorders them, and returns the transport's results as-is.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::classify::Shape;
use crate::contract::MemberDescriptor;
use crate::error::Error;
use crate::error::Result;
use crate::event::EventHandler;
use crate::event::Subscription;
use crate::subject::Observable;
use crate::subject::Subject;
use crate::transport::Completion;
use crate::transport::Pending;
use crate::transport::Transport;

/// Arity bounds enforced while binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_call_arity: usize,
    pub max_event_arity: usize,
}

impl Limits {
    /// The bounds declared by transport `T`.
    pub fn of<T: Transport>() -> Self {
        Self {
            max_call_arity: T::MAX_CALL_ARITY,
            max_event_arity: T::MAX_EVENT_ARITY,
        }
    }

    /// Checks `arity` for a member of `shape`.
    pub fn check(&self, member: &str, shape: &Shape, arity: usize) -> Result<()> {
        let max = match shape {
            Shape::Call | Shape::TypedCall { .. } => self.max_call_arity,
            Shape::Event { .. } => self.max_event_arity,
            Shape::Stream { .. } => 0,
        };
        if arity > max {
            return Err(Error::UnsupportedArity {
                member: member.to_string(),
                arity,
                max,
            });
        }
        Ok(())
    }
}

/// Arity used for bound checks: call parameters, or the payload arity of an
/// event handler.
pub fn effective_arity(member: &MemberDescriptor, shape: &Shape) -> usize {
    match shape {
        Shape::Event { arity } => *arity,
        _ => member.arity(),
    }
}

/// A fire-and-forget call bound to its wire name.
pub struct BoundCall<T: Transport> {
    wire_name: Arc<str>,
    arity: usize,
    transport: Arc<T>,
}

impl<T: Transport> BoundCall<T> {
    /// Issues exactly one `call(wire_name, args)` on the transport.
    pub fn invoke(&self, args: Vec<Value>) -> Completion {
        debug_assert_eq!(args.len(), self.arity, "argument count for '{}'", self.wire_name);
        tracing::trace!(method = %self.wire_name, args = args.len(), "call");

        let transport = self.transport.clone();
        let wire_name = self.wire_name.clone();
        Box::pin(async move { transport.call(&wire_name, args).await })
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }
}

/// A value-returning call bound to its wire name.
pub struct BoundTypedCall<T: Transport> {
    wire_name: Arc<str>,
    arity: usize,
    transport: Arc<T>,
}

impl<T: Transport> BoundTypedCall<T> {
    /// Issues exactly one `call_typed::<R>(wire_name, args)` on the transport.
    pub fn invoke<R>(&self, args: Vec<Value>) -> Pending<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        debug_assert_eq!(args.len(), self.arity, "argument count for '{}'", self.wire_name);
        tracing::trace!(method = %self.wire_name, args = args.len(), "typed call");

        let transport = self.transport.clone();
        let wire_name = self.wire_name.clone();
        Box::pin(async move { transport.call_typed::<R>(&wire_name, args).await })
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }
}

/// A server-pushed event bound to its wire name.
pub struct BoundEvent<T: Transport> {
    wire_name: Arc<str>,
    arity: usize,
    transport: Arc<T>,
}

impl<T: Transport> BoundEvent<T> {
    /// Hands `handler` to the transport untouched and returns its handle.
    pub fn subscribe(&self, handler: EventHandler) -> Subscription {
        tracing::trace!(event = %self.wire_name, "subscribe");
        self.transport.subscribe(&self.wire_name, handler)
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Payload arity the declared handler expects.
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// A stream property: one live subject fed by the transport.
///
/// The transport registration is released when the bound stream is dropped.
pub struct BoundStream {
    subject: Arc<Subject>,
    registration: Subscription,
}

impl BoundStream {
    /// A typed read-only view of the stream.
    pub fn observable<V>(&self) -> Observable<V>
    where
        V: DeserializeOwned + Send + 'static,
    {
        Observable::new(self.subject.clone())
    }

    pub fn wire_name(&self) -> &str {
        self.subject.name()
    }
}

impl Drop for BoundStream {
    fn drop(&mut self) {
        self.registration.unsubscribe();
    }
}

/// The binding of one member, tagged by shape.
pub enum MemberBinding<T: Transport> {
    Call(BoundCall<T>),
    TypedCall(BoundTypedCall<T>),
    Event(BoundEvent<T>),
    Stream(BoundStream),
}

/// A member ready to dispatch.
pub struct BoundMember<T: Transport> {
    pub name: String,
    pub wire_name: String,
    pub shape: Shape,
    pub arity: usize,
    pub binding: MemberBinding<T>,
}

impl<T: Transport> std::fmt::Debug for BoundMember<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundMember")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("shape", &self.shape)
            .field("arity", &self.arity)
            .finish()
    }
}

/// The Binder wires members to a transport.
pub struct Binder;

impl Binder {
    /// Binds one member.
    ///
    /// Fails with `UnsupportedArity` when the member exceeds `limits`.
    /// Binding a stream registers a sink with the transport immediately.
    pub fn bind<T: Transport>(
        member: &MemberDescriptor,
        wire_name: &str,
        shape: Shape,
        transport: &Arc<T>,
        limits: &Limits,
    ) -> Result<BoundMember<T>> {
        let arity = effective_arity(member, &shape);
        limits.check(&member.name, &shape, arity)?;

        let binding = match &shape {
            Shape::Call => MemberBinding::Call(BoundCall {
                wire_name: Arc::from(wire_name),
                arity,
                transport: transport.clone(),
            }),
            Shape::TypedCall { .. } => MemberBinding::TypedCall(BoundTypedCall {
                wire_name: Arc::from(wire_name),
                arity,
                transport: transport.clone(),
            }),
            Shape::Event { .. } => MemberBinding::Event(BoundEvent {
                wire_name: Arc::from(wire_name),
                arity,
                transport: transport.clone(),
            }),
            Shape::Stream { item } => MemberBinding::Stream(open_stream(wire_name, item, transport)),
        };

        Ok(BoundMember {
            name: member.name.clone(),
            wire_name: wire_name.to_string(),
            shape,
            arity,
            binding,
        })
    }
}

fn open_stream<T: Transport>(wire_name: &str, item: &str, transport: &Arc<T>) -> BoundStream {
    let subject = Subject::new(wire_name);
    let feed = subject.clone();
    let registration = transport.on(wire_name, Arc::new(move |value: Value| feed.push(value)));

    tracing::debug!(stream = %wire_name, item, "opened stream subject");
    BoundStream { subject, registration }
}
