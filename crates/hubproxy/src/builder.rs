//! # Proxy Builder
//!
//! Provides a fluent API for configuring and building typed proxies.

use std::sync::Arc;

use crate::assemble::assemble;
use crate::bind::Limits;
use crate::contract::ContractDescriptor;
use crate::error::Result;
use crate::proxy::Contract;
use crate::proxy::HubProxy;
use crate::transport::Transport;

/// Fluent builder for proxies over one transport.
pub struct ProxyBuilder<T: Transport> {
    transport: Arc<T>,
    limits: Limits,
    hub_name: Option<String>,
}

impl<T: Transport> ProxyBuilder<T> {
    /// Starts from the transport's own arity bounds and the contract's hub name.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            limits: Limits::of::<T>(),
            hub_name: None,
        }
    }

    /// Tightens the call arity bound. Values above the transport's bound are clamped.
    pub fn max_call_arity(mut self, max: usize) -> Self {
        self.limits.max_call_arity = max.min(T::MAX_CALL_ARITY);
        self
    }

    /// Tightens the event arity bound. Values above the transport's bound are clamped.
    pub fn max_event_arity(mut self, max: usize) -> Self {
        self.limits.max_event_arity = max.min(T::MAX_EVENT_ARITY);
        self
    }

    /// Replaces the contract's hub name.
    pub fn hub_name(mut self, hub_name: impl Into<String>) -> Self {
        self.hub_name = Some(hub_name.into());
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Assembles the member table for a descriptor.
    pub fn assemble(&self, contract: &ContractDescriptor) -> Result<HubProxy<T>> {
        assemble(contract, self.transport.clone(), &self.limits, self.hub_name.as_deref())
    }

    /// Builds the typed proxy `P`.
    pub fn build<P: Contract<T>>(self) -> Result<P> {
        let hub = self.assemble(&P::descriptor())?;
        P::from_hub(hub)
    }
}

/// Builds typed proxies straight from a shared transport.
pub trait TransportExt: Transport + Sized {
    /// Builds `P` with default limits.
    fn strong_typed<P: Contract<Self>>(self: &Arc<Self>) -> Result<P> {
        ProxyBuilder::new(self.clone()).build()
    }
}

impl<T: Transport> TransportExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mock_transport::MockTransport;

    #[test]
    fn test_limits_are_clamped_to_transport() {
        let builder = ProxyBuilder::new(Arc::new(MockTransport::new()))
            .max_call_arity(64)
            .max_event_arity(2);

        assert_eq!(builder.limits(), Limits { max_call_arity: 10, max_event_arity: 2 });
    }
}
