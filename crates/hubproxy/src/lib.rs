//! # hubproxy
//!
//! Strongly-typed client proxies over an untyped hub transport.
//!
//! Declare the hub as a trait, mark it `#[hub_contract]`, and build the
//! generated proxy from any connected [`Transport`]:
//!
//! ```ignore
//! use hubproxy::{hub_contract, Completion, Pending, Subscription, TransportExt};
//!
//! #[hub_contract]
//! pub trait IChatHub {
//!     fn send(&self, user: String, text: String) -> Completion;
//!     #[method_name("GetHistory")]
//!     fn history(&self) -> Pending<Vec<String>>;
//!     fn on_message(&self, handler: impl Fn(String, String) + Send + Sync + 'static) -> Subscription;
//! }
//!
//! let chat: IChatHubProxy<_> = transport.strong_typed()?;
//! chat.send("ada".into(), "hi".into()).await?;
//! ```
//!
//! ## Pipeline
//!
//! Scanner → Classifier → Name Resolver → Binder → Assembler. Every stage is
//! synchronous; only the binder touches the transport.

extern crate self as hubproxy;

pub mod assemble;
pub mod bind;
pub mod builder;
pub mod classify;
pub mod contract;
pub mod error;
pub mod event;
pub mod mock_transport;
pub mod naming;
pub mod proxy;
pub mod scan;
pub mod subject;
pub mod transport;

pub use builder::ProxyBuilder;
pub use builder::TransportExt;
pub use contract::ContractDescriptor;
pub use contract::MemberDescriptor;
pub use contract::TypeDescriptor;
pub use error::Error;
pub use error::Result;
pub use event::EventHandler;
pub use event::IntoEventHandler;
pub use event::Subscription;
pub use proxy::Contract;
pub use proxy::HubClient;
pub use proxy::HubProxy;
pub use subject::Observable;
pub use transport::Completion;
pub use transport::Pending;
pub use transport::Transport;

#[cfg(feature = "derive")]
pub use hubproxy_derive::hub_contract;

/// Paths used by code generated from `#[hub_contract]`.
#[doc(hidden)]
pub mod __private {
    pub use serde::de::DeserializeOwned;
    pub use serde_json::Value;
    pub use std::sync::Arc;
}
