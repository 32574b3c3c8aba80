//! # Transport Abstraction
//!
//! The capability set a connected hub exposes to the proxy layer.
//!
//! ## Philosophy
//!
//! - **Already Connected**: A Transport is handed to the proxy fully established.
//!   Connecting, reconnecting and framing happen elsewhere.
//! - **Untyped Arguments**: Arguments travel as an ordered list of JSON values.
//!   The transport decides how they hit the wire.
//! - **Pass-Through Failures**: Whatever a Transport returns, the proxy returns.
//!   Errors are never rewrapped on the way out.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::event::EventHandler;
use crate::event::Subscription;

/// Errors that occur at the transport layer or on the remote hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The connection was dropped or never came up.
    ConnectionLost(String),
    /// The operation timed out before a response was received.
    Timeout,
    /// The hub method ran and faulted.
    Remote { method: String, message: String },
    /// Arguments or results could not be converted to or from the wire.
    Codec(String),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Timeout => write!(f, "Request timed out"),
            Self::Remote { method, message } => write!(f, "Hub method '{}' failed: {}", method, message),
            Self::Codec(msg) => write!(f, "Codec error: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A call in flight: completes when the hub acknowledges, carrying `T`.
pub type Pending<T> = BoxFuture<'static, Result<T>>;

/// A call in flight that carries no value.
pub type Completion = Pending<()>;

/// Receives every value pushed under one event name.
pub type Sink = Arc<dyn Fn(Value) + Send + Sync>;

/// The capability set of a connected hub.
///
/// # Invariants
/// - `call` and `call_typed` issue exactly one remote invocation per call.
/// - `subscribe` returns a handle whose `unsubscribe` stops further delivery.
/// - Handlers may be invoked from a transport-owned thread or task.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Largest argument list `call` and `call_typed` accept.
    const MAX_CALL_ARITY: usize = 10;

    /// Largest payload arity a subscribed handler may expect.
    const MAX_EVENT_ARITY: usize = 7;

    /// Invokes `method` and waits for completion, discarding any result.
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<()>;

    /// Invokes `method` and decodes its result as `R`.
    async fn call_typed<R>(&self, method: &str, args: Vec<Value>) -> Result<R>
    where
        R: DeserializeOwned + Send + 'static;

    /// Registers `handler` for every push of `event`.
    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription;

    /// Registers a single-value sink for `event`.
    ///
    /// A push carrying one argument is delivered as that argument; any other
    /// payload is delivered as a JSON array.
    fn on(&self, event: &str, sink: Sink) -> Subscription {
        let handler: EventHandler = Arc::new(move |args: &[Value]| {
            let value = match args {
                [single] => single.clone(),
                many => Value::Array(many.to_vec()),
            };
            sink(value);
        });
        self.subscribe(event, handler)
    }
}

/// Converts one positional argument to its wire value.
pub fn encode_arg<A: Serialize + ?Sized>(arg: &A) -> Result<Value> {
    serde_json::to_value(arg).map_err(Error::from)
}

/// A call that failed before it reached the transport.
pub fn rejected<T: Send + 'static>(err: Error) -> Pending<T> {
    Box::pin(futures::future::ready(Err(err)))
}
