//! Mock transports for testing.
//!
//! [`MockTransport`] records every invocation, answers typed calls from canned
//! replies, injects failures per method and fans pushed events out to its
//! subscribers. It is used by this crate's own tests and is public so that
//! contract crates can test their proxies without a live hub.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::event::EventHandler;
use crate::event::Subscription;
use crate::transport;
use crate::transport::Transport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationKind {
    Call,
    Typed,
}

/// One call observed by the mock.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub kind: InvocationKind,
    pub method: String,
    pub args: Vec<Value>,
}

impl Invocation {
    pub fn call(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self { kind: InvocationKind::Call, method: method.into(), args }
    }

    pub fn typed(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self { kind: InvocationKind::Typed, method: method.into(), args }
    }
}

/// In-memory hub transport.
#[derive(Default)]
pub struct MockTransport {
    log: Mutex<Vec<Invocation>>,
    replies: DashMap<String, Value>,
    failures: DashMap<String, transport::Error>,
    subscribers: Arc<DashMap<String, Vec<(u64, EventHandler)>>>,
    next_id: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every typed call to `method` with `value`.
    pub fn reply(&self, method: impl Into<String>, value: Value) {
        self.replies.insert(method.into(), value);
    }

    /// Fails every call to `method` with `error`.
    pub fn fail(&self, method: impl Into<String>, error: transport::Error) {
        self.failures.insert(method.into(), error);
    }

    /// Every invocation so far, in the order they reached the transport.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Pushes one event to every current subscriber of `event`.
    pub fn emit(&self, event: &str, args: Vec<Value>) {
        let handlers: Vec<EventHandler> = self
            .subscribers
            .get(event)
            .map(|entry| entry.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        for handler in handlers {
            handler(&args);
        }
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.get(event).map(|entry| entry.len()).unwrap_or(0)
    }

    fn record(&self, invocation: Invocation) -> transport::Result<()> {
        let method = invocation.method.clone();
        self.log.lock().unwrap_or_else(|p| p.into_inner()).push(invocation);
        match self.failures.get(&method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn call(&self, method: &str, args: Vec<Value>) -> transport::Result<()> {
        self.record(Invocation::call(method, args))
    }

    async fn call_typed<R>(&self, method: &str, args: Vec<Value>) -> transport::Result<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        self.record(Invocation::typed(method, args))?;
        let value = self
            .replies
            .get(method)
            .map(|v| v.clone())
            .unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(transport::Error::from)
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .entry(event.to_string())
            .or_default()
            .push((id, handler));

        let subscribers = Arc::downgrade(&self.subscribers);
        let event = event.to_string();
        Subscription::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                if let Some(mut entry) = subscribers.get_mut(&event) {
                    entry.retain(|(other, _)| *other != id);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let mock = MockTransport::new();

        mock.call("a", vec![json!(1)]).await.unwrap();
        let _: Value = mock.call_typed("b", vec![]).await.unwrap();

        assert_eq!(
            mock.invocations(),
            vec![Invocation::call("a", vec![json!(1)]), Invocation::typed("b", vec![])]
        );
    }

    #[tokio::test]
    async fn test_failures_are_returned_after_recording() {
        let mock = MockTransport::new();
        mock.fail("down", transport::Error::ConnectionLost("gone".into()));

        let err = mock.call("down", vec![]).await.unwrap_err();

        assert_eq!(err, transport::Error::ConnectionLost("gone".into()));
        assert_eq!(mock.invocations().len(), 1);
    }

    #[test]
    fn test_emit_and_unsubscribe() {
        let mock = MockTransport::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let sub = mock.subscribe("tick", Arc::new(move |args: &[Value]| {
            sink.lock().unwrap().push(args.to_vec());
        }));
        mock.emit("tick", vec![json!(1)]);
        sub.unsubscribe();
        mock.emit("tick", vec![json!(2)]);

        assert_eq!(*seen.lock().unwrap(), vec![vec![json!(1)]]);
        assert_eq!(mock.subscriber_count("tick"), 0);
    }

    #[test]
    fn test_on_unwraps_single_argument() {
        let mock = MockTransport::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        mock.on("tick", Arc::new(move |v: Value| sink.lock().unwrap().push(v)));
        mock.emit("tick", vec![json!(1)]);
        mock.emit("tick", vec![json!(1), json!(2)]);

        assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!([1, 2])]);
    }
}
