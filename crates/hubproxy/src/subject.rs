//! # Multicast Subject
//!
//! Backs stream properties: one subject per property per proxy, fed by the
//! transport and fanned out to every attached observer.
//!
//! ## Invariants
//!
//! - Pushes are serialized. Two concurrent pushes never interleave their
//!   deliveries, so every observer sees the same order.
//! - No replay. An observer receives only values pushed after it attached.
//! - Observers may attach or detach from inside a delivery.
//! - An observer may push to its own subject. The value is queued and
//!   delivered to everyone once the current delivery has finished.
//! - Streams are bounded. A stream that falls more than its capacity behind
//!   loses its oldest values and logs how many it skipped.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;
use std::thread;
use std::thread::ThreadId;

use futures::Stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::event::Subscription;

type Observer = Arc<dyn Fn(&Value) + Send + Sync>;

/// Values a stream may fall behind by before it starts losing the oldest.
pub const STREAM_CAPACITY: usize = 64;

/// Locks a mutex, recovering the data if a panicking observer poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Hot, untyped push point.
pub struct Subject {
    name: String,
    observers: Mutex<Vec<(u64, Observer)>>,
    push_lock: Mutex<()>,
    delivering: Mutex<Option<ThreadId>>,
    queued: Mutex<VecDeque<Value>>,
    next_id: AtomicU64,
}

/// Marks the delivering thread for the span of one push.
struct Delivery<'a> {
    subject: &'a Subject,
}

impl<'a> Delivery<'a> {
    fn begin(subject: &'a Subject) -> Self {
        *lock(&subject.delivering) = Some(thread::current().id());
        Self { subject }
    }
}

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        *lock(&self.subject.delivering) = None;
        lock(&self.subject.queued).clear();
    }
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            observers: Mutex::new(Vec::new()),
            push_lock: Mutex::new(()),
            delivering: Mutex::new(None),
            queued: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivers `value` to every observer attached at the time of the push.
    ///
    /// Called from inside one of this subject's observers, the value is
    /// queued instead and delivered after the current value.
    pub fn push(&self, value: Value) {
        if *lock(&self.delivering) == Some(thread::current().id()) {
            tracing::trace!(subject = %self.name, "re-entrant push queued");
            lock(&self.queued).push_back(value);
            return;
        }

        let _serial = lock(&self.push_lock);
        let _delivery = Delivery::begin(self);
        let mut next = Some(value);
        while let Some(value) = next {
            self.deliver(&value);
            next = lock(&self.queued).pop_front();
        }
    }

    fn deliver(&self, value: &Value) {
        let snapshot: Vec<Observer> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        tracing::trace!(subject = %self.name, observers = snapshot.len(), "push");
        for observer in snapshot {
            observer(value);
        }
    }

    /// Attaches a raw observer.
    pub fn attach(self: &Arc<Self>, observer: impl Fn(&Value) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.observers).push((id, Arc::new(observer)));

        let weak = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(subject) = weak.upgrade() {
                lock(&subject.observers).retain(|(other, _)| *other != id);
            }
        })
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }
}

/// Read-only typed view over a [`Subject`].
///
/// Values that do not decode as `V` are logged and skipped for that observer.
pub struct Observable<V> {
    subject: Arc<Subject>,
    _item: PhantomData<fn() -> V>,
}

impl<V> Clone for Observable<V> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            _item: PhantomData,
        }
    }
}

impl<V> std::fmt::Debug for Observable<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("subject", &self.subject.name)
            .field("observers", &self.subject.observer_count())
            .finish()
    }
}

impl<V> Observable<V>
where
    V: DeserializeOwned + Send + 'static,
{
    pub fn new(subject: Arc<Subject>) -> Self {
        Self {
            subject,
            _item: PhantomData,
        }
    }

    /// Calls `observer` with every value pushed from now on.
    pub fn subscribe(&self, observer: impl Fn(V) + Send + Sync + 'static) -> Subscription {
        let name = self.subject.name.clone();
        self.subject.attach(move |raw: &Value| {
            if let Some(value) = decode::<V>(&name, raw) {
                observer(value);
            }
        })
    }

    /// Attaches a stream of every value pushed from now on, buffering up to
    /// [`STREAM_CAPACITY`] values.
    ///
    /// Dropping the stream detaches it.
    pub fn stream(&self) -> ObservableStream<V> {
        self.stream_with_capacity(STREAM_CAPACITY)
    }

    /// Like [`stream`](Self::stream) with an explicit buffer size. When the
    /// buffer is full the oldest value is dropped.
    pub fn stream_with_capacity(&self, capacity: usize) -> ObservableStream<V> {
        let (tx, rx) = broadcast::channel::<Value>(capacity.max(1));
        let subscription = self.subject.attach(move |raw: &Value| {
            let _ = tx.send(raw.clone());
        });

        let name = self.subject.name.clone();
        let values = futures::stream::unfold(rx, move |mut rx| {
            let name = name.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(raw) => {
                            if let Some(value) = decode::<V>(&name, &raw) {
                                return Some((value, rx));
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(subject = %name, skipped, "stream fell behind, oldest values dropped");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        ObservableStream {
            values: values.boxed(),
            subscription,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }
}

fn decode<V: DeserializeOwned>(subject: &str, raw: &Value) -> Option<V> {
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(subject, error = %e, "stream value has the wrong shape");
            None
        }
    }
}

/// A [`Stream`] attached to an [`Observable`].
pub struct ObservableStream<V> {
    values: BoxStream<'static, V>,
    subscription: Subscription,
}

impl<V> Stream for ObservableStream<V> {
    type Item = V;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<V>> {
        self.values.poll_next_unpin(cx)
    }
}

impl<V> Drop for ObservableStream<V> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_push_reaches_every_observer() {
        let subject = Subject::new("ticks");
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        let (sink_a, sink_b) = (a.clone(), b.clone());

        let view = Observable::<u32>::new(subject.clone());
        view.subscribe(move |v| sink_a.lock().unwrap().push(v));
        view.subscribe(move |v| sink_b.lock().unwrap().push(v));

        subject.push(json!(1));
        subject.push(json!(2));

        assert_eq!(*a.lock().unwrap(), vec![1, 2]);
        assert_eq!(*b.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_late_observer_gets_no_replay() {
        let subject = Subject::new("ticks");
        let view = Observable::<u32>::new(subject.clone());

        subject.push(json!(1));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        view.subscribe(move |v| sink.lock().unwrap().push(v));
        subject.push(json!(2));

        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_unsubscribe_detaches_observer() {
        let subject = Subject::new("ticks");
        let view = Observable::<u32>::new(subject.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let sub = view.subscribe(move |v| sink.lock().unwrap().push(v));
        subject.push(json!(1));
        sub.unsubscribe();
        subject.push(json!(2));

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_observer_may_attach_during_push() {
        let subject = Subject::new("ticks");
        let inner = subject.clone();
        let attached = Arc::new(Mutex::new(false));
        let flag = attached.clone();

        subject.attach(move |_| {
            let mut done = flag.lock().unwrap();
            if !*done {
                *done = true;
                inner.attach(|_| {});
            }
        });
        subject.push(json!(null));

        assert_eq!(subject.observer_count(), 2);
    }

    #[tokio::test]
    async fn test_stream_yields_pushed_values() {
        let subject = Subject::new("prices");
        let view = Observable::<f64>::new(subject.clone());
        let mut stream = view.stream();

        subject.push(json!(1.5));
        subject.push(json!("garbage"));
        subject.push(json!(2.5));

        assert_eq!(stream.next().await, Some(1.5));
        assert_eq!(stream.next().await, Some(2.5));

        drop(stream);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_observer_may_push_to_its_own_subject() {
        let subject = Subject::new("echo");
        let inner = subject.clone();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (first, second) = (log.clone(), log.clone());

        subject.attach(move |v| {
            let n = v.as_u64().unwrap();
            first.lock().unwrap().push(("a", n));
            if n < 3 {
                inner.push(json!(n + 1));
            }
        });
        subject.attach(move |v| second.lock().unwrap().push(("b", v.as_u64().unwrap())));

        subject.push(json!(1));

        assert_eq!(
            *log.lock().unwrap(),
            vec![("a", 1), ("b", 1), ("a", 2), ("b", 2), ("a", 3), ("b", 3)]
        );
    }

    #[tokio::test]
    async fn test_slow_stream_drops_oldest_values() {
        let subject = Subject::new("prices");
        let view = Observable::<u32>::new(subject.clone());
        let mut stream = view.stream_with_capacity(2);

        for n in 1..=5 {
            subject.push(json!(n));
        }

        assert_eq!(stream.next().await, Some(4));
        assert_eq!(stream.next().await, Some(5));

        subject.push(json!(6));
        assert_eq!(stream.next().await, Some(6));
    }

    #[test]
    fn test_concurrent_pushes_do_not_interleave() {
        let subject = Subject::new("counter");
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();

        subject.attach(move |v| {
            let n = v.as_u64().unwrap();
            sink.lock().unwrap().push(("begin", n));
            std::thread::yield_now();
            sink.lock().unwrap().push(("end", n));
        });

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let subject = subject.clone();
                std::thread::spawn(move || subject.push(json!(n)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 16);
        for pair in log.chunks(2) {
            assert_eq!(pair[0].0, "begin");
            assert_eq!(pair[1].0, "end");
            assert_eq!(pair[0].1, pair[1].1);
        }
    }
}
