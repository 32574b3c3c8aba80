//! # Event Subscriptions
//!
//! Handlers for server-pushed events and the handles that cancel them.
//!
//! The transport only ever sees [`EventHandler`]: an untyped callable over the
//! positional payload of one push. Typed handlers declared on a contract
//! (`impl Fn(A, B)`) are erased into that form through [`IntoEventHandler`],
//! which decodes each payload argument by position.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Untyped handler invoked once per push with the positional payload.
pub type EventHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

type Cancel = Box<dyn FnOnce() + Send>;

/// Handle to an active subscription.
///
/// Cloning shares the handle. [`Subscription::unsubscribe`] is idempotent; the
/// cancel action runs at most once no matter how many clones call it.
/// Dropping a handle does not unsubscribe.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

struct Inner {
    active: AtomicBool,
    cancel: Mutex<Option<Cancel>>,
}

impl Subscription {
    /// Wraps the action that detaches a handler from its source.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                active: AtomicBool::new(true),
                cancel: Mutex::new(Some(Box::new(cancel))),
            }),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn empty() -> Self {
        Self::new(|| {})
    }

    /// Stops further deliveries. Deliveries already dispatched may still finish.
    pub fn unsubscribe(&self) {
        if !self.inner.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let cancel = match self.inner.cancel.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A typed callable that can be erased into an [`EventHandler`].
///
/// `Args` is the tuple of the handler's parameter types. Implemented for
/// `Fn` closures of zero to seven parameters, matching the largest payload a
/// hub event carries.
pub trait IntoEventHandler<Args>: Send + Sync + 'static {
    /// Number of payload arguments the handler consumes.
    const ARITY: usize;

    fn into_event_handler(self) -> EventHandler;
}

/// Decodes the payload argument at `index`, logging when it does not fit.
fn decode_at<A: DeserializeOwned>(args: &[Value], index: usize) -> Option<A> {
    let Some(raw) = args.get(index) else {
        tracing::warn!(index, received = args.len(), "event payload is missing an argument");
        return None;
    };
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(index, error = %e, "event payload argument has the wrong shape");
            None
        }
    }
}

macro_rules! impl_into_event_handler {
    ($arity:expr; $(($ty:ident, $val:ident, $idx:tt)),*) => {
        impl<F, $($ty),*> IntoEventHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) + Send + Sync + 'static,
            $($ty: DeserializeOwned + 'static,)*
        {
            const ARITY: usize = $arity;

            #[allow(unused_variables)]
            fn into_event_handler(self) -> EventHandler {
                let handler = self;
                Arc::new(move |args: &[Value]| {
                    $(
                        let Some($val) = decode_at::<$ty>(args, $idx) else { return };
                    )*
                    handler($($val),*)
                })
            }
        }
    };
}

impl_into_event_handler!(0;);
impl_into_event_handler!(1; (A1, a1, 0));
impl_into_event_handler!(2; (A1, a1, 0), (A2, a2, 1));
impl_into_event_handler!(3; (A1, a1, 0), (A2, a2, 1), (A3, a3, 2));
impl_into_event_handler!(4; (A1, a1, 0), (A2, a2, 1), (A3, a3, 2), (A4, a4, 3));
impl_into_event_handler!(5; (A1, a1, 0), (A2, a2, 1), (A3, a3, 2), (A4, a4, 3), (A5, a5, 4));
impl_into_event_handler!(6; (A1, a1, 0), (A2, a2, 1), (A3, a3, 2), (A4, a4, 3), (A5, a5, 4), (A6, a6, 5));
impl_into_event_handler!(7; (A1, a1, 0), (A2, a2, 1), (A3, a3, 2), (A4, a4, 3), (A5, a5, 4), (A6, a6, 5), (A7, a7, 6));

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    #[test]
    fn test_unsubscribe_runs_cancel_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = count.clone();
        let sub = Subscription::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        let clone = sub.clone();

        sub.unsubscribe();
        clone.unsubscribe();
        sub.unsubscribe();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!sub.is_active());
        assert!(!clone.is_active());
    }

    #[test]
    fn test_typed_handler_decodes_positionally() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = IntoEventHandler::<(String, u32)>::into_event_handler(
            move |name: String, age: u32| sink.lock().unwrap().push((name, age)),
        );

        handler(&[json!("ada"), json!(36)]);
        handler(&[json!("grace"), json!(85)]);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("ada".to_string(), 36), ("grace".to_string(), 85)]
        );
    }

    #[test]
    fn test_typed_handler_skips_mismatched_payload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let handler = IntoEventHandler::<(u32,)>::into_event_handler(move |_: u32| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        handler(&[json!("not a number")]);
        handler(&[]);
        handler(&[json!(7)]);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_arity_handler_ignores_payload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let handler = IntoEventHandler::<()>::into_event_handler(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        handler(&[json!(1), json!(2)]);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(<fn() as IntoEventHandler<()>>::ARITY, 0);
    }
}
