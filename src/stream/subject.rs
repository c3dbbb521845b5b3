use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::trace;

static NEXT_STREAM_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique identity of a stream allocation.
///
/// Clones of a `Subject` share one id; two independently constructed
/// subjects never do, even when they carry equal values. The provider cache
/// is keyed by this identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(usize);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SubjectInner<T> {
    current: RwLock<Option<T>>,
    replay: bool,
    // Insertion order doubles as delivery order.
    subscribers: RwLock<Vec<(usize, Callback<T>)>>,
    next_sub_id: AtomicUsize,
    // Keeps upstream registrations alive for derived subjects (`map`).
    upstream: Mutex<Vec<Subscription>>,
}

/// A push-based stream: observers register a `next` callback and receive
/// every value emitted while their subscription is alive.
///
/// Two flavors:
/// - [`Subject::new`] delivers only emissions that happen after `subscribe`;
/// - [`Subject::behavior`] additionally replays the current value to each
///   new subscriber, synchronously, inside the `subscribe` call.
///
/// # Examples
///
/// ```
/// use patchbay::Subject;
/// use std::sync::{Arc, Mutex};
///
/// let subject: Subject<i32> = Subject::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sub = subject.subscribe({
///     let seen = Arc::clone(&seen);
///     move |v| seen.lock().unwrap().push(*v)
/// });
///
/// subject.next(1);
/// subject.next(2);
/// sub.unsubscribe();
/// subject.next(3);
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
    id: StreamId,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            id: self.id,
        }
    }
}

impl<T> std::fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("id", &self.id)
            .field("replay", &self.inner.replay)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::with_replay(false, None)
    }
}

impl<T> Subject<T> {
    /// Create a subject without replay: subscribers only see emissions that
    /// happen after they subscribe.
    pub fn new() -> Self {
        Self::with_replay(false, None)
    }

    /// Create a subject that holds a current value and replays it to every
    /// new subscriber synchronously during `subscribe`.
    pub fn behavior(initial: T) -> Self {
        Self::with_replay(true, Some(initial))
    }

    fn with_replay(replay: bool, initial: Option<T>) -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                current: RwLock::new(initial),
                replay,
                subscribers: RwLock::new(Vec::new()),
                next_sub_id: AtomicUsize::new(0),
                upstream: Mutex::new(Vec::new()),
            }),
            id: StreamId(NEXT_STREAM_ID.fetch_add(1, Ordering::SeqCst)),
        }
    }

    /// The stream's unique identity.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().unwrap().len()
    }
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    /// Push a value to every current subscriber, in subscription order.
    ///
    /// The value becomes the subject's current value first, so a replaying
    /// subscriber that registers from inside a callback still observes it.
    pub fn next(&self, value: T) {
        *self.inner.current.write().unwrap() = Some(value.clone());

        // Snapshot so no lock is held while observers run.
        let subscribers: Vec<Callback<T>> = self
            .inner
            .subscribers
            .read()
            .unwrap()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        trace!(stream = self.id.0, fanout = subscribers.len(), "emit");
        for cb in subscribers {
            cb(&value);
        }
    }

    /// Register an observer callback.
    ///
    /// For behavior subjects the current value is delivered synchronously
    /// before `subscribe` returns. The returned [`Subscription`] releases
    /// the registration on `unsubscribe()` or drop, exactly once.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let sub_id = self.inner.next_sub_id.fetch_add(1, Ordering::SeqCst);
        let callback: Callback<T> = Arc::new(observer);

        self.inner
            .subscribers
            .write()
            .unwrap()
            .push((sub_id, Arc::clone(&callback)));
        trace!(stream = self.id.0, sub = sub_id, "subscribe");

        if self.inner.replay {
            let current = self.inner.current.read().unwrap();
            if let Some(value) = current.as_ref() {
                callback(value);
            }
        }

        let weak = Arc::downgrade(&self.inner);
        let stream_id = self.id.0;
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut subscribers = inner.subscribers.write().unwrap();
                subscribers.retain(|(id, _)| *id != sub_id);
                trace!(stream = stream_id, sub = sub_id, "unsubscribe");
            }
        })
    }

    /// Derive a new subject by applying `f` to every emission.
    ///
    /// The derived subject keeps the upstream registration alive for its own
    /// lifetime and inherits the replay flavor, so mapping a behavior
    /// subject yields a behavior subject whose current value is already
    /// mapped.
    pub fn map<U, F>(&self, f: F) -> Subject<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let derived = Subject::<U>::with_replay(self.inner.replay, None);

        let sink = derived.clone();
        let sub = self.subscribe(move |value| {
            sink.next(f(value));
        });

        derived.inner.upstream.lock().unwrap().push(sub);
        derived
    }
}

/// Scoped release of one observer registration.
///
/// `unsubscribe()` is idempotent: the teardown runs at most once, whether
/// triggered explicitly, by a second call, or by drop.
pub struct Subscription {
    teardown: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    /// Release the registration. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let teardown = self.teardown.lock().unwrap().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Whether the registration has already been released.
    pub fn is_released(&self) -> bool {
        self.teardown.lock().unwrap().is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.is_released())
            .finish()
    }
}
