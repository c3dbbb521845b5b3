use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use tracing::trace;

use crate::stream::Subscription;

enum State<V> {
    Pending { wakers: Vec<Waker> },
    Resolved(V),
}

pub(super) struct Inner<V> {
    state: Mutex<State<V>>,
    arrived: Condvar,
    subscription: Mutex<Option<Subscription>>,
}

/// Explicit two-state future for a stream's first value.
///
/// This replaces suspense-style "throw a pending awaitable" control flow:
/// the pending/resolved state is a plain value the host can inspect
/// ([`try_get`](FirstValue::try_get)), block on ([`wait`](FirstValue::wait),
/// [`wait_timeout`](FirstValue::wait_timeout)), or poll as a
/// `std::future::Future`.
///
/// A `FirstValue` obtained through [`Plug::first_value`] resolves
/// immediately when the provider cache already holds a value for the
/// stream. Otherwise it holds a subscription that is released on the first
/// emission, or when the unresolved future is dropped.
///
/// [`Plug::first_value`]: super::Plug::first_value
///
/// # Examples
///
/// ```
/// use patchbay::{Plug, Provider, Store, Subject};
///
/// let data = Subject::behavior("ready".to_string());
/// let store = Store::builder().stream("data", data).build();
/// let provider = Provider::new(store).unwrap();
///
/// let plug = Plug::new(|s| s.stream::<String>("data"));
/// let first = plug.first_value(&provider.scope()).unwrap();
/// assert_eq!(first.wait(), "ready");
/// ```
pub struct FirstValue<V> {
    inner: Arc<Inner<V>>,
}

impl<V: Clone + Send + Sync + 'static> FirstValue<V> {
    pub(super) fn pending() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending { wakers: Vec::new() }),
                arrived: Condvar::new(),
                subscription: Mutex::new(None),
            }),
        }
    }

    pub(super) fn resolved(value: V) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Resolved(value)),
                arrived: Condvar::new(),
                subscription: Mutex::new(None),
            }),
        }
    }

    pub(super) fn inner_handle(&self) -> Arc<Inner<V>> {
        Arc::clone(&self.inner)
    }

    /// First emission wins; later deliveries are ignored. Releases the
    /// subscription, wakes blocked waiters and pending pollers.
    pub(super) fn resolve(inner: &Arc<Inner<V>>, value: V) {
        let wakers = {
            let mut state = inner.state.lock().unwrap();
            match &mut *state {
                State::Resolved(_) => return,
                State::Pending { wakers } => {
                    let wakers = std::mem::take(wakers);
                    *state = State::Resolved(value);
                    wakers
                }
            }
        };
        trace!("first value resolved");
        inner.arrived.notify_all();
        for waker in wakers {
            waker.wake();
        }
        if let Some(subscription) = inner.subscription.lock().unwrap().take() {
            subscription.unsubscribe();
        }
    }

    /// Hand the live subscription to the future. When the stream resolved
    /// synchronously during subscribe (behavior replay), the subscription
    /// is released on the spot instead of stored.
    pub(super) fn attach_subscription(&self, subscription: Subscription) {
        if self.is_resolved() {
            subscription.unsubscribe();
            return;
        }
        let mut slot = self.inner.subscription.lock().unwrap();
        if self.is_resolved() {
            // Resolved between the check and the lock.
            subscription.unsubscribe();
        } else {
            *slot = Some(subscription);
        }
    }

    /// Whether the first value has arrived.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.inner.state.lock().unwrap(), State::Resolved(_))
    }

    /// The value, if resolved; never blocks.
    pub fn try_get(&self) -> Option<V> {
        match &*self.inner.state.lock().unwrap() {
            State::Resolved(value) => Some(value.clone()),
            State::Pending { .. } => None,
        }
    }

    /// Block the calling thread until the first value arrives.
    pub fn wait(&self) -> V {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            match &*state {
                State::Resolved(value) => return value.clone(),
                State::Pending { .. } => {
                    state = self.inner.arrived.wait(state).unwrap();
                }
            }
        }
    }

    /// Block for at most `timeout`; `None` when the deadline passes first.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<V> {
        let deadline = std::time::Instant::now() + timeout;
        let mut state = self.inner.state.lock().unwrap();
        loop {
            match &*state {
                State::Resolved(value) => return Some(value.clone()),
                State::Pending { .. } => {
                    let remaining = deadline.saturating_duration_since(std::time::Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    let (guard, result) =
                        self.inner.arrived.wait_timeout(state, remaining).unwrap();
                    state = guard;
                    if result.timed_out() {
                        if let State::Resolved(value) = &*state {
                            return Some(value.clone());
                        }
                        return None;
                    }
                }
            }
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Future for FirstValue<V> {
    type Output = V;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<V> {
        let mut state = self.inner.state.lock().unwrap();
        match &mut *state {
            State::Resolved(value) => Poll::Ready(value.clone()),
            State::Pending { wakers } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<V> Drop for FirstValue<V> {
    // Dropping an unresolved future must release its subscription so the
    // stream stops holding the shared state alive.
    fn drop(&mut self) {
        if let Some(subscription) = self.inner.subscription.lock().unwrap().take() {
            subscription.unsubscribe();
        }
    }
}

impl<V: Clone + Send + Sync + std::fmt::Debug + 'static> std::fmt::Debug for FirstValue<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirstValue")
            .field("resolved", &self.is_resolved())
            .field("value", &self.try_get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plug::Plug;
    use crate::provider::Provider;
    use crate::store::Store;
    use crate::stream::Subject;
    use std::thread;

    fn provider_with(subject: Subject<i32>) -> Provider {
        let store = Store::builder().stream("nums", subject).build();
        Provider::new(store).unwrap()
    }

    #[test]
    fn behavior_stream_resolves_without_waiting() {
        let provider = provider_with(Subject::behavior(5));
        let plug = Plug::new(|s| s.stream::<i32>("nums"));

        let first = plug.first_value(&provider.scope()).unwrap();
        assert!(first.is_resolved());
        assert_eq!(first.try_get(), Some(5));
    }

    #[test]
    fn resolving_releases_the_subscription() {
        let subject: Subject<i32> = Subject::new();
        let provider = provider_with(subject.clone());
        let plug = Plug::new(|s| s.stream::<i32>("nums"));

        let first = plug.first_value(&provider.scope()).unwrap();
        assert_eq!(subject.subscriber_count(), 1);

        subject.next(1);
        assert_eq!(subject.subscriber_count(), 0);
        assert_eq!(first.try_get(), Some(1));
    }

    #[test]
    fn first_emission_wins() {
        let subject: Subject<i32> = Subject::new();
        let provider = provider_with(subject.clone());
        let plug = Plug::new(|s| s.stream::<i32>("nums"));

        let first = plug.first_value(&provider.scope()).unwrap();
        subject.next(1);
        subject.next(2);
        assert_eq!(first.try_get(), Some(1));
    }

    #[test]
    fn wait_blocks_until_background_emission() {
        let subject: Subject<i32> = Subject::new();
        let provider = provider_with(subject.clone());
        let plug = Plug::new(|s| s.stream::<i32>("nums"));

        let first = plug.first_value(&provider.scope()).unwrap();

        let pusher = subject.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            pusher.next(9);
        });

        assert_eq!(first.wait(), 9);
    }

    #[test]
    fn wait_timeout_expires_on_silence() {
        let provider = provider_with(Subject::new());
        let plug = Plug::new(|s| s.stream::<i32>("nums"));

        let first = plug.first_value(&provider.scope()).unwrap();
        assert_eq!(first.wait_timeout(Duration::from_millis(20)), None);
    }

    #[test]
    fn cache_hit_skips_subscription() {
        let subject: Subject<i32> = Subject::new();
        let provider = provider_with(subject.clone());
        let plug = Plug::new(|s| s.stream::<i32>("nums"));

        // Resolve once to seed the cache.
        let first = plug.first_value(&provider.scope()).unwrap();
        subject.next(4);
        assert_eq!(first.try_get(), Some(4));

        // Second ask is served from cache with no new subscription.
        let again = plug.first_value(&provider.scope()).unwrap();
        assert!(again.is_resolved());
        assert_eq!(again.try_get(), Some(4));
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn dropping_unresolved_future_releases_subscription() {
        let subject: Subject<i32> = Subject::new();
        let provider = provider_with(subject.clone());
        let plug = Plug::new(|s| s.stream::<i32>("nums"));

        {
            let _first = plug.first_value(&provider.scope()).unwrap();
            assert_eq!(subject.subscriber_count(), 1);
        }
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn future_poll_transitions_pending_to_ready() {
        let subject: Subject<i32> = Subject::new();
        let provider = provider_with(subject.clone());
        let plug = Plug::new(|s| s.stream::<i32>("nums"));

        let mut first = plug.first_value(&provider.scope()).unwrap();
        let mut cx = Context::from_waker(Waker::noop());

        assert_eq!(Pin::new(&mut first).poll(&mut cx), Poll::Pending);
        subject.next(3);
        assert_eq!(Pin::new(&mut first).poll(&mut cx), Poll::Ready(3));
    }
}
