use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::Result;
use crate::provider::Scope;
use crate::store::{Cache, Store};
use crate::stream::{StreamId, Subject, Subscription};

use super::first_value::FirstValue;

/// A caller-supplied pure selection of a stream out of the store.
///
/// Store accessor errors (`MissingKey`, `NotAStream`) are surfaced
/// unchanged, which is what makes activation fail synchronously on a
/// mis-wired combinator.
pub type Combinator<V> = dyn Fn(&Store) -> Result<Subject<V>> + Send + Sync;

/// Notified once per accepted emission so the owning component can
/// re-render. Hosts that poll [`ActivePlug::value`] themselves can skip
/// this and use [`Plug::activate`].
pub trait RenderHost: Send + Sync {
    fn invalidate(&self);
}

/// Adapter lifecycle state: transitions Pending to Ready exactly once per
/// activation, on the first accepted emission. Later emissions update the
/// value without leaving Ready.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlugState {
    /// No value observed yet; renders the default, if any.
    Pending,
    /// At least one value observed.
    Ready,
}

enum PlugValue<V> {
    Pending(Option<V>),
    Ready(V),
}

struct PlugShared<V> {
    value: RwLock<PlugValue<V>>,
    active: AtomicBool,
    host: Option<Arc<dyn RenderHost>>,
}

/// Reusable blueprint for a single-stream subscriber adapter: a combinator
/// plus an optional default shown while pending.
///
/// Activation derives the stream, subscribes, and returns an
/// [`ActivePlug`]; the same blueprint can be activated any number of times,
/// against any scope.
///
/// # Examples
///
/// ```
/// use patchbay::{Plug, Provider, Store, Subject};
///
/// let status: Subject<&'static str> = Subject::new();
/// let store = Store::builder().stream("status", status.clone()).build();
/// let provider = Provider::new(store).unwrap();
///
/// let plug = Plug::new(|store| store.stream::<&'static str>("status"))
///     .with_default("waiting");
/// let active = plug.activate(&provider.scope()).unwrap();
///
/// assert_eq!(active.value(), Some("waiting"));
/// status.next("loaded");
/// assert_eq!(active.value(), Some("loaded"));
/// ```
pub struct Plug<V> {
    combinator: Arc<Combinator<V>>,
    default: Option<V>,
}

impl<V> Clone for Plug<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            combinator: Arc::clone(&self.combinator),
            default: self.default.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Plug<V> {
    /// Create a plug around `combinator`.
    pub fn new<F>(combinator: F) -> Self
    where
        F: Fn(&Store) -> Result<Subject<V>> + Send + Sync + 'static,
    {
        Self {
            combinator: Arc::new(combinator),
            default: None,
        }
    }

    /// Value rendered while no emission has arrived yet.
    pub fn with_default(mut self, value: V) -> Self {
        self.default = Some(value);
        self
    }

    /// Activate against `scope` without a render host. The caller observes
    /// updates by polling [`ActivePlug::value`] or [`ActivePlug::render`].
    pub fn activate(&self, scope: &Scope) -> Result<ActivePlug<V>> {
        self.activate_inner(scope, None)
    }

    /// Activate against `scope`, invalidating `host` once per accepted
    /// emission.
    pub fn activate_with_host(
        &self,
        scope: &Scope,
        host: Arc<dyn RenderHost>,
    ) -> Result<ActivePlug<V>> {
        self.activate_inner(scope, Some(host))
    }

    fn activate_inner(
        &self,
        scope: &Scope,
        host: Option<Arc<dyn RenderHost>>,
    ) -> Result<ActivePlug<V>> {
        let stream = (self.combinator)(scope.store())?;

        let shared = Arc::new(PlugShared {
            value: RwLock::new(PlugValue::Pending(self.default.clone())),
            active: AtomicBool::new(true),
            host,
        });

        // Subscribe last: a behavior stream replays synchronously inside
        // subscribe, and the shared state must already be in place for it.
        let subscription = wire(&stream, &shared, scope.cache_arc());
        debug!(provider = scope.provider_id(), stream = ?stream.id(), "plug activated");

        Ok(ActivePlug {
            shared,
            subscription,
            stream_id: stream.id(),
            provider_id: scope.provider_id(),
            combinator: Arc::clone(&self.combinator),
        })
    }

    /// Wait for the stream's first value as an explicit two-state future.
    ///
    /// If this scope's provider has already seen the stream emit, the
    /// future is resolved immediately from the cache and no subscription is
    /// made. Otherwise the first emission resolves it, records the value in
    /// the cache, and releases the subscription.
    pub fn first_value(&self, scope: &Scope) -> Result<FirstValue<V>> {
        let stream = (self.combinator)(scope.store())?;

        if let Some(cached) = scope.cache().get::<V>(stream.id()) {
            debug!(stream = ?stream.id(), "first value served from cache");
            return Ok(FirstValue::resolved(cached));
        }

        let first = FirstValue::pending();
        let inner = first.inner_handle();
        let cache = scope.cache_arc();
        let id = stream.id();

        let subscription = stream.subscribe(move |value: &V| {
            cache.insert(id, value.clone());
            FirstValue::resolve(&inner, value.clone());
        });

        // A behavior stream may have resolved synchronously during
        // subscribe, in which case this releases immediately.
        first.attach_subscription(subscription);
        Ok(first)
    }
}

fn wire<V: Clone + Send + Sync + 'static>(
    stream: &Subject<V>,
    shared: &Arc<PlugShared<V>>,
    cache: Arc<Cache>,
) -> Subscription {
    let shared = Arc::clone(shared);
    let id = stream.id();
    stream.subscribe(move |value: &V| {
        // Deliveries racing deactivation must not mutate disposed state.
        if !shared.active.load(Ordering::SeqCst) {
            return;
        }
        *shared.value.write().unwrap() = PlugValue::Ready(value.clone());
        cache.insert(id, value.clone());
        if let Some(host) = &shared.host {
            host.invalidate();
        }
    })
}

/// A live adapter instance: one subscription, one Pending-to-Ready state
/// machine.
///
/// Deactivation releases the subscription exactly once, whether through
/// [`ActivePlug::deactivate`] or drop, and emissions delivered after
/// deactivation are discarded.
pub struct ActivePlug<V> {
    shared: Arc<PlugShared<V>>,
    subscription: Subscription,
    stream_id: StreamId,
    provider_id: usize,
    combinator: Arc<Combinator<V>>,
}

impl<V: Clone + Send + Sync + 'static> ActivePlug<V> {
    /// Current lifecycle state.
    pub fn state(&self) -> PlugState {
        match *self.shared.value.read().unwrap() {
            PlugValue::Pending(_) => PlugState::Pending,
            PlugValue::Ready(_) => PlugState::Ready,
        }
    }

    /// Hook-style access: the default while pending (or `None` without
    /// one), then the latest emitted value.
    pub fn value(&self) -> Option<V> {
        match &*self.shared.value.read().unwrap() {
            PlugValue::Pending(default) => default.clone(),
            PlugValue::Ready(value) => Some(value.clone()),
        }
    }

    /// Children-as-function access: `children` receives the current value
    /// by reference, without cloning.
    pub fn render<R>(&self, children: impl FnOnce(Option<&V>) -> R) -> R {
        match &*self.shared.value.read().unwrap() {
            PlugValue::Pending(default) => children(default.as_ref()),
            PlugValue::Ready(value) => children(Some(value)),
        }
    }

    /// Identity of the stream this plug is subscribed to.
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Whether the plug still accepts deliveries.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Re-run activation when `scope` belongs to a different provider.
    ///
    /// The old subscription is released and a new one acquired against the
    /// stream the combinator derives from the new store; the current value
    /// is retained across the swap. A scope from the same provider is a
    /// no-op. On combinator failure the existing subscription is kept.
    pub fn rebind(&mut self, scope: &Scope) -> Result<()> {
        if scope.provider_id() == self.provider_id {
            return Ok(());
        }

        // Derive first so a failing combinator leaves the plug untouched.
        let stream = (self.combinator)(scope.store())?;
        debug!(
            from = self.provider_id,
            to = scope.provider_id(),
            "plug rebinding"
        );

        self.subscription.unsubscribe();
        self.subscription = wire(&stream, &self.shared, scope.cache_arc());
        self.stream_id = stream.id();
        self.provider_id = scope.provider_id();
        Ok(())
    }

    fn release(&self) {
        self.shared.active.store(false, Ordering::SeqCst);
        self.subscription.unsubscribe();
    }

    /// Deactivate explicitly. Equivalent to dropping, but reads better at
    /// call sites that end a component's lifetime mid-scope.
    pub fn deactivate(self) {
        self.release();
        debug!(stream = ?self.stream_id, "plug deactivated");
    }
}

impl<V> Drop for ActivePlug<V> {
    fn drop(&mut self) {
        self.shared.active.store(false, Ordering::SeqCst);
        self.subscription.unsubscribe();
    }
}

impl<V: Clone + Send + Sync + std::fmt::Debug + 'static> std::fmt::Debug for ActivePlug<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivePlug")
            .field("state", &self.state())
            .field("value", &self.value())
            .field("active", &self.is_active())
            .finish()
    }
}
