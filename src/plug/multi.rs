use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::error::{PlugError, Result};
use crate::provider::Scope;
use crate::store::Store;
use crate::stream::{Subject, Subscription};

use super::plug::{Combinator, PlugState, RenderHost};

/// Keyed snapshot of the latest value per named stream, preserving the key
/// order the [`MultiPlug`] was built with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyedValues<V> {
    entries: Vec<(String, V)>,
}

impl<V> KeyedValues<V> {
    /// The value under `key`, if present.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Keys in construction order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, value)` pairs in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keys. Never true for values produced by an
    /// activated `MultiPlug`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct MultiShared<V> {
    keys: Vec<String>,
    // One slot per key, filled on that key's first emission.
    slots: Mutex<Vec<Option<V>>>,
    combined: RwLock<Option<KeyedValues<V>>>,
    active: AtomicBool,
    host: Option<Arc<dyn RenderHost>>,
}

impl<V: Clone> MultiShared<V> {
    // Combine-latest step: store the emission, and once every slot is
    // filled publish a fresh combined snapshot in key order.
    fn deliver(&self, index: usize, value: V) -> bool {
        let mut slots = self.slots.lock().unwrap();
        slots[index] = Some(value);
        if slots.iter().any(Option::is_none) {
            return false;
        }
        let entries = self
            .keys
            .iter()
            .cloned()
            .zip(slots.iter().map(|slot| slot.clone().unwrap()))
            .collect();
        *self.combined.write().unwrap() = Some(KeyedValues { entries });
        true
    }
}

/// Combine-latest adapter over an ordered mapping of named combinators.
///
/// Stays `Pending` until every named stream has emitted at least once, then
/// becomes `Ready` with a [`KeyedValues`] snapshot; each subsequent
/// emission on any key produces one combined update and one host
/// invalidation. All streams in one `MultiPlug` emit the same element type.
///
/// # Examples
///
/// ```
/// use patchbay::{MultiPlug, PlugState, Provider, Store, Subject};
///
/// let temp: Subject<i64> = Subject::new();
/// let humidity: Subject<i64> = Subject::new();
/// let store = Store::builder()
///     .stream("temp", temp.clone())
///     .stream("humidity", humidity.clone())
///     .build();
/// let provider = Provider::new(store).unwrap();
///
/// let plug = MultiPlug::new()
///     .plug("temp", |s: &Store| s.stream::<i64>("temp"))
///     .plug("humidity", |s: &Store| s.stream::<i64>("humidity"));
/// let active = plug.activate(&provider.scope()).unwrap();
///
/// temp.next(21);
/// assert_eq!(active.state(), PlugState::Pending);
///
/// humidity.next(40);
/// let values = active.values().unwrap();
/// assert_eq!(values.get("temp"), Some(&21));
/// assert_eq!(values.get("humidity"), Some(&40));
/// ```
pub struct MultiPlug<V> {
    bindings: Vec<(String, Arc<Combinator<V>>)>,
}

impl<V> Default for MultiPlug<V> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> MultiPlug<V> {
    /// Start an empty mapping. At least one [`plug`](MultiPlug::plug) call
    /// is required before activation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named combinator. Key order here is the key order of every
    /// [`KeyedValues`] the adapter produces.
    pub fn plug<F>(mut self, key: impl Into<String>, combinator: F) -> Self
    where
        F: Fn(&Store) -> Result<Subject<V>> + Send + Sync + 'static,
    {
        self.bindings.push((key.into(), Arc::new(combinator)));
        self
    }

    /// Activate against `scope` without a render host.
    pub fn activate(&self, scope: &Scope) -> Result<ActiveMultiPlug<V>> {
        self.activate_inner(scope, None)
    }

    /// Activate against `scope`, invalidating `host` once per combined
    /// update.
    pub fn activate_with_host(
        &self,
        scope: &Scope,
        host: Arc<dyn RenderHost>,
    ) -> Result<ActiveMultiPlug<V>> {
        self.activate_inner(scope, Some(host))
    }

    fn activate_inner(
        &self,
        scope: &Scope,
        host: Option<Arc<dyn RenderHost>>,
    ) -> Result<ActiveMultiPlug<V>> {
        if self.bindings.is_empty() {
            return Err(PlugError::EmptyBinding);
        }

        // Derive every stream first so one bad combinator fails the whole
        // activation before anything subscribes.
        let mut streams = Vec::with_capacity(self.bindings.len());
        for (_, combinator) in &self.bindings {
            streams.push(combinator(scope.store())?);
        }

        let shared = Arc::new(MultiShared {
            keys: self.bindings.iter().map(|(k, _)| k.clone()).collect(),
            slots: Mutex::new(vec![None; self.bindings.len()]),
            combined: RwLock::new(None),
            active: AtomicBool::new(true),
            host,
        });

        let cache = scope.cache_arc();
        let mut subscriptions = Vec::with_capacity(streams.len());
        for (index, stream) in streams.iter().enumerate() {
            let shared = Arc::clone(&shared);
            let cache = Arc::clone(&cache);
            let id = stream.id();
            subscriptions.push(stream.subscribe(move |value: &V| {
                // Deliveries racing deactivation must not mutate disposed
                // state. Behavior replay arrives here synchronously during
                // wiring and fills its slot like any other emission.
                if !shared.active.load(Ordering::SeqCst) {
                    return;
                }
                cache.insert(id, value.clone());
                if shared.deliver(index, value.clone()) {
                    if let Some(host) = &shared.host {
                        host.invalidate();
                    }
                }
            }));
        }

        debug!(
            provider = scope.provider_id(),
            keys = shared.keys.len(),
            "multi plug activated"
        );

        Ok(ActiveMultiPlug {
            shared,
            subscriptions,
        })
    }
}

/// A live combine-latest adapter: one subscription per named stream.
pub struct ActiveMultiPlug<V> {
    shared: Arc<MultiShared<V>>,
    subscriptions: Vec<Subscription>,
}

impl<V: Clone + Send + Sync + 'static> ActiveMultiPlug<V> {
    /// `Pending` until every named stream has emitted.
    pub fn state(&self) -> PlugState {
        if self.shared.combined.read().unwrap().is_some() {
            PlugState::Ready
        } else {
            PlugState::Pending
        }
    }

    /// Latest combined snapshot, once every key has a value.
    pub fn values(&self) -> Option<KeyedValues<V>> {
        self.shared.combined.read().unwrap().clone()
    }

    /// Children-as-function access to the combined snapshot.
    pub fn render<R>(&self, children: impl FnOnce(Option<&KeyedValues<V>>) -> R) -> R {
        children(self.shared.combined.read().unwrap().as_ref())
    }

    /// Keys in construction order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.shared.keys.iter().map(String::as_str)
    }

    /// Whether the adapter still accepts deliveries.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Deactivate explicitly, releasing every subscription exactly once.
    pub fn deactivate(self) {
        debug!(keys = self.shared.keys.len(), "multi plug deactivated");
        // Drop handles the release.
    }
}

impl<V: Clone + Send + Sync + 'static> std::fmt::Debug for ActiveMultiPlug<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveMultiPlug")
            .field("state", &self.state())
            .field("keys", &self.shared.keys)
            .field("active", &self.is_active())
            .finish()
    }
}

impl<V> Drop for ActiveMultiPlug<V> {
    fn drop(&mut self) {
        self.shared.active.store(false, Ordering::SeqCst);
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
    }
}
