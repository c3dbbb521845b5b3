use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{PlugError, Result};
use crate::store::{Cache, Store};

static NEXT_PROVIDER_ID: AtomicUsize = AtomicUsize::new(0);

// Thread-local stack of entered provider scopes.
thread_local! {
    static SCOPE_STACK: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
}

/// Owns one store and the first-value cache scoped to it.
///
/// Construction validates the one precondition the layer has: the store
/// must contain at least one entry. The cache is created fresh per provider
/// instance, so two providers never share cached stream values.
///
/// # Examples
///
/// Explicit scope injection:
///
/// ```
/// use patchbay::{Plug, Provider, Store, Subject};
///
/// let ticks = Subject::behavior(1_u64);
/// let store = Store::builder().stream("ticks", ticks).build();
/// let provider = Provider::new(store).unwrap();
///
/// let plug = Plug::new(|store| store.stream::<u64>("ticks"));
/// let active = plug.activate(&provider.scope()).unwrap();
/// assert_eq!(active.value(), Some(1));
/// ```
///
/// Ambient scope for a subtree:
///
/// ```
/// use patchbay::{Provider, Scope, Store, Subject};
///
/// let store = Store::builder().stream("ticks", Subject::behavior(1_u64)).build();
/// let provider = Provider::new(store).unwrap();
///
/// provider.enter(|| {
///     let scope = Scope::current().unwrap();
///     assert!(scope.store().contains("ticks"));
/// });
/// assert!(Scope::current().is_err());
/// ```
pub struct Provider {
    store: Arc<Store>,
    cache: Arc<Cache>,
    id: usize,
}

impl Provider {
    /// Create a provider over `store`.
    ///
    /// Fails with [`PlugError::EmptyStore`] when the store has no entries.
    pub fn new(store: Store) -> Result<Self> {
        if store.is_empty() {
            return Err(PlugError::EmptyStore);
        }
        let id = NEXT_PROVIDER_ID.fetch_add(1, Ordering::SeqCst);
        debug!(provider = id, entries = store.len(), "provider created");
        Ok(Self {
            store: Arc::new(store),
            cache: Arc::new(Cache::new()),
            id,
        })
    }

    /// A handle onto this provider's store and cache, for explicit
    /// injection into plugs.
    pub fn scope(&self) -> Scope {
        Scope {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            provider_id: self.id,
        }
    }

    /// Run `f` with this provider installed as the current ambient scope on
    /// this thread.
    ///
    /// Nested calls shadow outer providers; [`Scope::current`] resolves to
    /// the innermost one. The stack entry is popped even when `f` panics.
    pub fn enter<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(self.scope());
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// This provider's unique id. Scopes carry it so plugs can detect a
    /// store identity change and rebind.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The first-value cache owned by this provider.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("entries", &self.store.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// A cheap clone-able handle onto one provider's store and cache.
///
/// This is the capability a plug needs to activate: the store to run its
/// combinator against, the cache to record first values in, and the
/// provider id to detect rebinds.
#[derive(Clone)]
pub struct Scope {
    store: Arc<Store>,
    cache: Arc<Cache>,
    provider_id: usize,
}

impl Scope {
    /// The innermost scope entered on this thread.
    ///
    /// Fails with [`PlugError::MissingProvider`] outside of any
    /// [`Provider::enter`] block. There is deliberately no global fallback:
    /// using the layer without a provider is a configuration error, not an
    /// empty default.
    pub fn current() -> Result<Scope> {
        SCOPE_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .cloned()
                .ok_or(PlugError::MissingProvider)
        })
    }

    /// The shared read-only store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The owning provider's first-value cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub(crate) fn cache_arc(&self) -> Arc<Cache> {
        Arc::clone(&self.cache)
    }

    /// Id of the provider this scope belongs to.
    pub fn provider_id(&self) -> usize {
        self.provider_id
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("provider", &self.provider_id)
            .finish()
    }
}
