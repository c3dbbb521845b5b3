use std::any::Any;
use std::collections::HashMap;

use crate::error::{PlugError, Result};
use crate::stream::Subject;

enum Entry {
    Stream(Box<dyn Any + Send + Sync>),
    Value(Box<dyn Any + Send + Sync>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Stream(_) => "stream",
            Entry::Value(_) => "value",
        }
    }
}

/// Immutable keyed map of streams and plain values, shared read-only by
/// every plug beneath one provider.
///
/// Accessors are typed and fail synchronously when the contract is
/// violated: a missing key, or an entry that is not what the caller asked
/// for. Combinators are expected to surface these errors unchanged, which
/// is what makes plug activation fail fast on a mis-wired store.
///
/// # Examples
///
/// ```
/// use patchbay::{Store, Subject};
///
/// let ticks: Subject<u64> = Subject::behavior(0);
/// let store = Store::builder()
///     .stream("ticks", ticks)
///     .value("label", "uptime".to_string())
///     .build();
///
/// assert!(store.stream::<u64>("ticks").is_ok());
/// assert_eq!(store.value::<String>("label").unwrap(), "uptime");
/// assert!(store.stream::<u64>("label").is_err());
/// ```
pub struct Store {
    entries: HashMap<String, Entry>,
}

impl Store {
    /// Start building a store.
    pub fn builder() -> StoreBuilder {
        StoreBuilder {
            entries: HashMap::new(),
        }
    }

    /// Look up a stream entry, cloning the subject handle.
    ///
    /// Fails with [`PlugError::MissingKey`] for an absent key and
    /// [`PlugError::NotAStream`] when the entry is a plain value or a
    /// stream of a different element type.
    pub fn stream<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Result<Subject<T>> {
        match self.entries.get(key) {
            None => Err(PlugError::MissingKey {
                key: key.to_string(),
            }),
            Some(Entry::Stream(boxed)) => boxed
                .downcast_ref::<Subject<T>>()
                .cloned()
                .ok_or_else(|| PlugError::NotAStream {
                    key: key.to_string(),
                }),
            Some(Entry::Value(_)) => Err(PlugError::NotAStream {
                key: key.to_string(),
            }),
        }
    }

    /// Look up a plain value entry, cloning it out.
    pub fn value<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Result<T> {
        match self.entries.get(key) {
            None => Err(PlugError::MissingKey {
                key: key.to_string(),
            }),
            Some(Entry::Value(boxed)) => {
                boxed
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or_else(|| PlugError::NotAValue {
                        key: key.to_string(),
                    })
            }
            Some(Entry::Stream(_)) => Err(PlugError::NotAValue {
                key: key.to_string(),
            }),
        }
    }

    /// Whether the store contains an entry under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entry keys (unordered).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (key, entry) in &self.entries {
            map.entry(key, &entry.kind());
        }
        map.finish()
    }
}

/// Builder for [`Store`]. Later entries under the same key replace earlier
/// ones.
pub struct StoreBuilder {
    entries: HashMap<String, Entry>,
}

impl StoreBuilder {
    /// Add a stream entry.
    pub fn stream<T: Clone + Send + Sync + 'static>(
        mut self,
        key: impl Into<String>,
        subject: Subject<T>,
    ) -> Self {
        self.entries
            .insert(key.into(), Entry::Stream(Box::new(subject)));
        self
    }

    /// Add a plain value entry.
    pub fn value<T: Clone + Send + Sync + 'static>(
        mut self,
        key: impl Into<String>,
        value: T,
    ) -> Self {
        self.entries
            .insert(key.into(), Entry::Value(Box::new(value)));
        self
    }

    /// Finish building.
    pub fn build(self) -> Store {
        Store {
            entries: self.entries,
        }
    }
}
