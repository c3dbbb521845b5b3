use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;

use tracing::trace;

use crate::stream::StreamId;

/// Per-provider map from stream identity to the last value that stream
/// emitted.
///
/// An entry exists only after its stream has emitted at least once: plugs
/// write on every delivery, and the blocking first-value path reads to skip
/// re-subscribing for a stream the provider has already seen resolve.
///
/// One cache belongs to exactly one provider instance, so two providers
/// never share entries even for structurally identical stores.
pub struct Cache {
    entries: Mutex<HashMap<StreamId, Box<dyn Any + Send + Sync>>>,
}

impl Cache {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record the latest value seen on `id`.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, id: StreamId, value: T) {
        trace!(stream = ?id, "cache insert");
        self.entries.lock().unwrap().insert(id, Box::new(value));
    }

    /// The last value seen on `id`, if that stream has emitted under this
    /// provider and the stored type matches.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, id: StreamId) -> Option<T> {
        self.entries
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|boxed| boxed.downcast_ref::<T>().cloned())
    }

    /// Whether `id` has a cached value.
    pub fn contains(&self, id: StreamId) -> bool {
        self.entries.lock().unwrap().contains_key(&id)
    }

    /// Number of cached stream identities.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether no stream has emitted yet under this provider.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Subject;

    #[test]
    fn insert_then_get() {
        let cache = Cache::new();
        let subject: Subject<i32> = Subject::new();

        assert!(cache.is_empty());
        assert_eq!(cache.get::<i32>(subject.id()), None);

        cache.insert(subject.id(), 5_i32);
        assert_eq!(cache.get::<i32>(subject.id()), Some(5));
        assert!(cache.contains(subject.id()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn later_insert_replaces_earlier() {
        let cache = Cache::new();
        let subject: Subject<i32> = Subject::new();

        cache.insert(subject.id(), 1_i32);
        cache.insert(subject.id(), 2_i32);
        assert_eq!(cache.get::<i32>(subject.id()), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_streams_have_distinct_entries() {
        let cache = Cache::new();
        let a: Subject<i32> = Subject::new();
        let b: Subject<i32> = Subject::new();

        cache.insert(a.id(), 1_i32);
        assert_eq!(cache.get::<i32>(b.id()), None);
    }
}
