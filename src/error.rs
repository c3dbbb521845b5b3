use thiserror::Error;

/// Errors raised by the binding layer.
///
/// Every variant is a configuration error: it is raised synchronously at the
/// point of violation (provider construction, plug activation) and is never
/// retried or swallowed. Runtime behavior of a stream that was wired
/// correctly (silence, late emissions) is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlugError {
    /// The store handed to `Provider::new` has no entries.
    #[error("patchbay: store must contain at least one entry")]
    EmptyStore,

    /// `Scope::current()` was called outside of any `Provider::enter` block.
    #[error("patchbay: no provider is active on this thread")]
    MissingProvider,

    /// A combinator asked the store for a key it does not contain.
    #[error("patchbay: store has no entry named `{key}`")]
    MissingKey { key: String },

    /// The store entry under `key` is not a stream of the requested type.
    #[error("patchbay: store entry `{key}` is not a stream of the requested type")]
    NotAStream { key: String },

    /// The store entry under `key` is not a plain value of the requested type.
    #[error("patchbay: store entry `{key}` is not a value of the requested type")]
    NotAValue { key: String },

    /// A `MultiPlug` was activated without any named combinator.
    #[error("patchbay: multi plug needs at least one named combinator")]
    EmptyBinding,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_key() {
        let err = PlugError::MissingKey {
            key: "ticks".to_string(),
        };
        assert!(err.to_string().contains("`ticks`"));

        let err = PlugError::NotAStream {
            key: "limit".to_string(),
        };
        assert!(err.to_string().contains("`limit`"));
    }
}
