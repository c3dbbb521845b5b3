//! # Patchbay
//!
//! A binding layer that connects push-based streams to a declarative
//! component tree: subscribe on activation, re-render the owner on each
//! emission, unsubscribe deterministically on deactivation.
//!
//! ## Streams and stores (the wiring)
//!
//! - `Subject<T>` - a push source, optionally replaying its current value
//! - `Store` - a keyed, read-only map of streams and plain values
//! - `Provider` - owns one store plus a per-provider first-value cache
//!
//! ## Plugs (the adapters)
//!
//! - `Plug<V>` - single-stream adapter with a Pending/Ready state machine,
//!   a hook-style `value()` and a children-as-function `render()`
//! - `MultiPlug<V>` - combine-latest over an ordered mapping of named
//!   combinators
//! - `FirstValue<V>` - explicit two-state future for blocking on a
//!   stream's first emission, served from the provider cache when possible
//!
//! Every configuration error (empty store, missing provider, combinator
//! not selecting a stream) fails synchronously at the point of violation.

pub mod error;
pub mod plug;
pub mod provider;
pub mod store;
pub mod stream;

// Re-export main types for convenience
pub use error::{PlugError, Result};
pub use plug::{
    ActiveMultiPlug, ActivePlug, FirstValue, KeyedValues, MultiPlug, Plug, PlugState, RenderHost,
};
pub use provider::{Provider, Scope};
pub use store::{Cache, Store, StoreBuilder};
pub use stream::{StreamId, Subject, Subscription};
