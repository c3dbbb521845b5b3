//! The keyed store handed to combinators, and the per-provider first-value
//! cache.
//!
//! A store is built once, then shared read-only by every plug beneath one
//! provider. Entries are streams (`Subject<T>`) or plain values, stored
//! type-erased so the "is this entry actually a stream of the type you
//! asked for" contract stays checkable at activation time.

mod cache;
mod store;

pub use cache::Cache;
pub use store::{Store, StoreBuilder};
