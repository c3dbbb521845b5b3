//! Push-based stream primitives.
//!
//! This module provides the stream side of the binding layer:
//! - `Subject<T>`: a push source with optional current-value replay
//! - `Subscription`: scoped release of an observer registration
//! - `StreamId`: process-unique stream identity used by the provider cache

mod subject;

pub use subject::{StreamId, Subject, Subscription};
