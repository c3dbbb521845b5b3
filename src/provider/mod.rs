//! Provider and scope: how plugs reach the store.
//!
//! A [`Provider`] owns one validated store plus a fresh first-value cache.
//! Plugs receive a [`Scope`], a cheap handle onto both, either explicitly
//! (the preferred capability-injection style) or through the thread-local
//! provider stack via [`Provider::enter`] / [`Scope::current`].

mod provider;

pub use provider::{Provider, Scope};
