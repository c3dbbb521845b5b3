//! The subscriber adapter: bridges stream emissions to re-renders.
//!
//! - [`Plug`] / [`ActivePlug`]: single-stream adapter with a
//!   Pending-to-Ready state machine, hook-style `value()` and
//!   children-as-function `render()`
//! - [`MultiPlug`]: combine-latest over an ordered mapping of named
//!   combinators
//! - [`FirstValue`]: explicit two-state future for the blocking
//!   first-emission fetch, primed by the provider cache

mod first_value;
mod multi;
mod plug;

pub use first_value::FirstValue;
pub use multi::{ActiveMultiPlug, KeyedValues, MultiPlug};
pub use plug::{ActivePlug, Combinator, Plug, PlugState, RenderHost};
