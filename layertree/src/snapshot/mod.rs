//! Derived per-layer display state, kept in sync with the registry.
//!
//! The snapshot store maintains an immutable mapping from layer id to a
//! display-ready [`LayerSnapshot`]. On every registry change notification
//! it replaces exactly one entry and publishes a new map generation; every
//! untouched entry is carried over by reference, so downstream consumers
//! can detect which rows changed with a pointer comparison and skip
//! re-rendering everything else.
//!
//! Listeners run synchronously inside the registry write that triggered the
//! update. Combined with the registry's synchronous notification contract,
//! this means a dispatch operation never returns before its full effect is
//! visible in the current snapshot generation.

mod model;
mod store;

pub use model::{LayerSnapshot, SnapshotMap};
pub use store::{ListenerId, SnapshotListener, SnapshotStore};
