//! The external layer registry capability.
//!
//! The host mapping engine owns a flat collection of live layer objects with
//! readable/writable properties and per-object change notifications. The
//! engine consumes that collection exclusively through the [`LayerRegistry`]
//! trait, so it holds no concrete reference to any mapping engine's types;
//! an adapter outside this crate implements the trait over the real thing.
//!
//! [`MemoryRegistry`] is the reference implementation, used by the CLI and
//! the test-suite. It delivers change notifications synchronously on the
//! writing thread, which is the contract the rest of the engine relies on:
//! by the time a write returns, every observer has seen it.

mod memory;
mod traits;

pub use memory::{LayerSeed, MemoryRegistry};
pub use traits::{
    ChangeHandler, LayerClass, LayerDescriptor, LayerRegistry, PropertyChange, PropertyKey,
    RegistryError, RegistryResult, SubscriptionId,
};
