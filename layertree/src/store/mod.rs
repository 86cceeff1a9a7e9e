//! Durable key-value storage and quick-access persistence.
//!
//! The engine's only durable state is the quick-access favorites set. It is
//! written through a minimal [`KeyValueStore`] capability, gated by a
//! [`ConsentGate`] (the host's functional-storage consent flag). The live
//! registry is always authoritative; the store is consulted exactly once,
//! at startup, to seed the registry's quick-access flags.
//!
//! Two store implementations ship with the crate: [`MemoryStore`] for tests
//! and consent-less sessions, and [`JsonFileStore`] for CLI persistence
//! across runs.

mod file;
mod kv;
mod quick_access;

pub use file::JsonFileStore;
pub use kv::{KeyValueStore, MemoryStore, StoreError, StoreResult};
pub use quick_access::{ConsentGate, QuickAccessStore, StaticConsent, QUICK_ACCESS_KEY};
