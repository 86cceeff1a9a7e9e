//! LayerTree - layer-tree state synchronization for map clients
//!
//! This library reconciles a statically configured hierarchy of layer groups
//! with the live, mutable state of an externally-owned set of map-layer
//! objects. It produces an immutable, diff-friendly snapshot of that state
//! for UI consumption and exposes a set of cascading mutation operations
//! (toggle a layer, a sublayer, a whole group, switch the background layer,
//! manage a quick-access favorites set) that keep the external layer objects
//! and the derived snapshots consistent at all times.
//!
//! # Architecture
//!
//! ```text
//! configuration ──► config::StaticTree ──► tree::builder ──► display tree
//!                                               │            static lookup
//! registry::LayerRegistry ◄── dispatch::LayerDispatch ◄───── UI actions
//!         │
//!         └── property-change events ──► snapshot::SnapshotStore ──► UI
//! ```
//!
//! The registry is an injected capability: the engine holds no concrete
//! reference to any mapping engine's types, only to the [`registry::LayerRegistry`]
//! trait. Every registry write emits a synchronous change notification, so a
//! dispatch operation's full effect is visible in the snapshot store before
//! the operation returns.
//!
//! # Example
//!
//! ```ignore
//! use layertree::app::LayerTreeApp;
//!
//! let app = LayerTreeApp::start(config, registry, store, consent)?;
//! app.dispatch().set_group_visibility(&"roads".into(), true)?;
//! let snapshots = app.snapshots();
//! ```

pub mod app;
pub mod config;
pub mod dispatch;
pub mod id;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod tree;

/// Library version, sourced from Cargo metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
