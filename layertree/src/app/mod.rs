//! Engine bootstrap and lifecycle management.
//!
//! This module provides [`LayerTreeApp`], which performs the full startup
//! sequence in one testable place and owns the wiring between components:
//!
//! 1. Validate the configuration and build the static tree
//! 2. Build the display tree and static lookup map
//! 3. Initialize the snapshot store and subscribe to every layer
//! 4. Seed registry quick-access flags from the durable store (consent-gated)
//! 5. Construct the dispatcher
//!
//! Step ordering matters: the snapshot subscriptions are wired before the
//! quick-access seeding so the seeding itself is observed as ordinary
//! change events. Seeding happens exactly once; afterwards the registry is
//! authoritative and every quick-access mutation re-persists.
//!
//! # Example
//!
//! ```ignore
//! use layertree::app::LayerTreeApp;
//!
//! let app = LayerTreeApp::start(&config, registry, store, consent)?;
//! app.dispatch().set_background_layer(&"osm".into())?;
//! for (id, snapshot) in app.snapshots().iter() {
//!     println!("{id}: visible={}", snapshot.visible);
//! }
//! ```

mod bootstrap;
mod error;

pub use bootstrap::LayerTreeApp;
pub use error::AppError;
