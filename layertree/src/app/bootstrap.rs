//! Engine construction and the public surface handed to consumers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::AppError;
use crate::config::{LayerSwitcherConfig, StaticTree};
use crate::dispatch::LayerDispatch;
use crate::id::LayerId;
use crate::registry::{LayerRegistry, SubscriptionId};
use crate::snapshot::{ListenerId, SnapshotListener, SnapshotMap, SnapshotStore};
use crate::store::{ConsentGate, KeyValueStore, QuickAccessStore};
use crate::tree::{build_display_tree, build_static_lookup, DisplayNode, MergedNode};

/// The running layer-tree engine.
///
/// Owns the snapshot subscriptions (released on drop) and exposes the
/// whole public surface: current snapshots, display tree, static lookup,
/// and the dispatcher.
pub struct LayerTreeApp {
    registry: Arc<dyn LayerRegistry>,
    snapshots: SnapshotStore,
    dispatch: LayerDispatch,
    display_tree: Vec<DisplayNode>,
    lookup: Arc<HashMap<LayerId, MergedNode>>,
    tree: Arc<StaticTree>,
    subscriptions: Vec<SubscriptionId>,
}

impl LayerTreeApp {
    /// Run the startup sequence and return the running engine.
    ///
    /// Fails only on configuration errors. Registry drift (configured
    /// layers missing from the registry) prunes nodes with a warning, and
    /// durable-store trouble skips the quick-access seeding.
    pub fn start(
        config: &LayerSwitcherConfig,
        registry: Arc<dyn LayerRegistry>,
        store: Arc<dyn KeyValueStore>,
        consent: Arc<dyn ConsentGate>,
    ) -> Result<Self, AppError> {
        info!("starting layer-tree engine");

        let tree = Arc::new(StaticTree::from_config(config)?);
        let display_tree = build_display_tree(tree.roots(), registry.as_ref());
        let lookup = Arc::new(build_static_lookup(tree.roots(), registry.as_ref()));

        let snapshots = SnapshotStore::new();
        let subscriptions = snapshots.attach(&registry);

        // Wired after the snapshot subscriptions so seeding is observed as
        // ordinary change events.
        let quick_access = QuickAccessStore::new(store, consent);
        if let Some(persisted) = quick_access.load() {
            let mut seeded = 0;
            for id in &persisted {
                if !registry.contains(id) {
                    debug!(layer = %id, "persisted quick-access layer no longer exists");
                    continue;
                }
                match registry.set_quick_access(id, true) {
                    Ok(()) => seeded += 1,
                    Err(error) => warn!(layer = %id, %error, "failed to seed quick access"),
                }
            }
            debug!(seeded, "seeded quick-access flags from durable store");
        }

        let dispatch = LayerDispatch::new(Arc::clone(&registry), Arc::clone(&tree), quick_access);

        info!(
            layers = registry.all_layer_ids().len(),
            configured_nodes = tree.node_count(),
            merged_nodes = lookup.len(),
            "layer-tree engine started"
        );

        Ok(Self {
            registry,
            snapshots,
            dispatch,
            display_tree,
            lookup,
            tree,
            subscriptions,
        })
    }

    /// The current snapshot generation.
    pub fn snapshots(&self) -> SnapshotMap {
        self.snapshots.current()
    }

    /// Register a listener for snapshot-entry replacements.
    pub fn subscribe(&self, listener: SnapshotListener) -> ListenerId {
        self.snapshots.subscribe(listener)
    }

    /// Remove a snapshot listener.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.snapshots.unsubscribe(id);
    }

    /// The display tree for the UI layer.
    pub fn display_tree(&self) -> &[DisplayNode] {
        &self.display_tree
    }

    /// The flat lookup map from id to merged static+live metadata.
    pub fn static_lookup(&self) -> &HashMap<LayerId, MergedNode> {
        &self.lookup
    }

    /// The validated static configuration tree.
    pub fn static_tree(&self) -> &StaticTree {
        &self.tree
    }

    /// The mutation surface.
    pub fn dispatch(&self) -> &LayerDispatch {
        &self.dispatch
    }
}

impl Drop for LayerTreeApp {
    fn drop(&mut self) {
        for token in self.subscriptions.drain(..) {
            self.registry.unsubscribe(token);
        }
    }
}
