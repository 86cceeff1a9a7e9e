//! The snapshot store and its change-event wiring.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::model::{LayerSnapshot, SnapshotMap};
use crate::id::LayerId;
use crate::registry::{LayerRegistry, SubscriptionId};

/// Callback invoked after a snapshot entry is replaced.
///
/// Receives the new map generation and the id whose entry changed.
pub type SnapshotListener = Arc<dyn Fn(&SnapshotMap, &LayerId) + Send + Sync>;

/// Token identifying a snapshot listener, for unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Shared handle to the snapshot mapping.
///
/// Cloning is cheap; all clones observe the same state. The store is only
/// ever written by its own change-event handler - everyone else reads.
#[derive(Clone)]
pub struct SnapshotStore {
    map: Arc<RwLock<SnapshotMap>>,
    listeners: Arc<RwLock<Vec<(ListenerId, SnapshotListener)>>>,
    next_listener: Arc<AtomicU64>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            map: Arc::new(RwLock::new(Arc::new(HashMap::new()))),
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_listener: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The current map generation.
    pub fn current(&self) -> SnapshotMap {
        Arc::clone(&self.map.read())
    }

    /// Register a listener for entry replacements.
    pub fn subscribe(&self, listener: SnapshotListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener. Unknown tokens are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.write().retain(|(l, _)| *l != id);
    }

    /// Initialize from the registry and wire up change notifications.
    ///
    /// Synchronously computes one snapshot per layer currently in the
    /// registry, then subscribes to property changes of every one of them.
    /// Returns the subscription tokens so the caller owns their lifetime.
    /// Registry membership is assumed static afterwards; a membership
    /// change is a full re-initialization, not an incremental update.
    pub fn attach(&self, registry: &Arc<dyn LayerRegistry>) -> Vec<SubscriptionId> {
        let ids = registry.all_layer_ids();

        let mut initial = HashMap::with_capacity(ids.len());
        for id in &ids {
            match LayerSnapshot::read_from(registry.as_ref(), id) {
                Ok(snapshot) => {
                    initial.insert(id.clone(), Arc::new(snapshot));
                }
                Err(error) => warn!(layer = %id, %error, "failed to snapshot layer at startup"),
            }
        }
        debug!(layers = initial.len(), "snapshot store initialized");
        *self.map.write() = Arc::new(initial);

        let mut tokens = Vec::with_capacity(ids.len());
        for id in ids {
            let store = self.clone();
            let registry_for_handler = Arc::clone(registry);
            let subscription = registry.subscribe(
                &id,
                Arc::new(move |change| {
                    store.refresh(registry_for_handler.as_ref(), &change.layer);
                }),
            );
            match subscription {
                Ok(token) => tokens.push(token),
                Err(error) => warn!(layer = %id, %error, "failed to subscribe to layer changes"),
            }
        }
        tokens
    }

    /// Recompute the snapshot for one layer and publish a new generation.
    ///
    /// Every entry except `id` is carried over by reference. Listeners run
    /// after the new generation is published, outside any lock held by the
    /// store, on the calling (writing) thread.
    pub fn refresh(&self, registry: &dyn LayerRegistry, id: &LayerId) {
        let snapshot = match LayerSnapshot::read_from(registry, id) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(layer = %id, %error, "failed to refresh snapshot");
                return;
            }
        };

        let new_map = {
            let mut guard = self.map.write();
            let mut next: HashMap<LayerId, Arc<LayerSnapshot>> = (**guard).clone();
            next.insert(id.clone(), Arc::new(snapshot));
            let next = Arc::new(next);
            *guard = Arc::clone(&next);
            next
        };

        let listeners: Vec<SnapshotListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&new_map, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{LayerSeed, MemoryRegistry};
    use std::sync::atomic::AtomicUsize;

    fn attach_store(registry: MemoryRegistry) -> (SnapshotStore, Arc<dyn LayerRegistry>) {
        let registry: Arc<dyn LayerRegistry> = Arc::new(registry);
        let store = SnapshotStore::new();
        store.attach(&registry);
        (store, registry)
    }

    #[test]
    fn test_initialization_snapshots_every_layer() {
        let (store, _registry) = attach_store(MemoryRegistry::from_seeds([
            LayerSeed::new("a"),
            LayerSeed::new("b").with_visible(true),
        ]));

        let map = store.current();
        assert_eq!(map.len(), 2);
        assert!(!map["a"].visible);
        assert!(map["b"].visible);
    }

    #[test]
    fn test_registry_write_updates_snapshot_before_returning() {
        let (store, registry) = attach_store(MemoryRegistry::from_seeds([LayerSeed::new("a")]));

        registry.set_visible(&"a".into(), true).unwrap();
        // No polling, no settling: the write has already propagated.
        assert!(store.current()["a"].visible);
    }

    #[test]
    fn test_structural_sharing_on_single_change() {
        let (store, registry) = attach_store(MemoryRegistry::from_seeds([
            LayerSeed::new("a"),
            LayerSeed::new("b"),
            LayerSeed::new("c"),
        ]));

        let before = store.current();
        registry.set_visible(&"b".into(), true).unwrap();
        let after = store.current();

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(Arc::ptr_eq(&before["a"], &after["a"]));
        assert!(Arc::ptr_eq(&before["c"], &after["c"]));
        assert!(!Arc::ptr_eq(&before["b"], &after["b"]));
    }

    #[test]
    fn test_listener_sees_changed_id_and_new_generation() {
        let (store, registry) = attach_store(MemoryRegistry::from_seeds([LayerSeed::new("a")]));

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        store.subscribe(Arc::new(move |map, changed| {
            assert_eq!(changed.as_str(), "a");
            assert!(map["a"].visible);
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        registry.set_visible(&"a".into(), true).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_can_read_store_reentrantly() {
        let (store, registry) = attach_store(MemoryRegistry::from_seeds([LayerSeed::new("a")]));

        let store_clone = store.clone();
        let observed = Arc::new(AtomicUsize::new(0));
        let observed_clone = Arc::clone(&observed);
        store.subscribe(Arc::new(move |_, _| {
            // current() must not deadlock inside a notification.
            let _ = store_clone.current();
            observed_clone.fetch_add(1, Ordering::SeqCst);
        }));

        registry.set_visible(&"a".into(), true).unwrap();
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_listener() {
        let (store, registry) = attach_store(MemoryRegistry::from_seeds([LayerSeed::new("a")]));

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let token = store.subscribe(Arc::new(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        store.unsubscribe(token);

        registry.set_visible(&"a".into(), true).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_host_side_caption_change_flows_through() {
        let registry = Arc::new(MemoryRegistry::from_seeds([
            LayerSeed::new("a").with_caption("Before")
        ]));
        let dyn_registry: Arc<dyn LayerRegistry> = Arc::clone(&registry) as Arc<dyn LayerRegistry>;
        let store = SnapshotStore::new();
        store.attach(&dyn_registry);

        registry.set_caption(&"a".into(), "After").unwrap();
        assert_eq!(store.current()["a"].caption, "After");
    }
}
