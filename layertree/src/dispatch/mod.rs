//! The mutation surface of the engine.
//!
//! [`LayerDispatch`] is the only component that writes to the registry (and,
//! for quick access, the durable store). It never touches the snapshot
//! store: consistency follows from every registry write emitting a
//! synchronous change notification that the snapshot store consumes, so by
//! the time any operation here returns, its full effect is visible in the
//! current snapshot generation.
//!
//! All operations are synchronous and run to completion on the calling
//! thread. Multi-write operations (`set_group_visibility` and friends) are
//! best-effort sequential fan-outs with no rollback - see
//! [`DispatchError::Cascade`].

mod error;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::StaticTree;
use crate::id::{LayerId, SubLayerId};
use crate::registry::{LayerClass, LayerDescriptor, LayerRegistry};
use crate::store::QuickAccessStore;
use crate::tree::{collect_layer_ids_in_group, find_group_config};

pub use error::{DispatchError, DispatchResult};

/// Dispatches cascading mutations against the registry.
///
/// Constructed once at bootstrap with everything it needs; no ambient
/// state. Cheap to share behind a reference.
pub struct LayerDispatch {
    registry: Arc<dyn LayerRegistry>,
    tree: Arc<StaticTree>,
    quick_access: QuickAccessStore,
}

impl LayerDispatch {
    /// Create a dispatcher over a registry, static tree, and quick-access store.
    pub fn new(
        registry: Arc<dyn LayerRegistry>,
        tree: Arc<StaticTree>,
        quick_access: QuickAccessStore,
    ) -> Self {
        Self {
            registry,
            tree,
            quick_access,
        }
    }

    fn descriptor(&self, id: &LayerId) -> DispatchResult<LayerDescriptor> {
        self.registry
            .descriptor(id)
            .ok_or_else(|| DispatchError::UnknownLayer(id.clone()))
    }

    fn require_known(&self, id: &LayerId) -> DispatchResult<()> {
        if self.registry.contains(id) {
            Ok(())
        } else {
            Err(DispatchError::UnknownLayer(id.clone()))
        }
    }

    /// Set a layer's visibility.
    ///
    /// For non-vector layers the active sublayer set is reset alongside the
    /// flag: turning visible restores the full declared catalog, turning
    /// invisible clears it. A layer that becomes visible again therefore
    /// shows all its sublayers by default, never a stale partial set.
    pub fn set_layer_visibility(&self, id: &LayerId, visible: bool) -> DispatchResult<()> {
        let descriptor = self.descriptor(id)?;
        debug!(layer = %id, visible, "setting layer visibility");
        self.registry.set_visible(id, visible)?;

        // Vector layers have no sublayers.
        if !descriptor.vector {
            if visible {
                if !descriptor.all_sub_layers.is_empty() {
                    self.registry
                        .set_visible_sub_layers(id, descriptor.all_sub_layers)?;
                }
            } else {
                self.registry.set_visible_sub_layers(id, Vec::new())?;
            }
        }
        Ok(())
    }

    /// Toggle one sublayer of a layer.
    ///
    /// The current active set is taken to be empty while the parent layer is
    /// hidden - a hidden layer has no current sublayer state to extend. The
    /// resulting set is re-sorted into the declared catalog order before the
    /// write, so the active order always reflects declaration order
    /// regardless of the toggle sequence. Identifiers outside the catalog
    /// are discarded by that sort.
    pub fn set_sub_layer_visibility(
        &self,
        id: &LayerId,
        sub_layer: &SubLayerId,
        visible: bool,
    ) -> DispatchResult<()> {
        let descriptor = self.descriptor(id)?;

        let mut current: HashSet<SubLayerId> = if self.registry.is_visible(id)? {
            self.registry.visible_sub_layers(id)?.into_iter().collect()
        } else {
            HashSet::new()
        };

        if visible {
            current.insert(sub_layer.clone());
        } else {
            current.remove(sub_layer);
        }

        let sorted: Vec<SubLayerId> = descriptor
            .all_sub_layers
            .iter()
            .filter(|s| current.contains(*s))
            .cloned()
            .collect();

        debug!(layer = %id, sub_layer = %sub_layer, visible, active = sorted.len(),
            "setting sublayer visibility");
        self.registry.set_visible_sub_layers(id, sorted)?;
        Ok(())
    }

    /// Replace a layer's active sublayer set.
    ///
    /// `None` is the explicit "show all" shortcut: the full declared catalog
    /// becomes active.
    pub fn set_sub_layers_visible(
        &self,
        id: &LayerId,
        sub_layers: Option<Vec<SubLayerId>>,
    ) -> DispatchResult<()> {
        let descriptor = self.descriptor(id)?;
        let target = sub_layers.unwrap_or(descriptor.all_sub_layers);
        self.registry.set_visible_sub_layers(id, target)?;
        Ok(())
    }

    /// Set the visibility of every layer in a configured group.
    ///
    /// Resolves the group in the static tree and fans out one visibility
    /// write per leaf descendant, nested subgroups included. The fan-out is
    /// best-effort: every write is attempted, failures are collected, and a
    /// single [`DispatchError::Cascade`] reports them afterwards.
    ///
    /// Observers subscribed to snapshot changes see one update per
    /// descendant write, not one per call; by the time this returns, all of
    /// them have been delivered.
    pub fn set_group_visibility(&self, group_id: &LayerId, visible: bool) -> DispatchResult<()> {
        let node = find_group_config(self.tree.roots(), group_id)
            .ok_or_else(|| DispatchError::UnknownGroup(group_id.clone()))?;
        let ids = collect_layer_ids_in_group(Some(node));
        debug!(group = %group_id, visible, layers = ids.len(), "setting group visibility");

        let mut applied = 0;
        let mut failures = Vec::new();
        for id in ids {
            match self.registry.set_visible(&id, visible) {
                Ok(()) => applied += 1,
                Err(error) => failures.push((id, error)),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Cascade { applied, failures })
        }
    }

    /// Hide every layer that is neither `base` nor `system`.
    pub fn set_all_layers_invisible(&self) -> DispatchResult<()> {
        debug!("hiding all non-background, non-system layers");
        for id in self.registry.all_layer_ids() {
            let Some(descriptor) = self.registry.descriptor(&id) else {
                continue;
            };
            if descriptor.class.is_exempt_from_bulk_ops() {
                continue;
            }
            self.registry.set_visible(&id, false)?;
        }
        Ok(())
    }

    /// Switch the active background layer.
    ///
    /// Hides all `base`-classified layers first, then shows the requested
    /// one, so no reader polling one flag at a time can observe two visible
    /// background layers. The target id is validated before anything is
    /// hidden; an unknown id leaves the registry untouched.
    pub fn set_background_layer(&self, id: &LayerId) -> DispatchResult<()> {
        self.require_known(id)?;
        debug!(layer = %id, "switching background layer");

        for candidate in self.registry.all_layer_ids() {
            let is_base = self
                .registry
                .descriptor(&candidate)
                .map(|d| d.class == LayerClass::Base)
                .unwrap_or(false);
            if is_base {
                self.registry.set_visible(&candidate, false)?;
            }
        }
        self.registry.set_visible(id, true)?;
        Ok(())
    }

    /// Set a layer's opacity.
    pub fn set_layer_opacity(&self, id: &LayerId, opacity: f64) -> DispatchResult<()> {
        self.require_known(id)?;
        self.registry.set_opacity(id, opacity)?;
        Ok(())
    }

    /// Set a layer's z-index.
    pub fn set_layer_z_index(&self, id: &LayerId, z_index: i32) -> DispatchResult<()> {
        self.require_known(id)?;
        self.registry.set_z_index(id, z_index)?;
        Ok(())
    }

    /// Set a layer's quick-access flag and persist the full set.
    pub fn set_layer_quick_access(&self, id: &LayerId, quick_access: bool) -> DispatchResult<()> {
        self.require_known(id)?;
        debug!(layer = %id, quick_access, "setting quick access");
        self.registry.set_quick_access(id, quick_access)?;
        self.persist_quick_access();
        Ok(())
    }

    /// Add every currently visible, non-`base`/non-`system` layer to quick
    /// access, then persist once.
    pub fn add_visible_layers_to_quick_access(&self) -> DispatchResult<()> {
        debug!("adding visible layers to quick access");
        for id in self.registry.all_layer_ids() {
            let Some(descriptor) = self.registry.descriptor(&id) else {
                continue;
            };
            if descriptor.class.is_exempt_from_bulk_ops() {
                continue;
            }
            if self.registry.is_visible(&id)? {
                self.registry.set_quick_access(&id, true)?;
            }
        }
        self.persist_quick_access();
        Ok(())
    }

    /// Remove every non-`base`/non-`system` layer from quick access, then
    /// persist once.
    pub fn clear_quick_access(&self) -> DispatchResult<()> {
        debug!("clearing quick access");
        for id in self.registry.all_layer_ids() {
            let Some(descriptor) = self.registry.descriptor(&id) else {
                continue;
            };
            if descriptor.class.is_exempt_from_bulk_ops() {
                continue;
            }
            self.registry.set_quick_access(&id, false)?;
        }
        self.persist_quick_access();
        Ok(())
    }

    /// Recompute the quick-access set from registry flags and write it out.
    ///
    /// Always a full-set write, never a delta. Skipped (with a log line)
    /// when consent is withheld or the store fails; the registry flags stay
    /// authoritative for the session either way.
    fn persist_quick_access(&self) {
        let mut set = BTreeSet::new();
        for id in self.registry.all_layer_ids() {
            if self.registry.quick_access(&id).unwrap_or(false) {
                set.insert(id);
            }
        }
        self.quick_access.persist(&set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerSwitcherConfig, StaticTree};
    use crate::registry::{LayerSeed, MemoryRegistry, RegistryError};
    use crate::store::{ConsentGate, KeyValueStore, MemoryStore, StaticConsent, QUICK_ACCESS_KEY};

    fn static_tree(json: &str) -> Arc<StaticTree> {
        let config = LayerSwitcherConfig::from_json_str(json).unwrap();
        Arc::new(StaticTree::from_config(&config).unwrap())
    }

    struct Fixture {
        dispatch: LayerDispatch,
        registry: Arc<MemoryRegistry>,
        store: Arc<MemoryStore>,
    }

    fn fixture(seeds: Vec<LayerSeed>, tree_json: &str) -> Fixture {
        let registry = Arc::new(MemoryRegistry::from_seeds(seeds));
        let store = Arc::new(MemoryStore::new());
        let quick_access = QuickAccessStore::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            Arc::new(StaticConsent::granted()) as Arc<dyn ConsentGate>,
        );
        let dispatch = LayerDispatch::new(
            Arc::clone(&registry) as Arc<dyn LayerRegistry>,
            static_tree(tree_json),
            quick_access,
        );
        Fixture {
            dispatch,
            registry,
            store,
        }
    }

    const EMPTY_TREE: &str = r#"{ "groups": [] }"#;

    mod layer_visibility {
        use super::*;

        #[test]
        fn test_show_restores_full_catalog() {
            let f = fixture(
                vec![LayerSeed::new("l1").with_sub_layers(["a", "b", "c"])],
                EMPTY_TREE,
            );
            let id = LayerId::new("l1");

            f.dispatch.set_layer_visibility(&id, true).unwrap();
            assert!(f.registry.is_visible(&id).unwrap());
            let expected: Vec<SubLayerId> = vec!["a".into(), "b".into(), "c".into()];
            assert_eq!(f.registry.visible_sub_layers(&id).unwrap(), expected);
        }

        #[test]
        fn test_hide_clears_active_sublayers() {
            let f = fixture(
                vec![LayerSeed::new("l1")
                    .with_sub_layers(["a", "b"])
                    .with_visible(true)],
                EMPTY_TREE,
            );
            let id = LayerId::new("l1");

            f.dispatch.set_layer_visibility(&id, false).unwrap();
            assert!(!f.registry.is_visible(&id).unwrap());
            assert!(f.registry.visible_sub_layers(&id).unwrap().is_empty());
        }

        #[test]
        fn test_vector_layer_sublayers_untouched() {
            let f = fixture(vec![LayerSeed::new("v1").vector()], EMPTY_TREE);
            let id = LayerId::new("v1");

            // Toggling a vector layer only flips the flag.
            f.dispatch.set_layer_visibility(&id, true).unwrap();
            f.dispatch.set_layer_visibility(&id, false).unwrap();
            assert!(!f.registry.is_visible(&id).unwrap());
        }

        #[test]
        fn test_unknown_layer_fails_fast() {
            let f = fixture(vec![], EMPTY_TREE);
            assert!(matches!(
                f.dispatch.set_layer_visibility(&"ghost".into(), true),
                Err(DispatchError::UnknownLayer(_))
            ));
        }
    }

    mod sub_layer_visibility {
        use super::*;

        fn catalog_fixture() -> Fixture {
            fixture(
                vec![LayerSeed::new("l1").with_sub_layers(["a", "b", "c"])],
                EMPTY_TREE,
            )
        }

        fn subs(ids: &[&str]) -> Vec<SubLayerId> {
            ids.iter().map(|s| SubLayerId::from(*s)).collect()
        }

        #[test]
        fn test_toggle_on_hidden_layer_starts_from_empty() {
            let f = catalog_fixture();
            let id = LayerId::new("l1");

            f.dispatch
                .set_sub_layer_visibility(&id, &"b".into(), true)
                .unwrap();
            assert_eq!(f.registry.visible_sub_layers(&id).unwrap(), subs(&["b"]));
        }

        #[test]
        fn test_active_order_is_catalog_order_not_toggle_order() {
            let f = catalog_fixture();
            let id = LayerId::new("l1");
            f.dispatch.set_layer_visibility(&id, true).unwrap();
            f.dispatch
                .set_sub_layers_visible(&id, Some(Vec::new()))
                .unwrap();

            // Toggle in reverse declaration order.
            f.dispatch
                .set_sub_layer_visibility(&id, &"c".into(), true)
                .unwrap();
            f.dispatch
                .set_sub_layer_visibility(&id, &"a".into(), true)
                .unwrap();

            assert_eq!(
                f.registry.visible_sub_layers(&id).unwrap(),
                subs(&["a", "c"])
            );
        }

        #[test]
        fn test_toggle_off_removes_from_set() {
            let f = catalog_fixture();
            let id = LayerId::new("l1");
            f.dispatch.set_layer_visibility(&id, true).unwrap();

            f.dispatch
                .set_sub_layer_visibility(&id, &"b".into(), false)
                .unwrap();
            assert_eq!(
                f.registry.visible_sub_layers(&id).unwrap(),
                subs(&["a", "c"])
            );
        }

        #[test]
        fn test_unknown_sublayer_discarded_by_catalog_sort() {
            let f = catalog_fixture();
            let id = LayerId::new("l1");
            f.dispatch.set_layer_visibility(&id, true).unwrap();

            f.dispatch
                .set_sub_layer_visibility(&id, &"zz".into(), true)
                .unwrap();
            assert_eq!(
                f.registry.visible_sub_layers(&id).unwrap(),
                subs(&["a", "b", "c"])
            );
        }

        #[test]
        fn test_set_sub_layers_visible_exact() {
            let f = catalog_fixture();
            let id = LayerId::new("l1");

            f.dispatch
                .set_sub_layers_visible(&id, Some(subs(&["c", "a"])))
                .unwrap();
            // Explicit sets are trusted as given.
            assert_eq!(
                f.registry.visible_sub_layers(&id).unwrap(),
                subs(&["c", "a"])
            );
        }

        #[test]
        fn test_set_sub_layers_visible_none_means_all() {
            let f = catalog_fixture();
            let id = LayerId::new("l1");

            f.dispatch.set_sub_layers_visible(&id, None).unwrap();
            assert_eq!(
                f.registry.visible_sub_layers(&id).unwrap(),
                subs(&["a", "b", "c"])
            );
        }
    }

    mod group_visibility {
        use super::*;

        const NESTED_TREE: &str = r#"{
            "groups": [
                {
                    "id": "g1",
                    "layers": [{ "id": "l1" }, { "id": "l2" }],
                    "groups": [{ "id": "g2", "layers": [{ "id": "l3" }] }]
                },
                { "id": "g3", "layers": [{ "id": "l4" }] }
            ]
        }"#;

        fn nested_fixture() -> Fixture {
            fixture(
                vec![
                    LayerSeed::new("l1"),
                    LayerSeed::new("l2"),
                    LayerSeed::new("l3"),
                    LayerSeed::new("l4"),
                ],
                NESTED_TREE,
            )
        }

        #[test]
        fn test_group_show_reaches_nested_descendants() {
            let f = nested_fixture();
            f.dispatch.set_group_visibility(&"g1".into(), true).unwrap();

            for id in ["l1", "l2", "l3"] {
                assert!(f.registry.is_visible(&id.into()).unwrap(), "{id} hidden");
            }
            // Layers outside the group are untouched.
            assert!(!f.registry.is_visible(&"l4".into()).unwrap());
        }

        #[test]
        fn test_group_hide_reaches_nested_descendants() {
            let f = nested_fixture();
            for id in ["l1", "l2", "l3", "l4"] {
                f.registry.set_visible(&id.into(), true).unwrap();
            }

            f.dispatch
                .set_group_visibility(&"g1".into(), false)
                .unwrap();
            for id in ["l1", "l2", "l3"] {
                assert!(!f.registry.is_visible(&id.into()).unwrap(), "{id} visible");
            }
            assert!(f.registry.is_visible(&"l4".into()).unwrap());
        }

        #[test]
        fn test_unknown_group_fails_fast() {
            let f = nested_fixture();
            assert!(matches!(
                f.dispatch.set_group_visibility(&"nope".into(), true),
                Err(DispatchError::UnknownGroup(_))
            ));
        }

        #[test]
        fn test_cascade_failure_applies_remaining_writes() {
            // l2 is configured but missing from the registry: its write
            // fails, the others still land, and the error reports both.
            let f = fixture(
                vec![LayerSeed::new("l1"), LayerSeed::new("l3")],
                NESTED_TREE,
            );

            let err = f
                .dispatch
                .set_group_visibility(&"g1".into(), true)
                .unwrap_err();
            match err {
                DispatchError::Cascade { applied, failures } => {
                    assert_eq!(applied, 2);
                    assert_eq!(failures.len(), 1);
                    assert_eq!(failures[0].0.as_str(), "l2");
                    assert!(matches!(failures[0].1, RegistryError::UnknownLayer(_)));
                }
                other => panic!("expected cascade error, got {other:?}"),
            }
            assert!(f.registry.is_visible(&"l1".into()).unwrap());
            assert!(f.registry.is_visible(&"l3".into()).unwrap());
        }
    }

    mod bulk_and_background {
        use super::*;

        fn classified_fixture() -> Fixture {
            fixture(
                vec![
                    LayerSeed::new("bg1")
                        .with_class(LayerClass::Base)
                        .with_visible(true),
                    LayerSeed::new("bg2").with_class(LayerClass::Base),
                    LayerSeed::new("sys").with_class(LayerClass::System).with_visible(true),
                    LayerSeed::new("l1").with_visible(true),
                    LayerSeed::new("l2").with_visible(true),
                ],
                EMPTY_TREE,
            )
        }

        #[test]
        fn test_set_all_layers_invisible_spares_base_and_system() {
            let f = classified_fixture();
            f.dispatch.set_all_layers_invisible().unwrap();

            assert!(f.registry.is_visible(&"bg1".into()).unwrap());
            assert!(f.registry.is_visible(&"sys".into()).unwrap());
            assert!(!f.registry.is_visible(&"l1".into()).unwrap());
            assert!(!f.registry.is_visible(&"l2".into()).unwrap());
        }

        #[test]
        fn test_background_switch_is_mutually_exclusive() {
            let f = classified_fixture();
            f.dispatch.set_background_layer(&"bg2".into()).unwrap();

            assert!(!f.registry.is_visible(&"bg1".into()).unwrap());
            assert!(f.registry.is_visible(&"bg2".into()).unwrap());

            // Switching again keeps exactly one visible.
            f.dispatch.set_background_layer(&"bg1".into()).unwrap();
            assert!(f.registry.is_visible(&"bg1".into()).unwrap());
            assert!(!f.registry.is_visible(&"bg2".into()).unwrap());
        }

        #[test]
        fn test_background_switch_unknown_target_leaves_state_alone() {
            let f = classified_fixture();
            let result = f.dispatch.set_background_layer(&"ghost".into());
            assert!(matches!(result, Err(DispatchError::UnknownLayer(_))));
            // Validated before hiding: bg1 is still visible.
            assert!(f.registry.is_visible(&"bg1".into()).unwrap());
        }

        #[test]
        fn test_set_opacity_and_z_index() {
            let f = classified_fixture();
            f.dispatch.set_layer_opacity(&"l1".into(), 0.25).unwrap();
            f.dispatch.set_layer_z_index(&"l1".into(), 40).unwrap();
            assert_eq!(f.registry.opacity(&"l1".into()).unwrap(), 0.25);
            assert_eq!(f.registry.z_index(&"l1".into()).unwrap(), 40);
        }
    }

    mod quick_access {
        use super::*;

        fn qa_fixture() -> Fixture {
            fixture(
                vec![
                    LayerSeed::new("bg").with_class(LayerClass::Base).with_visible(true),
                    LayerSeed::new("sys").with_class(LayerClass::System).with_visible(true),
                    LayerSeed::new("l1").with_visible(true),
                    LayerSeed::new("l2"),
                ],
                EMPTY_TREE,
            )
        }

        fn persisted(f: &Fixture) -> Vec<String> {
            let raw = f.store.get(QUICK_ACCESS_KEY).unwrap().unwrap_or_default();
            serde_json::from_str(&raw).unwrap_or_default()
        }

        #[test]
        fn test_set_quick_access_persists_full_set() {
            let f = qa_fixture();
            f.dispatch
                .set_layer_quick_access(&"l1".into(), true)
                .unwrap();
            f.dispatch
                .set_layer_quick_access(&"l2".into(), true)
                .unwrap();

            assert!(f.registry.quick_access(&"l1".into()).unwrap());
            assert_eq!(persisted(&f), vec!["l1", "l2"]);
        }

        #[test]
        fn test_unset_quick_access_rewrites_set() {
            let f = qa_fixture();
            f.dispatch
                .set_layer_quick_access(&"l1".into(), true)
                .unwrap();
            f.dispatch
                .set_layer_quick_access(&"l1".into(), false)
                .unwrap();
            assert!(persisted(&f).is_empty());
        }

        #[test]
        fn test_add_visible_layers_skips_base_and_system() {
            let f = qa_fixture();
            f.dispatch.add_visible_layers_to_quick_access().unwrap();

            assert!(f.registry.quick_access(&"l1".into()).unwrap());
            // Hidden, base, and system layers are left out.
            assert!(!f.registry.quick_access(&"l2".into()).unwrap());
            assert!(!f.registry.quick_access(&"bg".into()).unwrap());
            assert!(!f.registry.quick_access(&"sys".into()).unwrap());
            assert_eq!(persisted(&f), vec!["l1"]);
        }

        #[test]
        fn test_clear_quick_access() {
            let f = qa_fixture();
            f.dispatch.add_visible_layers_to_quick_access().unwrap();
            f.dispatch.clear_quick_access().unwrap();

            assert!(!f.registry.quick_access(&"l1".into()).unwrap());
            assert!(persisted(&f).is_empty());
        }

        #[test]
        fn test_consent_withheld_keeps_registry_state_only() {
            let registry = Arc::new(MemoryRegistry::from_seeds([LayerSeed::new("l1")]));
            let store = Arc::new(MemoryStore::new());
            let dispatch = LayerDispatch::new(
                Arc::clone(&registry) as Arc<dyn LayerRegistry>,
                static_tree(EMPTY_TREE),
                QuickAccessStore::new(
                    Arc::clone(&store) as Arc<dyn KeyValueStore>,
                    Arc::new(StaticConsent::withheld()) as Arc<dyn ConsentGate>,
                ),
            );

            dispatch.set_layer_quick_access(&"l1".into(), true).unwrap();
            // Registry flag set, nothing persisted.
            assert!(registry.quick_access(&"l1".into()).unwrap());
            assert_eq!(store.get(QUICK_ACCESS_KEY).unwrap(), None);
        }
    }
}
