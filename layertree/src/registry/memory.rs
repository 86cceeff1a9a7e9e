//! In-memory layer registry.
//!
//! The reference [`LayerRegistry`] implementation. It backs the CLI and the
//! test-suite, and doubles as a template for adapters over real mapping
//! engines. Entries live in a [`DashMap`] keyed by layer id; a separate
//! insertion-order list preserves host ordering for [`all_layer_ids`].
//!
//! Change notifications are delivered synchronously: every setter mutates
//! the entry, releases the entry guard, and then invokes the handlers
//! subscribed to that layer on the calling thread. Handlers may read any
//! registry state; they must not be held across a write to the same layer.
//!
//! [`all_layer_ids`]: LayerRegistry::all_layer_ids

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::traits::{
    ChangeHandler, LayerClass, LayerDescriptor, LayerRegistry, PropertyChange, PropertyKey,
    RegistryError, RegistryResult, SubscriptionId,
};
use crate::id::{LayerId, SubLayerId};

/// Seed describing one layer for [`MemoryRegistry`] construction.
///
/// Deserializable so registry fixtures can be loaded from JSON. Field names
/// use the host's camelCase layer-property names (`layerType`,
/// `allSubLayers`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSeed {
    /// Stable layer id.
    pub id: LayerId,

    /// Caption; defaults to the id.
    #[serde(default)]
    pub caption: Option<String>,

    /// Layer classification.
    #[serde(default, rename = "layerType")]
    pub class: LayerClass,

    /// Initial visibility.
    #[serde(default)]
    pub visible: bool,

    /// Initial opacity.
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    /// Initial z-index.
    #[serde(default)]
    pub z_index: i32,

    /// Full declared sublayer catalog, in declaration order.
    #[serde(default)]
    pub all_sub_layers: Vec<SubLayerId>,

    /// Whether this is a vector layer.
    #[serde(default)]
    pub vector: bool,

    /// Minimum zoom bound.
    #[serde(default)]
    pub min_zoom: Option<f64>,

    /// Maximum zoom bound.
    #[serde(default)]
    pub max_zoom: Option<f64>,

    /// Initial quick-access flag.
    #[serde(default)]
    pub quick_access: bool,
}

fn default_opacity() -> f64 {
    1.0
}

impl LayerSeed {
    /// Create a seed with the given id and defaults for everything else.
    pub fn new(id: impl Into<LayerId>) -> Self {
        Self {
            id: id.into(),
            caption: None,
            class: LayerClass::Normal,
            visible: false,
            opacity: 1.0,
            z_index: 0,
            all_sub_layers: Vec::new(),
            vector: false,
            min_zoom: None,
            max_zoom: None,
            quick_access: false,
        }
    }

    /// Set the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the classification.
    pub fn with_class(mut self, class: LayerClass) -> Self {
        self.class = class;
        self
    }

    /// Set the declared sublayer catalog.
    pub fn with_sub_layers<S: Into<SubLayerId>>(
        mut self,
        subs: impl IntoIterator<Item = S>,
    ) -> Self {
        self.all_sub_layers = subs.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the layer as a vector layer.
    pub fn vector(mut self) -> Self {
        self.vector = true;
        self
    }

    /// Set the initial visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set the zoom bounds.
    pub fn with_zoom_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_zoom = Some(min);
        self.max_zoom = Some(max);
        self
    }
}

/// One live registry entry.
#[derive(Debug, Clone)]
struct LayerEntry {
    caption: String,
    class: LayerClass,
    min_zoom: Option<f64>,
    max_zoom: Option<f64>,
    all_sub_layers: Vec<SubLayerId>,
    vector: bool,

    visible: bool,
    opacity: f64,
    z_index: i32,
    active_sub_layers: Vec<SubLayerId>,
    quick_access: bool,
    load_error: Option<String>,
}

/// In-memory [`LayerRegistry`] implementation.
pub struct MemoryRegistry {
    entries: DashMap<LayerId, LayerEntry>,
    order: RwLock<Vec<LayerId>>,
    handlers: RwLock<Vec<(SubscriptionId, LayerId, ChangeHandler)>>,
    next_token: AtomicU64,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            order: RwLock::new(Vec::new()),
            handlers: RwLock::new(Vec::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Create a registry from layer seeds, preserving seed order.
    pub fn from_seeds(seeds: impl IntoIterator<Item = LayerSeed>) -> Self {
        let registry = Self::new();
        for seed in seeds {
            registry.insert(seed);
        }
        registry
    }

    /// Insert (or replace) a layer from a seed.
    ///
    /// A layer seeded visible starts with its full catalog active; a hidden
    /// layer starts with no active sublayers.
    pub fn insert(&self, seed: LayerSeed) {
        let caption = seed.caption.unwrap_or_else(|| seed.id.to_string());
        let active = if seed.visible {
            seed.all_sub_layers.clone()
        } else {
            Vec::new()
        };
        let entry = LayerEntry {
            caption,
            class: seed.class,
            min_zoom: seed.min_zoom,
            max_zoom: seed.max_zoom,
            all_sub_layers: seed.all_sub_layers,
            vector: seed.vector,
            visible: seed.visible,
            opacity: seed.opacity,
            z_index: seed.z_index,
            active_sub_layers: active,
            quick_access: seed.quick_access,
            load_error: None,
        };
        if self.entries.insert(seed.id.clone(), entry).is_none() {
            self.order.write().push(seed.id);
        }
    }

    /// Host-side caption change (e.g. the admin renamed a service).
    ///
    /// Not part of [`LayerRegistry`]: the engine never writes captions, but
    /// the host may, and observers must see the change.
    pub fn set_caption(&self, id: &LayerId, caption: impl Into<String>) -> RegistryResult<()> {
        self.update(id, PropertyKey::Caption, |e| e.caption = caption.into())
    }

    /// Host-side load-status change (e.g. a WMS request failed).
    pub fn set_load_error(&self, id: &LayerId, error: Option<String>) -> RegistryResult<()> {
        self.update(id, PropertyKey::LoadStatus, |e| e.load_error = error)
    }

    /// Number of layers in the registry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn read<T>(&self, id: &LayerId, f: impl FnOnce(&LayerEntry) -> T) -> RegistryResult<T> {
        self.entries
            .get(id)
            .map(|e| f(&e))
            .ok_or_else(|| RegistryError::UnknownLayer(id.clone()))
    }

    /// Mutate an entry, then notify that layer's subscribers.
    ///
    /// The entry guard is released before any handler runs, so handlers can
    /// read back the registry without deadlocking on the entry's shard.
    fn update(
        &self,
        id: &LayerId,
        key: PropertyKey,
        f: impl FnOnce(&mut LayerEntry),
    ) -> RegistryResult<()> {
        {
            let mut entry = self
                .entries
                .get_mut(id)
                .ok_or_else(|| RegistryError::UnknownLayer(id.clone()))?;
            f(&mut entry);
        }
        self.notify(id, key);
        Ok(())
    }

    fn notify(&self, id: &LayerId, key: PropertyKey) {
        let matching: Vec<ChangeHandler> = self
            .handlers
            .read()
            .iter()
            .filter(|(_, layer, _)| layer == id)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        let change = PropertyChange {
            layer: id.clone(),
            key,
        };
        for handler in matching {
            handler(&change);
        }
    }
}

impl LayerRegistry for MemoryRegistry {
    fn all_layer_ids(&self) -> Vec<LayerId> {
        self.order.read().clone()
    }

    fn contains(&self, id: &LayerId) -> bool {
        self.entries.contains_key(id)
    }

    fn descriptor(&self, id: &LayerId) -> Option<LayerDescriptor> {
        self.entries.get(id).map(|e| LayerDescriptor {
            id: id.clone(),
            caption: e.caption.clone(),
            class: e.class,
            min_zoom: e.min_zoom,
            max_zoom: e.max_zoom,
            all_sub_layers: e.all_sub_layers.clone(),
            vector: e.vector,
        })
    }

    fn is_vector_layer(&self, id: &LayerId) -> bool {
        self.entries.get(id).map(|e| e.vector).unwrap_or(false)
    }

    fn is_visible(&self, id: &LayerId) -> RegistryResult<bool> {
        self.read(id, |e| e.visible)
    }

    fn set_visible(&self, id: &LayerId, visible: bool) -> RegistryResult<()> {
        self.update(id, PropertyKey::Visible, |e| e.visible = visible)
    }

    fn visible_sub_layers(&self, id: &LayerId) -> RegistryResult<Vec<SubLayerId>> {
        self.read(id, |e| e.active_sub_layers.clone())
    }

    fn set_visible_sub_layers(&self, id: &LayerId, subs: Vec<SubLayerId>) -> RegistryResult<()> {
        self.update(id, PropertyKey::SubLayers, |e| e.active_sub_layers = subs)
    }

    fn opacity(&self, id: &LayerId) -> RegistryResult<f64> {
        self.read(id, |e| e.opacity)
    }

    fn set_opacity(&self, id: &LayerId, opacity: f64) -> RegistryResult<()> {
        self.update(id, PropertyKey::Opacity, |e| e.opacity = opacity)
    }

    fn z_index(&self, id: &LayerId) -> RegistryResult<i32> {
        self.read(id, |e| e.z_index)
    }

    fn set_z_index(&self, id: &LayerId, z_index: i32) -> RegistryResult<()> {
        self.update(id, PropertyKey::ZIndex, |e| e.z_index = z_index)
    }

    fn quick_access(&self, id: &LayerId) -> RegistryResult<bool> {
        self.read(id, |e| e.quick_access)
    }

    fn set_quick_access(&self, id: &LayerId, flag: bool) -> RegistryResult<()> {
        self.update(id, PropertyKey::QuickAccess, |e| e.quick_access = flag)
    }

    fn load_error(&self, id: &LayerId) -> RegistryResult<Option<String>> {
        self.read(id, |e| e.load_error.clone())
    }

    fn subscribe(&self, id: &LayerId, handler: ChangeHandler) -> RegistryResult<SubscriptionId> {
        if !self.contains(id) {
            return Err(RegistryError::UnknownLayer(id.clone()));
        }
        let token = SubscriptionId(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((token, id.clone(), handler));
        Ok(token)
    }

    fn unsubscribe(&self, token: SubscriptionId) {
        self.handlers.write().retain(|(t, _, _)| *t != token);
    }
}
