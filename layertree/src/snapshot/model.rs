//! Snapshot record type.

use std::collections::HashMap;
use std::sync::Arc;

use crate::id::{LayerId, SubLayerId};
use crate::registry::{LayerRegistry, RegistryResult};

/// Display-ready state of one layer, derived from its registry entry.
///
/// Snapshots are immutable: a change produces a replacement record, never a
/// partial mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSnapshot {
    /// Visibility flag.
    pub visible: bool,
    /// Caption text.
    pub caption: String,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Z-index / draw order.
    pub z_index: i32,
    /// Active sublayers. Empty whenever the layer is hidden - a hidden
    /// layer has no current sublayer state.
    pub visible_sub_layers: Vec<SubLayerId>,
    /// Quick-access flag.
    pub quick_access: bool,
    /// Load error reported by the layer's source, if any.
    pub load_error: Option<String>,
}

impl LayerSnapshot {
    /// Derive a snapshot from a layer's current registry state.
    pub fn read_from(registry: &dyn LayerRegistry, id: &LayerId) -> RegistryResult<Self> {
        let visible = registry.is_visible(id)?;
        let visible_sub_layers = if visible {
            registry.visible_sub_layers(id)?
        } else {
            Vec::new()
        };
        let caption = registry
            .descriptor(id)
            .map(|d| d.caption)
            .unwrap_or_else(|| id.to_string());
        Ok(Self {
            visible,
            caption,
            opacity: registry.opacity(id)?,
            z_index: registry.z_index(id)?,
            visible_sub_layers,
            quick_access: registry.quick_access(id)?,
            load_error: registry.load_error(id)?,
        })
    }
}

/// One immutable generation of the snapshot mapping.
///
/// Cloning the outer `Arc` is free; building the next generation clones the
/// `HashMap` of entry `Arc`s, so every entry except the replaced one stays
/// pointer-identical across generations.
pub type SnapshotMap = Arc<HashMap<LayerId, Arc<LayerSnapshot>>>;
