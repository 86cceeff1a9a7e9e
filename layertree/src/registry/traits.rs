//! Core trait and types for the layer registry capability.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{LayerId, SubLayerId};

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by registry implementations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The id does not resolve to a registry entry.
    #[error("unknown layer id: {0}")]
    UnknownLayer(LayerId),
}

/// Classification of a registry entry.
///
/// `Base` layers are background imagery (mutually exclusive visibility),
/// `System` layers are host-internal overlays, `Group` marks a composite
/// layer that carries a sublayer catalog, and everything else is `Normal`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerClass {
    /// Background layer; at most one should be visible at a time.
    Base,
    /// Host-internal layer, exempt from bulk operations.
    System,
    /// An ordinary overlay layer.
    #[default]
    Normal,
    /// A composite layer with sublayers.
    Group,
}

impl LayerClass {
    /// Whether bulk operations (hide-all, quick-access batches) skip this class.
    pub fn is_exempt_from_bulk_ops(self) -> bool {
        matches!(self, LayerClass::Base | LayerClass::System)
    }
}

/// Descriptive, host-declared fields of a registry entry.
///
/// These change only when the host reconfigures the layer, unlike the live
/// state (visibility, active sublayers, ...) which changes constantly.
#[derive(Debug, Clone)]
pub struct LayerDescriptor {
    /// The layer's id.
    pub id: LayerId,
    /// Human-readable caption.
    pub caption: String,
    /// Layer classification.
    pub class: LayerClass,
    /// Minimum zoom at which the layer renders, if bounded.
    pub min_zoom: Option<f64>,
    /// Maximum zoom at which the layer renders, if bounded.
    pub max_zoom: Option<f64>,
    /// The full, ordered sublayer catalog declared for this layer.
    ///
    /// The active sublayer set is always a subsequence of this catalog.
    /// Empty for layers without sublayers.
    pub all_sub_layers: Vec<SubLayerId>,
    /// Whether this is a vector layer. Vector layers never have sublayers.
    pub vector: bool,
}

/// Which live property of a layer changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Visibility flag.
    Visible,
    /// Caption text.
    Caption,
    /// Opacity value.
    Opacity,
    /// Z-index / draw order.
    ZIndex,
    /// Active sublayer list.
    SubLayers,
    /// Quick-access flag.
    QuickAccess,
    /// Load status (e.g. a WMS request failed).
    LoadStatus,
}

/// A property-change notification for one layer.
#[derive(Debug, Clone)]
pub struct PropertyChange {
    /// The layer whose property changed.
    pub layer: LayerId,
    /// Which property changed.
    pub key: PropertyKey,
}

/// Callback invoked synchronously when a subscribed layer's property changes.
pub type ChangeHandler = Arc<dyn Fn(&PropertyChange) + Send + Sync>;

/// Token identifying a change subscription, for unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// The layer registry capability.
///
/// Implementations must deliver change notifications synchronously, on the
/// thread performing the write, after the written state is observable. The
/// engine's consistency contract (a dispatch operation's effects are fully
/// settled in the snapshot store before the operation returns) follows
/// directly from that.
///
/// Setters fail with [`RegistryError::UnknownLayer`] for unresolvable ids;
/// read-only lookups return `Option`/`bool` so callers can probe cheaply.
pub trait LayerRegistry: Send + Sync {
    /// All layer ids currently in the registry, in host order.
    fn all_layer_ids(&self) -> Vec<LayerId>;

    /// Whether the registry holds an entry for `id`.
    fn contains(&self, id: &LayerId) -> bool;

    /// Descriptive fields for `id`, if present.
    fn descriptor(&self, id: &LayerId) -> Option<LayerDescriptor>;

    /// Whether `id` is a vector layer. Unknown ids are not vector layers.
    fn is_vector_layer(&self, id: &LayerId) -> bool;

    /// Current visibility flag.
    fn is_visible(&self, id: &LayerId) -> RegistryResult<bool>;

    /// Set the visibility flag.
    fn set_visible(&self, id: &LayerId, visible: bool) -> RegistryResult<()>;

    /// The currently active, ordered sublayer list.
    fn visible_sub_layers(&self, id: &LayerId) -> RegistryResult<Vec<SubLayerId>>;

    /// Replace the active sublayer list.
    fn set_visible_sub_layers(&self, id: &LayerId, subs: Vec<SubLayerId>) -> RegistryResult<()>;

    /// Current opacity in `0.0..=1.0`.
    fn opacity(&self, id: &LayerId) -> RegistryResult<f64>;

    /// Set the opacity.
    fn set_opacity(&self, id: &LayerId, opacity: f64) -> RegistryResult<()>;

    /// Current z-index.
    fn z_index(&self, id: &LayerId) -> RegistryResult<i32>;

    /// Set the z-index.
    fn set_z_index(&self, id: &LayerId, z_index: i32) -> RegistryResult<()>;

    /// Current quick-access flag.
    fn quick_access(&self, id: &LayerId) -> RegistryResult<bool>;

    /// Set the quick-access flag.
    fn set_quick_access(&self, id: &LayerId, flag: bool) -> RegistryResult<()>;

    /// Current load error, if the layer's source failed to load.
    fn load_error(&self, id: &LayerId) -> RegistryResult<Option<String>>;

    /// Subscribe to property changes of one layer.
    ///
    /// The handler runs synchronously inside every write to that layer.
    fn subscribe(&self, id: &LayerId, handler: ChangeHandler) -> RegistryResult<SubscriptionId>;

    /// Remove a subscription. Unknown tokens are ignored.
    fn unsubscribe(&self, token: SubscriptionId);
}
