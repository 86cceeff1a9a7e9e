//! Static layer-switcher configuration.
//!
//! The configuration is a nested hierarchy of groups, each carrying layer
//! children and subgroup children. It is deserialized from JSON (the wire
//! format the admin tool produces), validated, and converted once into a
//! [`StaticTree`] of tagged [`StaticNode`] variants. Whether a node is a
//! group is decided here, at load time, from the presence of child
//! collections - readers never have to sniff the structure again.
//!
//! The tree is immutable after load; a configuration change is a full
//! re-initialization of the engine, not an incremental update.

mod error;
mod model;

pub use error::ConfigError;
pub use model::{
    GroupConfig, LayerConfig, LayerSwitcherConfig, NodeMeta, StaticNode, StaticTree,
};
