//! Tree building and group resolution.
//!
//! The tree builder merges the static configuration against the registry's
//! current contents, producing two read-only views consumed by the UI and
//! the dispatcher:
//!
//! - the **display tree** ([`DisplayNode`]) - what the layer switcher renders;
//! - the **static lookup map** ([`MergedNode`] per id) - flat merged
//!   static+live metadata.
//!
//! Both are rebuilt in full on configuration change, never on individual
//! property changes (that is the snapshot store's job). The group resolver
//! offers pure recursive lookups over the static tree for the cascading
//! group operations.

mod builder;
mod model;
mod resolver;

pub use builder::{build_display_tree, build_static_lookup};
pub use model::{DisplayNode, MergedKind, MergedNode};
pub use resolver::{collect_layer_ids_in_group, find_group_config};
