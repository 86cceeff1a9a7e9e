//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use layertree::config::LayerSwitcherConfig;
use layertree::registry::{LayerSeed, MemoryRegistry};
use layertree::snapshot::SnapshotMap;
use layertree::tree::DisplayNode;

use crate::error::CliError;

/// Registry fixture document: the layers the host would own at runtime.
#[derive(Debug, Deserialize)]
pub struct RegistryFixture {
    /// Layer seeds in host order.
    pub layers: Vec<LayerSeed>,
}

/// Load the layer-switcher configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<LayerSwitcherConfig, CliError> {
    Ok(LayerSwitcherConfig::from_file(path)?)
}

/// Load a registry fixture from a JSON file and build an in-memory registry.
pub fn load_registry(path: &Path) -> Result<Arc<MemoryRegistry>, CliError> {
    let data = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let fixture: RegistryFixture =
        serde_json::from_str(&data).map_err(|source| CliError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(layers = fixture.layers.len(), "loaded registry fixture");
    Ok(Arc::new(MemoryRegistry::from_seeds(fixture.layers)))
}

/// Default durable-store location under the user's data directory.
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("layertree")
        .join("store.json")
}

/// Print a display tree with visibility markers from the snapshots.
pub fn print_tree(nodes: &[DisplayNode], snapshots: &SnapshotMap, indent: usize) {
    for node in nodes {
        let marker = snapshots
            .get(&node.id)
            .map(|s| if s.visible { "[x]" } else { "[ ]" })
            .unwrap_or("   ");
        println!(
            "{:indent$}{marker} {} ({})",
            "",
            node.name,
            node.id,
            indent = indent
        );
        if let Some(snapshot) = snapshots.get(&node.id) {
            if !snapshot.visible_sub_layers.is_empty() {
                let subs: Vec<&str> = snapshot
                    .visible_sub_layers
                    .iter()
                    .map(|s| s.as_str())
                    .collect();
                println!("{:indent$}    sublayers: {}", "", subs.join(", "), indent = indent);
            }
        }
        print_tree(&node.children, snapshots, indent + 2);
    }
}
