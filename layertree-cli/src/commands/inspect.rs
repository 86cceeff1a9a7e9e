//! `inspect` command: print the merged tree and current snapshots.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use layertree::app::LayerTreeApp;
use layertree::registry::LayerRegistry;
use layertree::store::{ConsentGate, KeyValueStore, MemoryStore, StaticConsent};

use super::common;
use crate::error::CliError;

/// Arguments for `layertree inspect`.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Layer-switcher configuration JSON
    #[arg(long)]
    pub config: PathBuf,

    /// Registry fixture JSON
    #[arg(long)]
    pub registry: PathBuf,
}

/// Run the inspect command.
///
/// Uses a volatile store: inspecting never touches durable state.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let config = common::load_config(&args.config)?;
    let registry = common::load_registry(&args.registry)?;

    let app = LayerTreeApp::start(
        &config,
        Arc::clone(&registry) as Arc<dyn LayerRegistry>,
        Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>,
        Arc::new(StaticConsent::withheld()) as Arc<dyn ConsentGate>,
    )?;

    let snapshots = app.snapshots();

    println!("Layer tree ({} configured nodes):", app.static_tree().node_count());
    common::print_tree(app.display_tree(), &snapshots, 2);

    println!();
    println!("Snapshots ({} layers):", snapshots.len());
    let mut ids: Vec<_> = snapshots.keys().collect();
    ids.sort();
    for id in ids {
        let snapshot = &snapshots[id];
        println!(
            "  {id}: visible={} opacity={} z={} quickAccess={}{}",
            snapshot.visible,
            snapshot.opacity,
            snapshot.z_index,
            snapshot.quick_access,
            snapshot
                .load_error
                .as_deref()
                .map(|e| format!(" loadError={e}"))
                .unwrap_or_default(),
        );
    }

    Ok(())
}
