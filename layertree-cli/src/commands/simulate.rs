//! `simulate` command: replay a script of dispatch operations.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Args;
use serde::Deserialize;

use layertree::app::LayerTreeApp;
use layertree::id::{LayerId, SubLayerId};
use layertree::registry::LayerRegistry;
use layertree::store::{ConsentGate, JsonFileStore, KeyValueStore, StaticConsent};

use super::common;
use crate::error::CliError;

/// Arguments for `layertree simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Layer-switcher configuration JSON
    #[arg(long)]
    pub config: PathBuf,

    /// Registry fixture JSON
    #[arg(long)]
    pub registry: PathBuf,

    /// Script of operations to replay (JSON array)
    #[arg(long)]
    pub script: PathBuf,

    /// Durable store file for quick access (defaults to the user data dir)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Skip durable persistence, as if storage consent were withheld
    #[arg(long)]
    pub no_persist: bool,
}

/// One scripted dispatch operation.
///
/// Tag values mirror the dispatcher's operation names.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum ScriptOp {
    SetLayerVisibility { layer: LayerId, visible: bool },
    SetSubLayerVisibility {
        layer: LayerId,
        sub_layer: SubLayerId,
        visible: bool,
    },
    SetSubLayersVisible {
        layer: LayerId,
        #[serde(default)]
        sub_layers: Option<Vec<SubLayerId>>,
    },
    SetGroupVisibility { group: LayerId, visible: bool },
    SetAllLayersInvisible,
    SetBackgroundLayer { layer: LayerId },
    SetLayerOpacity { layer: LayerId, opacity: f64 },
    SetLayerZIndex { layer: LayerId, z_index: i32 },
    SetLayerQuickAccess { layer: LayerId, quick_access: bool },
    AddVisibleLayersToQuickAccess,
    ClearQuickAccess,
}

fn load_script(path: &std::path::Path) -> Result<Vec<ScriptOp>, CliError> {
    let data = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let config = common::load_config(&args.config)?;
    let registry = common::load_registry(&args.registry)?;
    let script = load_script(&args.script)?;

    let store_path = args.store.clone().unwrap_or_else(common::default_store_path);
    let store = Arc::new(JsonFileStore::open(store_path)?) as Arc<dyn KeyValueStore>;
    let consent: Arc<dyn ConsentGate> = if args.no_persist {
        Arc::new(StaticConsent::withheld())
    } else {
        Arc::new(StaticConsent::granted())
    };

    let app = LayerTreeApp::start(
        &config,
        Arc::clone(&registry) as Arc<dyn LayerRegistry>,
        store,
        consent,
    )?;

    // Collect the ids whose snapshot entries get replaced by each operation.
    let changed: Arc<Mutex<Vec<LayerId>>> = Arc::new(Mutex::new(Vec::new()));
    let changed_clone = Arc::clone(&changed);
    app.subscribe(Arc::new(move |_, id| {
        changed_clone.lock().expect("listener lock poisoned").push(id.clone());
    }));

    for (index, op) in script.iter().enumerate() {
        apply(&app, op)?;
        let ids: Vec<String> = changed
            .lock()
            .expect("listener lock poisoned")
            .drain(..)
            .map(|id| id.to_string())
            .collect();
        println!("#{index} {op:?}");
        println!("    changed: {}", if ids.is_empty() { "-".to_string() } else { ids.join(", ") });
    }

    println!();
    println!("Final state:");
    common::print_tree(app.display_tree(), &app.snapshots(), 2);

    Ok(())
}

fn apply(app: &LayerTreeApp, op: &ScriptOp) -> Result<(), CliError> {
    let dispatch = app.dispatch();
    match op {
        ScriptOp::SetLayerVisibility { layer, visible } => {
            dispatch.set_layer_visibility(layer, *visible)?;
        }
        ScriptOp::SetSubLayerVisibility {
            layer,
            sub_layer,
            visible,
        } => {
            dispatch.set_sub_layer_visibility(layer, sub_layer, *visible)?;
        }
        ScriptOp::SetSubLayersVisible { layer, sub_layers } => {
            dispatch.set_sub_layers_visible(layer, sub_layers.clone())?;
        }
        ScriptOp::SetGroupVisibility { group, visible } => {
            dispatch.set_group_visibility(group, *visible)?;
        }
        ScriptOp::SetAllLayersInvisible => {
            dispatch.set_all_layers_invisible()?;
        }
        ScriptOp::SetBackgroundLayer { layer } => {
            dispatch.set_background_layer(layer)?;
        }
        ScriptOp::SetLayerOpacity { layer, opacity } => {
            dispatch.set_layer_opacity(layer, *opacity)?;
        }
        ScriptOp::SetLayerZIndex { layer, z_index } => {
            dispatch.set_layer_z_index(layer, *z_index)?;
        }
        ScriptOp::SetLayerQuickAccess {
            layer,
            quick_access,
        } => {
            dispatch.set_layer_quick_access(layer, *quick_access)?;
        }
        ScriptOp::AddVisibleLayersToQuickAccess => {
            dispatch.add_visible_layers_to_quick_access()?;
        }
        ScriptOp::ClearQuickAccess => {
            dispatch.clear_quick_access()?;
        }
    }
    Ok(())
}
