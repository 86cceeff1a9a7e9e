//! CLI error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use layertree::app::AppError;
use layertree::config::ConfigError;
use layertree::dispatch::DispatchError;
use layertree::store::StoreError;

/// Errors surfaced to the CLI user.
#[derive(Debug, Error)]
pub enum CliError {
    /// Layer configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An input file could not be parsed.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The durable store could not be opened.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Engine startup failed.
    #[error("engine startup failed: {0}")]
    App(#[from] AppError),

    /// A scripted dispatch operation failed.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}
