//! Configuration error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::id::LayerId;

/// Errors that can occur while loading or validating the static
/// layer-switcher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The same id appears on more than one node in the configuration tree.
    #[error("duplicate node id in layer configuration: {0}")]
    DuplicateId(LayerId),

    /// The configuration document could not be parsed.
    #[error("failed to parse layer configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
