//! Dispatcher error types.

use thiserror::Error;

use crate::id::LayerId;
use crate::registry::RegistryError;

/// Result type for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors that can occur while dispatching a mutation.
///
/// Unresolvable ids fail fast: handing the dispatcher an id the registry
/// does not know is a programming or configuration error, never silently
/// ignored. Configuration-vs-registry drift is tolerated earlier, during
/// tree building, where the offending node is pruned.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The layer id does not resolve in the registry.
    #[error("unknown layer id: {0}")]
    UnknownLayer(LayerId),

    /// The group id does not resolve in the static configuration tree.
    #[error("unknown group id: {0}")]
    UnknownGroup(LayerId),

    /// A registry write failed mid-operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// One or more writes within a multi-write cascade failed.
    ///
    /// No rollback is performed: already-applied writes stand, and the
    /// failure is reported once after all writes were attempted.
    #[error("group cascade partially applied: {applied} writes succeeded, {} failed", failures.len())]
    Cascade {
        /// Number of writes that succeeded.
        applied: usize,
        /// The failing layer ids with their errors.
        failures: Vec<(LayerId, RegistryError)>,
    },
}
