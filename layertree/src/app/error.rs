//! Engine bootstrap error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during engine startup.
///
/// Only configuration problems are fatal: a missing or drifted registry
/// layer is pruned, failed snapshot subscriptions are logged, and durable-
/// store trouble merely skips quick-access seeding.
#[derive(Debug, Error)]
pub enum AppError {
    /// The static configuration failed to validate.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::LayerId;

    #[test]
    fn test_config_error_conversion() {
        let config_err = ConfigError::DuplicateId(LayerId::new("dup"));
        let app_err: AppError = config_err.into();
        assert!(app_err.to_string().contains("configuration error"));
        assert!(app_err.to_string().contains("dup"));
    }
}
