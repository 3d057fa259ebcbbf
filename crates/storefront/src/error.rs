//! Unified error type for storefront setup.
//!
//! Runtime actions report failures as [`Notice`](crate::notice::Notice)s;
//! `StorefrontError` covers what can stop the storefront from starting.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend client could not be built.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),
}
