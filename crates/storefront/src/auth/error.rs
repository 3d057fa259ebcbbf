//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors that can occur during sign-in, registration and session upkeep.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] marketplace_core::EmailError),

    /// Registration without a display name.
    #[error("name is required")]
    MissingName,

    /// Empty password.
    #[error("password is required")]
    EmptyPassword,

    /// The backend refused or failed the request.
    #[error("backend error: {0}")]
    Api(#[from] ApiError),

    /// The session could not be saved or cleared.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Whether the backend rejected the stored token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized))
    }
}
