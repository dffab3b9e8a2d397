//! Operation-level error taxonomy with stable codes and HTTP statuses.

use thiserror::Error;

use crate::{
    auth::AuthError,
    core::store::StoreError,
    persist::PersistError,
};

/// Stable, machine-readable error codes. Clients match on these, never on
/// the message text.
pub mod error_code {
    /// Malformed or missing input.
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    /// No live session.
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    /// Wrong role or not the owner.
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    /// Unknown record.
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// Password mismatch.
    pub const INVALID_CREDENTIAL: &str = "INVALID_CREDENTIAL";
    /// Durable write failed.
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Where a password check failed; decides the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheck {
    /// Opening a session.
    Login,
    /// Verifying the old password before a change.
    PasswordChange,
}

/// Error returned by every [`crate::service::JudgeService`] operation.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// Malformed or missing input. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// No live session. HTTP 401.
    #[error("please sign in first")]
    Unauthenticated,

    /// Session present but wrong role or not the owner. HTTP 403.
    #[error("{0}")]
    Forbidden(String),

    /// No record matching the key. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Password mismatch. HTTP 401 at login, 403 at password change.
    #[error("wrong password")]
    InvalidCredential(CredentialCheck),

    /// Durable write failed. HTTP 500.
    #[error("storage: {0}")]
    Storage(#[from] PersistError),
}

impl JudgeError {
    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            JudgeError::Validation(_) => error_code::VALIDATION_FAILED,
            JudgeError::Unauthenticated => error_code::UNAUTHENTICATED,
            JudgeError::Forbidden(_) => error_code::PERMISSION_DENIED,
            JudgeError::NotFound(_) => error_code::NOT_FOUND,
            JudgeError::InvalidCredential(_) => error_code::INVALID_CREDENTIAL,
            JudgeError::Storage(_) => error_code::STORAGE_ERROR,
        }
    }

    /// HTTP status the operation maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            JudgeError::Validation(_) => 400,
            JudgeError::Unauthenticated => 401,
            JudgeError::Forbidden(_) => 403,
            JudgeError::NotFound(_) => 404,
            JudgeError::InvalidCredential(CredentialCheck::Login) => 401,
            JudgeError::InvalidCredential(CredentialCheck::PasswordChange) => 403,
            JudgeError::Storage(_) => 500,
        }
    }
}

impl From<StoreError> for JudgeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection } => {
                JudgeError::NotFound(format!("no such record in {collection}"))
            }
            StoreError::Persist(p) => JudgeError::Storage(p),
        }
    }
}

impl From<AuthError> for JudgeError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UserNotFound(name) => JudgeError::NotFound(format!("can not find user: {name}")),
            AuthError::InvalidCredential => JudgeError::InvalidCredential(CredentialCheck::Login),
            AuthError::Unauthenticated => JudgeError::Unauthenticated,
            AuthError::Forbidden(m) => JudgeError::Forbidden(m),
        }
    }
}
