//! Credentials, login sessions and role gating.

use thiserror::Error;

/// Salted password derivation and verification.
pub mod credential;
/// Role and ownership checks over a resolved session.
pub mod gate;
/// Login sessions keyed by opaque token.
pub mod session;

/// Failures raised by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Login named an account that does not exist.
    #[error("can not find user: {0}")]
    UserNotFound(String),
    /// Password did not reproduce the stored hash.
    #[error("wrong password")]
    InvalidCredential,
    /// No live session for the caller.
    #[error("please sign in first")]
    Unauthenticated,
    /// Session present but not allowed to perform the operation.
    #[error("{0}")]
    Forbidden(String),
}
