//! Engine error types

use thiserror::Error;

/// Errors surfaced by the identity engine.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential (or its provider/method pairing) cannot be used as
    /// presented. The caller must fix the input; retrying will not help.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// No account owns the referenced credential key.
    #[error("no account owns credential `{0}`")]
    TargetNotFound(String),

    /// The credential key already has an owner. `owned_by_target` only
    /// selects the user-facing message; callers never branch on it.
    #[error("credential `{key}` already belongs to {}", if *owned_by_target { "this account" } else { "another account" })]
    AlreadyLinked { key: String, owned_by_target: bool },

    /// Two writers raced for the same key and neither outcome can be
    /// reported. Safe to retry as a lookup.
    #[error("storage conflict on credential `{0}`")]
    StorageConflict(String),

    /// Database-layer failure.
    #[error("storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),
}
