use petsoft_core::{PetId, UserId};

/// All errors that can be returned by a `PetStorage` or `UserDirectory`
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backend rejected the write because it violates a column or
    /// table constraint (length bounds, required fields, ...).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// No pet with the given id.
    #[error("pet not found: {pet_id}")]
    NotFound { pet_id: PetId },

    /// The backend refused the operation for the acting user.
    #[error("not authorized to modify pet {pet_id}")]
    Unauthorized { pet_id: PetId },

    /// No user with the given id.
    #[error("user not found: {user_id}")]
    UserNotFound { user_id: UserId },

    /// A backend-specific, possibly retryable failure (connection loss,
    /// timeout, serialization).
    #[error("transient storage failure: {0}")]
    Transient(String),
}
