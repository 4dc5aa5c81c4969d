use async_trait::async_trait;
use petsoft_core::{Pet, PetDraft, PetId, PetPatch, UserId};

use crate::error::StorageError;
use crate::record::UserIdentity;

/// Authoritative data access for pet records.
///
/// Every call succeeds or fails atomically. Payloads are expected to be
/// validated by the caller; backends may still reject them with
/// `StorageError::ConstraintViolation`.
///
/// ## Ownership
///
/// The storage layer does not decide who may mutate a record. Callers look
/// up the owner with [`PetStorage::find_owner`] before `update` or
/// `delete` and enforce the check themselves.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait PetStorage: Send + Sync + 'static {
    /// Insert a new pet owned by `owner`. The backend assigns the id.
    async fn create(&self, owner: &UserId, draft: PetDraft) -> Result<Pet, StorageError>;

    /// Merge `patch` into the pet with the given id.
    ///
    /// Returns `Err(StorageError::NotFound)` if the pet does not exist.
    async fn update(&self, id: &PetId, patch: PetPatch) -> Result<Pet, StorageError>;

    /// Remove the pet with the given id.
    ///
    /// Returns `Err(StorageError::NotFound)` if the pet does not exist.
    async fn delete(&self, id: &PetId) -> Result<(), StorageError>;

    /// Read a single pet.
    async fn get(&self, id: &PetId) -> Result<Pet, StorageError>;

    /// Look up which user owns a pet.
    ///
    /// Returns `Err(StorageError::NotFound)` if the pet does not exist.
    async fn find_owner(&self, id: &PetId) -> Result<UserId, StorageError>;

    /// All pets owned by `owner`, in creation order.
    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Pet>, StorageError>;
}

/// Answers "who is signed in?" for the current request or page.
///
/// `None` means the caller must send the user to authentication rather
/// than proceed.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self) -> Option<UserIdentity>;
}

/// Lookup of known users, used by the HTTP layer to resolve bearer tokens
/// and by checkout completion to grant access.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Resolve an opaque session token to its user.
    async fn by_token(&self, token: &str) -> Option<UserIdentity>;

    async fn get(&self, id: &UserId) -> Option<UserIdentity>;

    /// Mark the user as having paid for lifetime access.
    ///
    /// Returns `Err(StorageError::UserNotFound)` for unknown users.
    async fn grant_access(&self, id: &UserId) -> Result<UserIdentity, StorageError>;
}
