//! Server actions: the authoritative layer behind every pet mutation.
//!
//! [`PetService`] is what a client talks to. Each action runs the same
//! pipeline: session check, payload check, ownership lookup (edit and
//! delete), then a single storage call. Failures come back as an
//! [`ActionError`] with a machine-readable [`ErrorKind`] and a message fit
//! for display.

use std::sync::Arc;

use async_trait::async_trait;
use petsoft_core::{Pet, PetDraft, PetId, PetPatch};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::record::UserIdentity;
use crate::traits::{PetStorage, SessionProvider};

pub const MSG_INVALID_PET: &str = "Invalid pet data.";
pub const MSG_NOT_FOUND: &str = "Pet not found.";
pub const MSG_NOT_AUTHORIZED: &str = "Not authorized.";
pub const MSG_NOT_AUTHENTICATED: &str = "Not authenticated.";
pub const MSG_ADD_FAILED: &str = "Could not add pet.";
pub const MSG_EDIT_FAILED: &str = "Could not edit pet.";
pub const MSG_DELETE_FAILED: &str = "Could not delete pet.";
pub const MSG_LOAD_FAILED: &str = "Could not load pets.";

/// Failure taxonomy shared by the server actions and the client
/// coordinator. Every kind is recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input; the user corrects it and resubmits.
    ValidationFailed,
    /// No session, or the session user does not own the record.
    Unauthorized,
    /// The target record is missing; treat as already resolved.
    NotFound,
    /// The authoritative store rejected or failed the write; the user may
    /// retry deliberately.
    PersistenceFailed,
}

/// A failed server action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct ActionError {
    pub kind: ErrorKind,
    pub message: String,
    /// Set when there is no session at all: the caller should send the
    /// user to authentication instead of showing the message.
    #[serde(default)]
    pub login_required: bool,
}

impl ActionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            login_required: false,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed, message)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, MSG_NOT_FOUND)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized, MSG_NOT_AUTHORIZED)
    }

    pub fn login_required() -> Self {
        Self {
            kind: ErrorKind::Unauthorized,
            message: MSG_NOT_AUTHENTICATED.to_string(),
            login_required: true,
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PersistenceFailed, message)
    }
}

/// The authoritative operations a client can invoke.
#[async_trait]
pub trait PetActions: Send + Sync {
    /// The signed-in user, or `None` if the caller must authenticate.
    async fn current_user(&self) -> Option<UserIdentity>;

    /// The signed-in user's pets: the confirmed state.
    async fn list_pets(&self) -> Result<Vec<Pet>, ActionError>;

    async fn add_pet(&self, draft: PetDraft) -> Result<Pet, ActionError>;

    async fn edit_pet(&self, id: &PetId, patch: PetPatch) -> Result<Pet, ActionError>;

    async fn delete_pet(&self, id: &PetId) -> Result<(), ActionError>;
}

#[async_trait]
impl<T: PetActions + ?Sized> PetActions for Arc<T> {
    async fn current_user(&self) -> Option<UserIdentity> {
        (**self).current_user().await
    }

    async fn list_pets(&self) -> Result<Vec<Pet>, ActionError> {
        (**self).list_pets().await
    }

    async fn add_pet(&self, draft: PetDraft) -> Result<Pet, ActionError> {
        (**self).add_pet(draft).await
    }

    async fn edit_pet(&self, id: &PetId, patch: PetPatch) -> Result<Pet, ActionError> {
        (**self).edit_pet(id, patch).await
    }

    async fn delete_pet(&self, id: &PetId) -> Result<(), ActionError> {
        (**self).delete_pet(id).await
    }
}

/// [`PetActions`] over a storage backend and a session provider.
pub struct PetService<S, P> {
    storage: Arc<S>,
    session: P,
}

impl<S: PetStorage, P: SessionProvider> PetService<S, P> {
    pub fn new(storage: Arc<S>, session: P) -> Self {
        Self { storage, session }
    }

    async fn require_user(&self) -> Result<UserIdentity, ActionError> {
        self.session
            .current_user()
            .await
            .ok_or_else(ActionError::login_required)
    }

    /// Ownership lookup consulted before edit and delete.
    async fn authorize(
        &self,
        user: &UserIdentity,
        id: &PetId,
        failure_message: &str,
    ) -> Result<(), ActionError> {
        match self.storage.find_owner(id).await {
            Ok(owner) if owner == user.id => Ok(()),
            Ok(owner) => {
                tracing::warn!(pet_id = %id, user_id = %user.id, owner_id = %owner, "ownership mismatch");
                Err(ActionError::unauthorized())
            }
            Err(err) => Err(map_storage_error(err, failure_message)),
        }
    }
}

/// Translate a storage failure into the action taxonomy.
fn map_storage_error(err: StorageError, failure_message: &str) -> ActionError {
    match err {
        StorageError::NotFound { .. } => ActionError::not_found(),
        StorageError::Unauthorized { .. } => ActionError::unauthorized(),
        StorageError::ConstraintViolation(_)
        | StorageError::UserNotFound { .. }
        | StorageError::Transient(_) => {
            tracing::warn!(error = %err, "storage write failed");
            ActionError::persistence(failure_message)
        }
    }
}

#[async_trait]
impl<S: PetStorage, P: SessionProvider> PetActions for PetService<S, P> {
    async fn current_user(&self) -> Option<UserIdentity> {
        self.session.current_user().await
    }

    async fn list_pets(&self) -> Result<Vec<Pet>, ActionError> {
        let user = self.require_user().await?;
        self.storage
            .list_for_owner(&user.id)
            .await
            .map_err(|e| map_storage_error(e, MSG_LOAD_FAILED))
    }

    async fn add_pet(&self, draft: PetDraft) -> Result<Pet, ActionError> {
        let user = self.require_user().await?;
        draft
            .validate()
            .map_err(|_| ActionError::validation(MSG_INVALID_PET))?;

        let pet = self
            .storage
            .create(&user.id, draft)
            .await
            .map_err(|e| map_storage_error(e, MSG_ADD_FAILED))?;
        tracing::info!(pet_id = %pet.id, user_id = %user.id, "pet added");
        Ok(pet)
    }

    async fn edit_pet(&self, id: &PetId, patch: PetPatch) -> Result<Pet, ActionError> {
        let user = self.require_user().await?;
        petsoft_core::validate_pet_id(id.as_str())
            .map_err(|_| ActionError::validation(MSG_INVALID_PET))?;
        patch
            .validate()
            .map_err(|_| ActionError::validation(MSG_INVALID_PET))?;

        self.authorize(&user, id, MSG_EDIT_FAILED).await?;

        let pet = self
            .storage
            .update(id, patch)
            .await
            .map_err(|e| map_storage_error(e, MSG_EDIT_FAILED))?;
        tracing::info!(pet_id = %pet.id, user_id = %user.id, "pet edited");
        Ok(pet)
    }

    async fn delete_pet(&self, id: &PetId) -> Result<(), ActionError> {
        let user = self.require_user().await?;
        petsoft_core::validate_pet_id(id.as_str())
            .map_err(|_| ActionError::validation(MSG_INVALID_PET))?;

        self.authorize(&user, id, MSG_DELETE_FAILED).await?;

        self.storage
            .delete(id)
            .await
            .map_err(|e| map_storage_error(e, MSG_DELETE_FAILED))?;
        tracing::info!(pet_id = %id, user_id = %user.id, "pet deleted");
        Ok(())
    }
}
