//! In-memory reference implementations of the storage contracts.
//!
//! Used by `petsoft serve` for local runs and by tests. Nothing here is
//! durable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use petsoft_core::{Pet, PetDraft, PetId, PetPatch, UserId};
use tokio::sync::{Mutex, RwLock};

use crate::error::StorageError;
use crate::record::UserIdentity;
use crate::traits::{PetStorage, SessionProvider, UserDirectory};

/// Pets kept in a `Vec` in creation order. Ids are `pet-<n>` from a
/// monotonic counter and are never reused.
#[derive(Default)]
pub struct InMemoryPetStorage {
    pets: RwLock<Vec<Pet>>,
    next_id: AtomicU64,
    /// One-shot failure returned by the next mutating call.
    injected: Mutex<Option<StorageError>>,
}

impl InMemoryPetStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create`, `update` or `delete` fail with `err`.
    pub async fn fail_next_write(&self, err: StorageError) {
        *self.injected.lock().await = Some(err);
    }

    async fn take_injected(&self) -> Result<(), StorageError> {
        match self.injected.lock().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn allocate_id(&self) -> PetId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        PetId::new(format!("pet-{n}"))
    }
}

fn not_found(id: &PetId) -> StorageError {
    StorageError::NotFound { pet_id: id.clone() }
}

#[async_trait]
impl PetStorage for InMemoryPetStorage {
    async fn create(&self, owner: &UserId, draft: PetDraft) -> Result<Pet, StorageError> {
        self.take_injected().await?;
        draft
            .validate()
            .map_err(|e| StorageError::ConstraintViolation(e.to_string()))?;

        let pet = Pet::from_draft(self.allocate_id(), owner.clone(), draft);
        self.pets.write().await.push(pet.clone());
        Ok(pet)
    }

    async fn update(&self, id: &PetId, patch: PetPatch) -> Result<Pet, StorageError> {
        self.take_injected().await?;
        let mut pets = self.pets.write().await;
        let pet = pets
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| not_found(id))?;

        let next = pet.merged(&patch);
        next.to_draft()
            .validate()
            .map_err(|e| StorageError::ConstraintViolation(e.to_string()))?;

        *pet = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: &PetId) -> Result<(), StorageError> {
        self.take_injected().await?;
        let mut pets = self.pets.write().await;
        let before = pets.len();
        pets.retain(|p| &p.id != id);
        if pets.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn get(&self, id: &PetId) -> Result<Pet, StorageError> {
        self.pets
            .read()
            .await
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn find_owner(&self, id: &PetId) -> Result<UserId, StorageError> {
        self.get(id).await.map(|p| p.user_id)
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Pet>, StorageError> {
        Ok(self
            .pets
            .read()
            .await
            .iter()
            .filter(|p| &p.user_id == owner)
            .cloned()
            .collect())
    }
}

/// A session that always reports the same user (or nobody).
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user: Option<UserIdentity>,
}

impl StaticSession {
    pub fn signed_in(user: UserIdentity) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_user(&self) -> Option<UserIdentity> {
        self.user.clone()
    }
}

/// Users and their session tokens, seeded up front.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserIdentity>>,
    tokens: RwLock<HashMap<String, UserId>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user reachable through `token`.
    pub async fn insert(&self, user: UserIdentity, token: impl Into<String>) {
        self.tokens
            .write()
            .await
            .insert(token.into(), user.id.clone());
        self.users.write().await.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn by_token(&self, token: &str) -> Option<UserIdentity> {
        let id = self.tokens.read().await.get(token).cloned()?;
        self.get(&id).await
    }

    async fn get(&self, id: &UserId) -> Option<UserIdentity> {
        self.users.read().await.get(id).cloned()
    }

    async fn grant_access(&self, id: &UserId) -> Result<UserIdentity, StorageError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or_else(|| StorageError::UserNotFound {
            user_id: id.clone(),
        })?;
        user.has_access = true;
        Ok(user.clone())
    }
}
