use std::future::Future;

use petsoft_core::UserId;

use super::{make_draft, TestResult};
use crate::{PetStorage, StorageError};

pub(super) async fn run_delete_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "delete",
            "delete_removes_pet",
            delete_removes_pet(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_twice_is_not_found",
            delete_twice_is_not_found(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_leaves_siblings",
            delete_leaves_siblings(factory).await,
        ),
    ]
}

async fn delete_removes_pet<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let pet = s
        .create(&UserId::from("owner-1"), make_draft("Rex"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    s.delete(&pet.id)
        .await
        .map_err(|e| format!("delete: {e}"))?;
    match s.get(&pet.id).await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound after delete, got {:?}", other)),
    }
}

async fn delete_twice_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let pet = s
        .create(&UserId::from("owner-1"), make_draft("Rex"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    s.delete(&pet.id)
        .await
        .map_err(|e| format!("first delete: {e}"))?;
    match s.delete(&pet.id).await {
        Err(StorageError::NotFound { pet_id }) if pet_id == pet.id => Ok(()),
        other => Err(format!("expected NotFound on second delete, got {:?}", other)),
    }
}

async fn delete_leaves_siblings<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let owner = UserId::from("owner-1");
    let a = s
        .create(&owner, make_draft("A"))
        .await
        .map_err(|e| format!("create A: {e}"))?;
    let b = s
        .create(&owner, make_draft("B"))
        .await
        .map_err(|e| format!("create B: {e}"))?;
    s.delete(&a.id)
        .await
        .map_err(|e| format!("delete: {e}"))?;
    let left = s
        .list_for_owner(&owner)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if left.len() != 1 || left[0].id != b.id {
        return Err(format!("expected only {} to remain, got {:?}", b.id, left));
    }
    Ok(())
}
