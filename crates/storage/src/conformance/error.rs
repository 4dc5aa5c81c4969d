use std::future::Future;

use petsoft_core::{PetId, PetPatch};

use super::TestResult;
use crate::{PetStorage, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "error",
            "get_nonexistent",
            get_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "update_nonexistent",
            update_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "delete_nonexistent",
            delete_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "find_owner_nonexistent",
            find_owner_nonexistent(factory).await,
        ),
    ]
}

fn expect_not_found<T: std::fmt::Debug>(
    op: &str,
    result: Result<T, StorageError>,
    id: &PetId,
) -> Result<(), String> {
    match result {
        Err(StorageError::NotFound { pet_id }) if &pet_id == id => Ok(()),
        Err(StorageError::NotFound { pet_id }) => Err(format!(
            "{op}: NotFound carries wrong id: expected {id}, got {pet_id}"
        )),
        other => Err(format!("{op}: expected NotFound, got {:?}", other)),
    }
}

async fn get_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = PetId::from("pet-999");
    expect_not_found("get", s.get(&id).await, &id)
}

async fn update_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = PetId::from("pet-999");
    let patch = PetPatch {
        name: Some("Ghost".to_string()),
        ..PetPatch::default()
    };
    expect_not_found("update", s.update(&id, patch).await, &id)
}

async fn delete_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = PetId::from("pet-999");
    expect_not_found("delete", s.delete(&id).await, &id)
}

async fn find_owner_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = PetId::from("pet-999");
    expect_not_found("find_owner", s.find_owner(&id).await, &id)
}
