use std::collections::HashSet;
use std::future::Future;

use petsoft_core::UserId;

use super::{expect_eq, make_draft, TestResult};
use crate::PetStorage;

pub(super) async fn run_create_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "create",
            "create_returns_stored_fields",
            create_returns_stored_fields(factory).await,
        ),
        TestResult::from_result(
            "create",
            "create_assigns_unique_ids",
            create_assigns_unique_ids(factory).await,
        ),
        TestResult::from_result(
            "create",
            "created_pet_is_readable",
            created_pet_is_readable(factory).await,
        ),
    ]
}

async fn create_returns_stored_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let owner = UserId::from("owner-1");
    let draft = make_draft("Rex");
    let pet = s
        .create(&owner, draft.clone())
        .await
        .map_err(|e| format!("create: {e}"))?;

    expect_eq("owner", &pet.user_id, &owner)?;
    expect_eq("draft fields", pet.to_draft(), draft)?;
    if pet.id.as_str().is_empty() {
        return Err("create returned an empty id".to_string());
    }
    Ok(())
}

async fn create_assigns_unique_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let owner = UserId::from("owner-1");
    let mut ids = HashSet::new();
    for i in 0..5 {
        let pet = s
            .create(&owner, make_draft(&format!("Pet {i}")))
            .await
            .map_err(|e| format!("create {i}: {e}"))?;
        if !ids.insert(pet.id.clone()) {
            return Err(format!("duplicate id {}", pet.id));
        }
    }
    Ok(())
}

async fn created_pet_is_readable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let created = s
        .create(&UserId::from("owner-1"), make_draft("Rex"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    let read = s
        .get(&created.id)
        .await
        .map_err(|e| format!("get: {e}"))?;
    expect_eq("read back", read, created)
}
