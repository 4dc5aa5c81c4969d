use std::future::Future;

use petsoft_core::UserId;

use super::{expect_eq, make_draft, TestResult};
use crate::PetStorage;

pub(super) async fn run_ownership_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "ownership",
            "find_owner_returns_creator",
            find_owner_returns_creator(factory).await,
        ),
        TestResult::from_result(
            "ownership",
            "list_is_scoped_to_owner",
            list_is_scoped_to_owner(factory).await,
        ),
        TestResult::from_result(
            "ownership",
            "list_preserves_creation_order",
            list_preserves_creation_order(factory).await,
        ),
        TestResult::from_result(
            "ownership",
            "update_does_not_change_owner",
            update_does_not_change_owner(factory).await,
        ),
    ]
}

async fn find_owner_returns_creator<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let owner = UserId::from("owner-1");
    let pet = s
        .create(&owner, make_draft("Rex"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    let found = s
        .find_owner(&pet.id)
        .await
        .map_err(|e| format!("find_owner: {e}"))?;
    expect_eq("owner", found, owner)
}

async fn list_is_scoped_to_owner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let ann = UserId::from("ann");
    let bob = UserId::from("bob");
    s.create(&ann, make_draft("Rex"))
        .await
        .map_err(|e| format!("create ann: {e}"))?;
    s.create(&bob, make_draft("Fido"))
        .await
        .map_err(|e| format!("create bob: {e}"))?;

    let pets = s
        .list_for_owner(&ann)
        .await
        .map_err(|e| format!("list: {e}"))?;
    let names: Vec<&str> = pets.iter().map(|p| p.name.as_str()).collect();
    expect_eq("ann's pets", names, vec!["Rex"])?;

    let nobody = s
        .list_for_owner(&UserId::from("carol"))
        .await
        .map_err(|e| format!("list empty: {e}"))?;
    expect_eq("carol's pet count", nobody.len(), 0)
}

async fn list_preserves_creation_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let owner = UserId::from("owner-1");
    for name in ["A", "B", "C"] {
        s.create(&owner, make_draft(name))
            .await
            .map_err(|e| format!("create {name}: {e}"))?;
    }
    let pets = s
        .list_for_owner(&owner)
        .await
        .map_err(|e| format!("list: {e}"))?;
    let names: Vec<&str> = pets.iter().map(|p| p.name.as_str()).collect();
    expect_eq("order", names, vec!["A", "B", "C"])
}

async fn update_does_not_change_owner<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let owner = UserId::from("owner-1");
    let pet = s
        .create(&owner, make_draft("Rex"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    s.update(&pet.id, petsoft_core::PetPatch::from(make_draft("Max")))
        .await
        .map_err(|e| format!("update: {e}"))?;
    let found = s
        .find_owner(&pet.id)
        .await
        .map_err(|e| format!("find_owner: {e}"))?;
    expect_eq("owner after update", found, owner)
}
