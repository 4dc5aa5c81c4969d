use std::future::Future;

use petsoft_core::{PetPatch, UserId};

use super::{expect_eq, make_draft, TestResult};
use crate::PetStorage;

pub(super) async fn run_update_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "update",
            "update_merges_patch",
            update_merges_patch(factory).await,
        ),
        TestResult::from_result(
            "update",
            "update_can_clear_image",
            update_can_clear_image(factory).await,
        ),
        TestResult::from_result(
            "update",
            "update_is_visible_to_get",
            update_is_visible_to_get(factory).await,
        ),
    ]
}

async fn update_merges_patch<S, F, Fut>(factory: &F) -> Result<(), String>
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

    let patch = PetPatch {
        name: Some("Max".to_string()),
        age: Some(6),
        ..PetPatch::default()
    };
    let updated = s
        .update(&pet.id, patch)
        .await
        .map_err(|e| format!("update: {e}"))?;

    expect_eq("id", &updated.id, &pet.id)?;
    expect_eq("name", updated.name.as_str(), "Max")?;
    expect_eq("age", updated.age, 6)?;
    expect_eq("owner_name", &updated.owner_name, &pet.owner_name)?;
    expect_eq("notes", &updated.notes, &pet.notes)?;
    expect_eq("user_id", &updated.user_id, &pet.user_id)
}

async fn update_can_clear_image<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let patch = PetPatch {
        image_url: Some(None),
        ..PetPatch::default()
    };
    let updated = s
        .update(&pet.id, patch)
        .await
        .map_err(|e| format!("update: {e}"))?;
    expect_eq("image_url", updated.image_url, None)
}

async fn update_is_visible_to_get<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let updated = s
        .update(
            &pet.id,
            PetPatch {
                notes: Some("vaccinated".to_string()),
                ..PetPatch::default()
            },
        )
        .await
        .map_err(|e| format!("update: {e}"))?;
    let read = s.get(&pet.id).await.map_err(|e| format!("get: {e}"))?;
    expect_eq("read back", read, updated)
}
