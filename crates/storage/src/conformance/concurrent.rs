use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use petsoft_core::UserId;

use super::{make_draft, TestResult};
use crate::{PetStorage, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_creates_get_distinct_ids",
            concurrent_creates_get_distinct_ids(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_deletes_exactly_one_wins",
            concurrent_deletes_exactly_one_wins(factory).await,
        ),
    ]
}

// ── Concurrent create: no shared ids ────────────────────────────────────────

/// N tasks create pets for the same owner at once. Every pet must get a
/// distinct id and all N must be listed afterwards.
async fn concurrent_creates_get_distinct_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let owner = UserId::from("owner-1");

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        let owner = owner.clone();
        handles.push(tokio::spawn(async move {
            s.create(&owner, make_draft(&format!("Pet {i}"))).await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let pet = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if !ids.insert(pet.id.clone()) {
            return Err(format!("duplicate id {}", pet.id));
        }
    }

    let listed = storage
        .list_for_owner(&owner)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if listed.len() != N {
        return Err(format!("expected {N} pets, listed {}", listed.len()));
    }
    Ok(())
}

// ── Concurrent delete: exactly one wins ─────────────────────────────────────

/// N tasks delete the same pet. Exactly one succeeds; the rest must get
/// NotFound.
async fn concurrent_deletes_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: PetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let pet = storage
        .create(&UserId::from("owner-1"), make_draft("Rex"))
        .await
        .map_err(|e| format!("create: {e}"))?;

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        let id = pet.id.clone();
        handles.push(tokio::spawn(async move {
            match s.delete(&id).await {
                Ok(()) => Ok(true),
                Err(StorageError::NotFound { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }

    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    Ok(())
}
