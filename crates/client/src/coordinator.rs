//! Sequences speculative updates against authoritative confirmation.
//!
//! Every mutation follows the same shape: validate, submit the intent to the
//! store (the view changes at once), await the authoritative call, then in a
//! single store step either fold the confirmed result in and retire the
//! intent, or just retire it. The store lock is never held across an
//! `.await`. A caller that drops the future midway still gets its intent
//! retired (see `InFlight`).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use petsoft_core::{validate_pet_form, validate_pet_id, validate_pet_patch, Pet, PetId};
use petsoft_storage::actions::MSG_INVALID_PET;
use petsoft_storage::{ActionError, PetActions, UserIdentity};
use serde_json::Value;
use tokio::sync::watch;

use crate::intent::{Intent, Ticket};
use crate::selection::Selection;
use crate::store::OptimisticStore;

/// A failed mutation as reported to the presentation layer.
pub type MutationError = ActionError;

/// Result of a coordinator operation.
pub type Outcome<T> = Result<T, MutationError>;

/// How a pending `Add` ended, broadcast to edits and deletes that were
/// issued against its placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AddSettlement {
    Pending,
    Confirmed(PetId),
    Failed,
}

struct State {
    store: OptimisticStore,
    selection: Selection,
    /// Open `Add`s by placeholder.
    settling: HashMap<PetId, watch::Receiver<AddSettlement>>,
    /// Sequence number of the latest confirmed-state fetch that was started.
    fetch_seq: u64,
    /// Sequence number of the fetch currently reflected in the store.
    applied_seq: u64,
}

impl State {
    /// Adopt a fetched list unless a later fetch was already applied.
    /// On a failed fetch, `fallback` patches the confirmed state with the
    /// single record the write returned.
    fn absorb(
        &mut self,
        seq: u64,
        fetched: Result<Vec<Pet>, ActionError>,
        fallback: impl FnOnce(&mut OptimisticStore),
    ) {
        match fetched {
            Ok(pets) if seq > self.applied_seq => {
                self.applied_seq = seq;
                self.store.set_confirmed(pets);
            }
            Ok(_) => {
                tracing::debug!(seq, applied = self.applied_seq, "stale pet list ignored");
            }
            Err(err) => {
                tracing::warn!(error = %err, "refreshing pets failed, patching confirmed state");
                fallback(&mut self.store);
            }
        }
    }

    fn retire(&mut self, ticket: Ticket) {
        self.store.retire(ticket);
        self.reconcile_selection();
    }

    fn reconcile_selection(&mut self) {
        self.selection.reconcile(&self.store);
    }
}

/// What the authority already accepted for an in-flight mutation.
enum Landed {
    Record(Pet),
    Removal(PetId),
}

/// Holds one submitted intent until it is retired.
///
/// Dropped without [`InFlight::settle`] (the caller abandoned the future),
/// it still retires the intent, folds in any write that already landed
/// and releases edits or deletes waiting on the `Add`'s placeholder.
struct InFlight<'a> {
    state: &'a Mutex<State>,
    ticket: Ticket,
    add: Option<(PetId, watch::Sender<AddSettlement>)>,
    landed: Option<Landed>,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<State>, ticket: Ticket) -> Self {
        Self {
            state,
            ticket,
            add: None,
            landed: None,
            settled: false,
        }
    }

    fn land(&mut self, landed: Landed) {
        self.landed = Some(landed);
    }

    /// Run `fold`, then retire the intent, in one store step.
    fn settle(mut self, fold: impl FnOnce(&mut State)) {
        self.settled = true;
        let mut state = lock_state(self.state);
        fold(&mut state);
        self.finish(&mut state);
    }

    fn finish(&mut self, state: &mut State) {
        state.retire(self.ticket);
        if let Some((placeholder, settled)) = self.add.take() {
            state.settling.remove(&placeholder);
            let outcome = match &self.landed {
                Some(Landed::Record(pet)) => AddSettlement::Confirmed(pet.id.clone()),
                _ => AddSettlement::Failed,
            };
            settled.send_replace(outcome);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = lock_state(self.state);
        match &self.landed {
            Some(Landed::Record(pet)) => state.store.confirm_record(pet.clone()),
            Some(Landed::Removal(id)) => state.store.confirm_removal(id),
            None => {}
        }
        tracing::debug!(ticket = self.ticket.0, "mutation abandoned, intent retired");
        self.finish(&mut state);
    }
}

/// One signed-in user's pet list and the mutations they issue against it.
///
/// `Send + Sync`: share it behind an `Arc` and drive operations from
/// separate tasks; any number of intents may be pending at once.
pub struct Coordinator<A> {
    actions: A,
    viewer: UserIdentity,
    state: Mutex<State>,
}

impl<A: PetActions> Coordinator<A> {
    /// Start a session: resolve the signed-in user and load their pets.
    ///
    /// Without a session this fails with `Unauthorized` and
    /// `login_required` set.
    pub async fn for_session(actions: A) -> Outcome<Self> {
        let viewer = actions
            .current_user()
            .await
            .ok_or_else(ActionError::login_required)?;
        let confirmed = actions.list_pets().await?;
        tracing::debug!(user_id = %viewer.id, pets = confirmed.len(), "session started");

        Ok(Self {
            actions,
            viewer,
            state: Mutex::new(State {
                store: OptimisticStore::new(confirmed),
                selection: Selection::default(),
                settling: HashMap::new(),
                fetch_seq: 0,
                applied_seq: 0,
            }),
        })
    }

    pub fn viewer(&self) -> &UserIdentity {
        &self.viewer
    }

    /// The speculative view.
    pub fn pets(&self) -> Vec<Pet> {
        self.lock().store.view().to_vec()
    }

    pub fn number_of_pets(&self) -> usize {
        self.lock().store.view().len()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().store.pending_len()
    }

    pub fn selected_pet(&self) -> Option<Pet> {
        let state = self.lock();
        let id = state.selection.id()?;
        state.store.get(id).cloned()
    }

    pub fn select(&self, id: &PetId) -> Outcome<()> {
        let mut state = self.lock();
        let resolved = state.store.resolve(id);
        if !state.store.contains(&resolved) {
            return Err(ActionError::not_found());
        }
        state.selection.select(resolved);
        Ok(())
    }

    pub fn clear_selection(&self) {
        self.lock().selection.clear();
    }

    /// Replace the confirmed state with a list obtained elsewhere (for
    /// example a page reload). Supersedes any fetch still in flight.
    pub fn set_confirmed(&self, pets: Vec<Pet>) {
        let mut state = self.lock();
        state.fetch_seq += 1;
        state.applied_seq = state.fetch_seq;
        state.store.set_confirmed(pets);
        state.reconcile_selection();
    }

    /// Re-pull the confirmed state from the authority.
    pub async fn refresh(&self) -> Outcome<()> {
        let (seq, fetched) = self.fetch_confirmed().await;
        let pets = fetched?;
        let mut state = self.lock();
        state.absorb(seq, Ok(pets), |_| {});
        state.reconcile_selection();
        Ok(())
    }

    /// Add a pet from raw form input.
    pub async fn add_pet(&self, raw: &Value) -> Outcome<Pet> {
        let draft = validate_pet_form(raw).map_err(invalid_input)?;

        let (placeholder, mut in_flight) = {
            let mut state = self.lock();
            let placeholder = state.store.issue_placeholder();
            let ticket = state.store.submit(Intent::Add {
                placeholder: placeholder.clone(),
                owner: self.viewer.id.clone(),
                draft: draft.clone(),
            });
            let (tx, rx) = watch::channel(AddSettlement::Pending);
            state.settling.insert(placeholder.clone(), rx);
            let mut in_flight = InFlight::new(&self.state, ticket);
            in_flight.add = Some((placeholder.clone(), tx));
            (placeholder, in_flight)
        };

        match self.actions.add_pet(draft).await {
            Ok(pet) => {
                {
                    let mut state = self.lock();
                    state.store.confirm_alias(placeholder.clone(), pet.id.clone());
                    state.reconcile_selection();
                }
                in_flight.land(Landed::Record(pet.clone()));
                let (seq, fetched) = self.fetch_confirmed().await;
                in_flight.settle(|state| {
                    state.absorb(seq, fetched, |store| store.confirm_record(pet.clone()));
                });
                tracing::debug!(%placeholder, pet_id = %pet.id, "add confirmed");
                Ok(pet)
            }
            Err(err) => {
                in_flight.settle(|_| {});
                tracing::warn!(%placeholder, error = %err, "add failed");
                Err(err)
            }
        }
    }

    /// Edit a pet from raw form input. Any subset of fields may be given.
    pub async fn edit_pet(&self, id: &PetId, raw: &Value) -> Outcome<Pet> {
        validate_pet_id(id.as_str()).map_err(invalid_input)?;
        let patch = validate_pet_patch(raw).map_err(invalid_input)?;

        let (mut in_flight, target, waiter) = {
            let mut state = self.lock();
            let target = state.store.resolve(id);
            if !state.store.contains(&target) {
                return Err(ActionError::not_found());
            }
            let ticket = state.store.submit(Intent::Edit {
                id: target.clone(),
                patch: patch.clone(),
            });
            let waiter = state.settling.get(&target).cloned();
            (InFlight::new(&self.state, ticket), target, waiter)
        };

        let Some(real) = self.confirmed_id(target, waiter).await else {
            in_flight.settle(|_| {});
            return Err(ActionError::not_found());
        };

        match self.actions.edit_pet(&real, patch).await {
            Ok(pet) => {
                in_flight.land(Landed::Record(pet.clone()));
                let (seq, fetched) = self.fetch_confirmed().await;
                in_flight.settle(|state| {
                    state.absorb(seq, fetched, |store| store.confirm_record(pet.clone()));
                });
                Ok(pet)
            }
            Err(err) => {
                in_flight.settle(|_| {});
                tracing::warn!(pet_id = %real, error = %err, "edit failed");
                Err(err)
            }
        }
    }

    /// Delete a pet. If it is selected, the selection is cleared in the
    /// same step that hides it.
    pub async fn delete_pet(&self, id: &PetId) -> Outcome<()> {
        validate_pet_id(id.as_str()).map_err(invalid_input)?;

        let (mut in_flight, target, waiter) = {
            let mut state = self.lock();
            let target = state.store.resolve(id);
            if !state.store.contains(&target) {
                return Err(ActionError::not_found());
            }
            let state = &mut *state;
            if state.selection.is(&target, &state.store) {
                state.selection.clear();
            }
            let ticket = state.store.submit(Intent::Delete { id: target.clone() });
            let waiter = state.settling.get(&target).cloned();
            (InFlight::new(&self.state, ticket), target, waiter)
        };

        let Some(real) = self.confirmed_id(target, waiter).await else {
            in_flight.settle(|_| {});
            return Err(ActionError::not_found());
        };

        match self.actions.delete_pet(&real).await {
            Ok(()) => {
                in_flight.land(Landed::Removal(real.clone()));
                let (seq, fetched) = self.fetch_confirmed().await;
                in_flight.settle(|state| {
                    state.absorb(seq, fetched, |store| store.confirm_removal(&real));
                });
                Ok(())
            }
            Err(err) => {
                in_flight.settle(|_| {});
                tracing::warn!(pet_id = %real, error = %err, "delete failed");
                Err(err)
            }
        }
    }

    /// The id to send to the authority for `target`. For a placeholder,
    /// waits until its `Add` settles; `None` if that `Add` failed.
    async fn confirmed_id(
        &self,
        target: PetId,
        waiter: Option<watch::Receiver<AddSettlement>>,
    ) -> Option<PetId> {
        let Some(mut rx) = waiter else {
            return Some(target);
        };
        tracing::debug!(placeholder = %target, "waiting for add to settle");
        let settled = rx
            .wait_for(|s| *s != AddSettlement::Pending)
            .await
            .map(|s| (*s).clone())
            .unwrap_or(AddSettlement::Failed);
        match settled {
            AddSettlement::Confirmed(real) => Some(real),
            AddSettlement::Pending | AddSettlement::Failed => None,
        }
    }

    async fn fetch_confirmed(&self) -> (u64, Result<Vec<Pet>, ActionError>) {
        let seq = {
            let mut state = self.lock();
            state.fetch_seq += 1;
            state.fetch_seq
        };
        (seq, self.actions.list_pets().await)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn invalid_input(err: petsoft_core::ValidationError) -> ActionError {
    tracing::debug!(error = %err, "rejected pet input");
    ActionError::validation(MSG_INVALID_PET)
}
