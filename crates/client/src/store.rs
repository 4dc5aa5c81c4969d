//! Speculative pet list.
//!
//! The view shown to the user is never edited in place. It is always
//! `fold(confirmed, pending)`: the last authoritative list with every
//! still-pending intent replayed over it in submission order. Retiring an
//! intent (success or failure) and recomputing is therefore all it takes
//! to roll the view forward or back.

use std::collections::{HashMap, HashSet};

use petsoft_core::{Pet, PetId};

use crate::intent::{Intent, Ticket};

/// Prefix of ids handed out to pets that only exist speculatively.
pub const PLACEHOLDER_PREFIX: &str = "optimistic-";

/// Apply a single intent to a view.
///
/// - `Add` appends the draft under its placeholder id; no-op if a pet
///   with that id is already present.
/// - `Edit` merges the patch into the matching pet; no-op if absent.
/// - `Delete` removes the matching pet; no-op if absent.
pub fn apply(mut view: Vec<Pet>, intent: &Intent) -> Vec<Pet> {
    match intent {
        Intent::Add {
            placeholder,
            owner,
            draft,
        } => {
            if !view.iter().any(|p| &p.id == placeholder) {
                view.push(Pet::from_draft(
                    placeholder.clone(),
                    owner.clone(),
                    draft.clone(),
                ));
            }
        }
        Intent::Edit { id, patch } => {
            if let Some(pet) = view.iter_mut().find(|p| &p.id == id) {
                pet.merge(patch);
            }
        }
        Intent::Delete { id } => view.retain(|p| &p.id != id),
    }
    view
}

/// Replay `intents` over `confirmed`, in order.
pub fn fold<'a>(confirmed: &[Pet], intents: impl IntoIterator<Item = &'a Intent>) -> Vec<Pet> {
    intents
        .into_iter()
        .fold(confirmed.to_vec(), |view, intent| apply(view, intent))
}

/// Confirmed state, pending intents and the view derived from them.
///
/// Owned by one session. All methods are synchronous; callers serialize
/// access (the coordinator keeps the store behind a lock).
#[derive(Debug, Default)]
pub struct OptimisticStore {
    confirmed: Vec<Pet>,
    pending: Vec<(Ticket, Intent)>,
    /// Placeholder -> confirmed id, recorded when an `Add` is confirmed.
    aliases: HashMap<PetId, PetId>,
    /// Confirmed ids present when each pending `Add` was submitted.
    baselines: HashMap<Ticket, HashSet<PetId>>,
    /// Placeholder -> confirmed id for pending `Add`s whose record already
    /// arrived through another refresh. Rebuilt on every recompute.
    adopted: HashMap<PetId, PetId>,
    view: Vec<Pet>,
    next_ticket: u64,
    next_placeholder: u64,
}

impl OptimisticStore {
    pub fn new(confirmed: Vec<Pet>) -> Self {
        let mut store = Self {
            confirmed,
            ..Self::default()
        };
        store.recompute();
        store
    }

    /// Replace the confirmed state and rebuild the view.
    pub fn set_confirmed(&mut self, pets: Vec<Pet>) {
        self.confirmed = pets;
        self.recompute();
    }

    /// Insert or replace a single confirmed pet, as returned by the
    /// authority for a write whose list refresh could not be fetched.
    pub fn confirm_record(&mut self, pet: Pet) {
        match self.confirmed.iter_mut().find(|p| p.id == pet.id) {
            Some(existing) => *existing = pet,
            None => self.confirmed.push(pet),
        }
        self.recompute();
    }

    /// Drop a single pet from the confirmed state.
    pub fn confirm_removal(&mut self, id: &PetId) {
        self.confirmed.retain(|p| &p.id != id);
        self.recompute();
    }

    /// Issue a fresh placeholder id. Never reused within this store.
    pub fn issue_placeholder(&mut self) -> PetId {
        self.next_placeholder += 1;
        PetId::new(format!("{PLACEHOLDER_PREFIX}{}", self.next_placeholder))
    }

    /// Queue an intent and fold it into the view.
    pub fn submit(&mut self, intent: Intent) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        tracing::debug!(ticket = ticket.0, target = %intent.target(), "intent submitted");
        if matches!(intent, Intent::Add { .. }) {
            let known = self.confirmed.iter().map(|p| p.id.clone()).collect();
            self.baselines.insert(ticket, known);
        }
        self.pending.push((ticket, intent));
        self.recompute();
        ticket
    }

    /// Drop a pending intent and rebuild the view. Unknown tickets are
    /// ignored; returns whether anything was retired.
    pub fn retire(&mut self, ticket: Ticket) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(t, _)| *t != ticket);
        let retired = self.pending.len() != before;
        self.baselines.remove(&ticket);
        if retired {
            tracing::debug!(ticket = ticket.0, "intent retired");
            self.recompute();
        }
        retired
    }

    /// Record that the pet shown as `placeholder` was confirmed as `real`.
    pub fn confirm_alias(&mut self, placeholder: PetId, real: PetId) {
        self.aliases.insert(placeholder, real);
        self.recompute();
    }

    /// Follow the alias table: the confirmed id for a confirmed (or
    /// already refreshed) placeholder, `id` itself otherwise.
    pub fn resolve(&self, id: &PetId) -> PetId {
        self.aliases
            .get(id)
            .or_else(|| self.adopted.get(id))
            .cloned()
            .unwrap_or_else(|| id.clone())
    }

    pub fn view(&self) -> &[Pet] {
        &self.view
    }

    pub fn get(&self, id: &PetId) -> Option<&Pet> {
        let id = self.resolve(id);
        self.view.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &PetId) -> bool {
        self.get(id).is_some()
    }

    pub fn confirmed(&self) -> &[Pet] {
        &self.confirmed
    }

    /// Pending intents in submission order.
    pub fn pending(&self) -> impl Iterator<Item = &Intent> {
        self.pending.iter().map(|(_, intent)| intent)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn recompute(&mut self) {
        self.adopted = self.adoptions();
        let resolved: Vec<Intent> = self
            .pending
            .iter()
            .map(|(_, intent)| intent.resolved(&self.aliases).resolved(&self.adopted))
            .collect();
        self.view = fold(&self.confirmed, &resolved);
    }

    /// Pending `Add`s whose record is already in the confirmed state
    /// because a refresh for some other write fetched it first. A match is
    /// a pet with the same owner and fields that was not confirmed when the
    /// `Add` was submitted and is not claimed by an alias. Each confirmed
    /// pet is adopted at most once.
    fn adoptions(&self) -> HashMap<PetId, PetId> {
        let mut claimed: HashSet<&PetId> = self.aliases.values().collect();
        let mut adopted = HashMap::new();
        for (ticket, intent) in &self.pending {
            let Intent::Add {
                placeholder,
                owner,
                draft,
            } = intent
            else {
                continue;
            };
            if self.aliases.contains_key(placeholder) {
                continue;
            }
            let Some(known) = self.baselines.get(ticket) else {
                continue;
            };
            let found = self.confirmed.iter().find(|p| {
                !known.contains(&p.id)
                    && !claimed.contains(&p.id)
                    && &p.user_id == owner
                    && p.to_draft() == *draft
            });
            if let Some(pet) = found {
                claimed.insert(&pet.id);
                adopted.insert(placeholder.clone(), pet.id.clone());
            }
        }
        adopted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petsoft_core::{PetDraft, PetPatch, UserId};

    fn pet(id: &str, name: &str) -> Pet {
        Pet {
            id: PetId::from(id),
            name: name.to_string(),
            owner_name: "Ann".to_string(),
            image_url: None,
            age: 3,
            notes: String::new(),
            user_id: UserId::from("user-1"),
        }
    }

    fn draft(name: &str) -> PetDraft {
        PetDraft {
            name: name.to_string(),
            owner_name: "Ann".to_string(),
            image_url: None,
            age: 1,
            notes: String::new(),
        }
    }

    fn rename(id: &str, name: &str) -> Intent {
        Intent::Edit {
            id: PetId::from(id),
            patch: PetPatch {
                name: Some(name.to_string()),
                ..PetPatch::default()
            },
        }
    }

    fn names(view: &[Pet]) -> Vec<&str> {
        view.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn apply_edit_and_delete_on_missing_id_are_noops() {
        let view = vec![pet("1", "Rex")];
        assert_eq!(apply(view.clone(), &rename("9", "Max")), view);
        assert_eq!(
            apply(view.clone(), &Intent::Delete { id: PetId::from("9") }),
            view
        );
    }

    #[test]
    fn apply_add_is_noop_for_present_id() {
        let view = vec![pet("1", "Rex")];
        let add = Intent::Add {
            placeholder: PetId::from("1"),
            owner: UserId::from("user-1"),
            draft: draft("Fido"),
        };
        assert_eq!(apply(view.clone(), &add), view);
    }

    #[test]
    fn fold_is_order_sensitive() {
        let confirmed = vec![pet("1", "Rex")];
        let max = rename("1", "Max");
        let bolt = rename("1", "Bolt");
        assert_eq!(names(&fold(&confirmed, [&max, &bolt])), vec!["Bolt"]);
        assert_eq!(names(&fold(&confirmed, [&bolt, &max])), vec!["Max"]);

        let add = Intent::Add {
            placeholder: PetId::from("optimistic-1"),
            owner: UserId::from("user-1"),
            draft: draft("Fido"),
        };
        let rename_placeholder = rename("optimistic-1", "Bolt");
        let add_then_edit = fold(&confirmed, [&add, &rename_placeholder]);
        let edit_then_add = fold(&confirmed, [&rename_placeholder, &add]);
        assert_eq!(names(&add_then_edit), vec!["Rex", "Bolt"]);
        assert_eq!(names(&edit_then_add), vec!["Rex", "Fido"]);
        assert_ne!(add_then_edit, edit_then_add);
    }

    #[test]
    fn fold_is_deterministic() {
        let confirmed = vec![pet("1", "Rex"), pet("2", "Lady")];
        let intents = vec![rename("1", "Max"), Intent::Delete { id: PetId::from("2") }];
        assert_eq!(fold(&confirmed, &intents), fold(&confirmed, &intents));
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut store = OptimisticStore::new(vec![pet("1", "Rex")]);
        store.submit(rename("1", "Max"));
        let first = store.view().to_vec();
        store.recompute();
        assert_eq!(store.view(), first.as_slice());
        store.set_confirmed(store.confirmed().to_vec());
        assert_eq!(store.view(), first.as_slice());
    }

    #[test]
    fn add_then_edit_on_placeholder_yields_one_record() {
        let mut store = OptimisticStore::new(Vec::new());
        let placeholder = store.issue_placeholder();
        store.submit(Intent::Add {
            placeholder: placeholder.clone(),
            owner: UserId::from("user-1"),
            draft: draft("Fido"),
        });
        store.submit(Intent::Edit {
            id: placeholder.clone(),
            patch: PetPatch {
                age: Some(7),
                ..PetPatch::default()
            },
        });

        assert_eq!(store.view().len(), 1);
        let shown = &store.view()[0];
        assert_eq!(shown.id, placeholder);
        assert_eq!(shown.name, "Fido");
        assert_eq!(shown.age, 7);
    }

    #[test]
    fn retiring_failed_edit_reverts_view() {
        let mut store = OptimisticStore::new(vec![pet("1", "Rex")]);
        let ticket = store.submit(rename("1", "Max"));
        assert_eq!(names(store.view()), vec!["Max"]);
        assert!(store.retire(ticket));
        assert_eq!(names(store.view()), vec!["Rex"]);
    }

    #[test]
    fn retire_unknown_ticket_is_noop() {
        let mut store = OptimisticStore::new(vec![pet("1", "Rex")]);
        let ticket = store.submit(rename("1", "Max"));
        assert!(store.retire(ticket));
        assert!(!store.retire(ticket));
        assert_eq!(names(store.view()), vec!["Rex"]);
    }

    #[test]
    fn placeholders_are_unique() {
        let mut store = OptimisticStore::new(Vec::new());
        let a = store.issue_placeholder();
        let b = store.issue_placeholder();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(PLACEHOLDER_PREFIX));
        assert!(b.as_str().starts_with(PLACEHOLDER_PREFIX));
    }

    #[test]
    fn alias_prevents_duplicate_when_confirmed_state_already_has_record() {
        let mut store = OptimisticStore::new(Vec::new());
        let placeholder = store.issue_placeholder();
        store.submit(Intent::Add {
            placeholder: placeholder.clone(),
            owner: UserId::from("user-1"),
            draft: draft("Fido"),
        });
        store.confirm_alias(placeholder.clone(), PetId::from("42"));
        store.set_confirmed(vec![pet("42", "Fido")]);

        assert_eq!(store.view().len(), 1);
        assert_eq!(store.view()[0].id, PetId::from("42"));
        assert_eq!(store.resolve(&placeholder), PetId::from("42"));
        assert!(store.contains(&placeholder));
    }

    #[test]
    fn pending_edit_on_placeholder_follows_alias() {
        let mut store = OptimisticStore::new(Vec::new());
        let placeholder = store.issue_placeholder();
        let add = store.submit(Intent::Add {
            placeholder: placeholder.clone(),
            owner: UserId::from("user-1"),
            draft: draft("Fido"),
        });
        store.submit(rename(placeholder.as_str(), "Bolt"));

        store.confirm_alias(placeholder, PetId::from("42"));
        store.set_confirmed(vec![pet("42", "Fido")]);
        store.retire(add);

        assert_eq!(store.view().len(), 1);
        assert_eq!(store.view()[0].id, PetId::from("42"));
        assert_eq!(store.view()[0].name, "Bolt");
    }

    fn add(store: &mut OptimisticStore, name: &str) -> (PetId, Ticket) {
        let placeholder = store.issue_placeholder();
        let ticket = store.submit(Intent::Add {
            placeholder: placeholder.clone(),
            owner: UserId::from("user-1"),
            draft: draft(name),
        });
        (placeholder, ticket)
    }

    fn confirmed_from_draft(id: &str, name: &str) -> Pet {
        Pet::from_draft(PetId::from(id), UserId::from("user-1"), draft(name))
    }

    #[test]
    fn pending_add_is_not_shown_twice_once_refresh_brings_its_record() {
        let mut store = OptimisticStore::new(Vec::new());
        let (first, _) = add(&mut store, "Fido");
        let (second, _) = add(&mut store, "Bolt");

        // The first add is confirmed; its refresh already contains the
        // second add's record, whose own confirmation has not arrived yet.
        store.confirm_alias(first, PetId::from("41"));
        store.set_confirmed(vec![
            confirmed_from_draft("41", "Fido"),
            confirmed_from_draft("42", "Bolt"),
        ]);

        assert_eq!(names(store.view()), vec!["Fido", "Bolt"]);
        assert_eq!(store.resolve(&second), PetId::from("42"));
        assert!(store.contains(&second));
    }

    #[test]
    fn pending_add_does_not_adopt_a_pet_that_was_already_confirmed() {
        let mut store = OptimisticStore::new(vec![confirmed_from_draft("7", "Fido")]);
        let (placeholder, _) = add(&mut store, "Fido");

        store.set_confirmed(vec![confirmed_from_draft("7", "Fido")]);

        assert_eq!(names(store.view()), vec!["Fido", "Fido"]);
        assert_eq!(store.resolve(&placeholder), placeholder);
    }

    #[test]
    fn identical_pending_adds_adopt_distinct_records() {
        let mut store = OptimisticStore::new(Vec::new());
        let (a, _) = add(&mut store, "Fido");
        let (b, _) = add(&mut store, "Fido");

        store.set_confirmed(vec![
            confirmed_from_draft("41", "Fido"),
            confirmed_from_draft("42", "Fido"),
        ]);

        assert_eq!(store.view().len(), 2);
        assert_ne!(store.resolve(&a), store.resolve(&b));
    }

    #[test]
    fn retired_add_stops_adopting() {
        let mut store = OptimisticStore::new(Vec::new());
        let (placeholder, ticket) = add(&mut store, "Fido");
        store.set_confirmed(vec![confirmed_from_draft("41", "Fido")]);
        assert_eq!(store.resolve(&placeholder), PetId::from("41"));

        store.retire(ticket);
        assert_eq!(store.resolve(&placeholder), placeholder);
        assert_eq!(names(store.view()), vec!["Fido"]);
    }

    #[test]
    fn confirm_record_and_removal_update_confirmed_state() {
        let mut store = OptimisticStore::new(vec![pet("1", "Rex")]);
        store.confirm_record(pet("1", "Max"));
        store.confirm_record(pet("2", "Lady"));
        assert_eq!(names(store.view()), vec!["Max", "Lady"]);
        store.confirm_removal(&PetId::from("1"));
        assert_eq!(names(store.view()), vec!["Lady"]);
    }
}
