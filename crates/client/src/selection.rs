use petsoft_core::PetId;

use crate::store::OptimisticStore;

/// The pet currently being inspected or edited, held apart from the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(Option<PetId>);

impl Selection {
    pub fn select(&mut self, id: PetId) {
        self.0 = Some(id);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn id(&self) -> Option<&PetId> {
        self.0.as_ref()
    }

    /// Whether the selection points at `id`, following confirmed aliases.
    pub fn is(&self, id: &PetId, store: &OptimisticStore) -> bool {
        self.0
            .as_ref()
            .is_some_and(|selected| store.resolve(selected) == store.resolve(id))
    }

    /// Re-point a confirmed placeholder at its real id; clear the
    /// selection if the pet is no longer in the view.
    pub fn reconcile(&mut self, store: &OptimisticStore) {
        let Some(selected) = self.0.take() else {
            return;
        };
        let resolved = store.resolve(&selected);
        if store.contains(&resolved) {
            self.0 = Some(resolved);
        } else {
            tracing::debug!(pet_id = %selected, "selection cleared, pet left the view");
        }
    }
}
