use std::collections::HashMap;

use petsoft_core::{PetDraft, PetId, PetPatch, UserId};

/// One in-flight user mutation, not yet confirmed by the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Create a pet. Until confirmed it is shown under `placeholder`.
    Add {
        placeholder: PetId,
        owner: UserId,
        draft: PetDraft,
    },
    Edit {
        id: PetId,
        patch: PetPatch,
    },
    Delete {
        id: PetId,
    },
}

impl Intent {
    /// The record this intent targets.
    pub fn target(&self) -> &PetId {
        match self {
            Intent::Add { placeholder, .. } => placeholder,
            Intent::Edit { id, .. } | Intent::Delete { id } => id,
        }
    }

    /// This intent with its target rewritten through `aliases`
    /// (placeholder -> confirmed id).
    pub(crate) fn resolved(&self, aliases: &HashMap<PetId, PetId>) -> Intent {
        let Some(real) = aliases.get(self.target()) else {
            return self.clone();
        };
        match self {
            Intent::Add { owner, draft, .. } => Intent::Add {
                placeholder: real.clone(),
                owner: owner.clone(),
                draft: draft.clone(),
            },
            Intent::Edit { patch, .. } => Intent::Edit {
                id: real.clone(),
                patch: patch.clone(),
            },
            Intent::Delete { .. } => Intent::Delete { id: real.clone() },
        }
    }
}

/// Receipt for a submitted intent, used to retire it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);
