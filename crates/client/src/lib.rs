//! Client-side optimistic pet list.
//!
//! [`OptimisticStore`] derives the displayed list from the last confirmed
//! state plus pending intents; [`Coordinator`] submits intents, calls the
//! authoritative [`PetActions`](petsoft_storage::PetActions) and retires
//! each intent once the call resolves.

pub mod coordinator;
pub mod intent;
pub mod selection;
pub mod store;

pub use coordinator::{Coordinator, MutationError, Outcome};
pub use intent::{Intent, Ticket};
pub use selection::Selection;
pub use store::{apply, fold, OptimisticStore, PLACEHOLDER_PREFIX};
