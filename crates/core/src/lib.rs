//! petsoft-core: shared PetSoft types.
//!
//! - [`Pet`], [`PetDraft`], [`PetPatch`] -- the pet record and its payloads
//! - [`validate_pet_form`], [`validate_pet_patch`], [`validate_pet_id`] --
//!   raw input validation against the embedded JSON Schemas
//! - [`observability::init_logging`] -- `tracing` subscriber setup

pub mod observability;
pub mod pet;
pub mod validate;

pub use pet::{Pet, PetDraft, PetId, PetPatch, UserId};
pub use validate::{validate_pet_form, validate_pet_id, validate_pet_patch, ValidationError};
