//! Pet records and the payloads that create or modify them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validate::{self, ValidationError};

/// Opaque pet identifier.
///
/// Confirmed pets carry the id assigned by the authoritative store.
/// Pets that only exist in a speculative view carry a placeholder issued
/// by the client store; placeholders are never sent as real ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetId(String);

impl PetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque user identifier, as issued by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single pet as stored by the authoritative backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: PetId,
    pub name: String,
    pub owner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub age: u32,
    pub notes: String,
    pub user_id: UserId,
}

impl Pet {
    /// Build a pet from a draft, assigning the given id and owner.
    pub fn from_draft(id: PetId, user_id: UserId, draft: PetDraft) -> Self {
        Self {
            id,
            name: draft.name,
            owner_name: draft.owner_name,
            image_url: draft.image_url,
            age: draft.age,
            notes: draft.notes,
            user_id,
        }
    }

    /// The editable fields of this pet, as a draft.
    pub fn to_draft(&self) -> PetDraft {
        PetDraft {
            name: self.name.clone(),
            owner_name: self.owner_name.clone(),
            image_url: self.image_url.clone(),
            age: self.age,
            notes: self.notes.clone(),
        }
    }

    /// Return a copy of this pet with `patch` merged over its fields.
    ///
    /// The id and owner never change through a patch.
    pub fn merged(&self, patch: &PetPatch) -> Self {
        let mut next = self.clone();
        next.merge(patch);
        next
    }

    /// Merge `patch` into this pet in place.
    pub fn merge(&mut self, patch: &PetPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(owner_name) = &patch.owner_name {
            self.owner_name = owner_name.clone();
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url = image_url.clone();
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
    }
}

/// Payload for creating a pet: every field except the id and the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetDraft {
    pub name: String,
    pub owner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub age: u32,
    pub notes: String,
}

impl PetDraft {
    /// Check the typed field bounds (lengths, age range, image URL scheme).
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::check_draft(self)
    }
}

/// Partial update for a pet.
///
/// `None` leaves a field untouched. For `image_url`, `Some(None)` clears
/// the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PetPatch {
    pub fn is_empty(&self) -> bool {
        self == &PetPatch::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::check_patch(self)
    }
}

impl From<PetDraft> for PetPatch {
    fn from(draft: PetDraft) -> Self {
        Self {
            name: Some(draft.name),
            owner_name: Some(draft.owner_name),
            image_url: Some(draft.image_url),
            age: Some(draft.age),
            notes: Some(draft.notes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rex() -> Pet {
        Pet {
            id: PetId::from("1"),
            name: "Rex".to_string(),
            owner_name: "Ann".to_string(),
            image_url: Some("https://img.example/rex.png".to_string()),
            age: 3,
            notes: "good boy".to_string(),
            user_id: UserId::from("user-1"),
        }
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let patch = PetPatch {
            name: Some("Max".to_string()),
            ..PetPatch::default()
        };
        let merged = rex().merged(&patch);
        assert_eq!(merged.name, "Max");
        assert_eq!(merged.owner_name, "Ann");
        assert_eq!(merged.age, 3);
        assert_eq!(merged.id, PetId::from("1"));
    }

    #[test]
    fn merge_can_clear_image() {
        let patch = PetPatch {
            image_url: Some(None),
            ..PetPatch::default()
        };
        assert_eq!(rex().merged(&patch).image_url, None);
    }

    #[test]
    fn full_draft_patch_overwrites_everything_but_identity() {
        let draft = PetDraft {
            name: "Fido".to_string(),
            owner_name: "Bob".to_string(),
            image_url: None,
            age: 7,
            notes: String::new(),
        };
        let merged = rex().merged(&PetPatch::from(draft.clone()));
        assert_eq!(
            merged,
            Pet::from_draft(PetId::from("1"), UserId::from("user-1"), draft)
        );
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(rex()).unwrap();
        assert_eq!(json["ownerName"], "Ann");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["imageUrl"], "https://img.example/rex.png");
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(PetPatch::default().is_empty());
        assert!(!PetPatch {
            age: Some(1),
            ..PetPatch::default()
        }
        .is_empty());
    }
}
