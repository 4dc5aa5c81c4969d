//! Payload validation for raw pet input.
//!
//! Raw input (a submitted form, a JSON request body) is first normalised
//! the way the web form is read: strings are trimmed, a numeric-string or
//! integral `age` is coerced to an integer, a blank `imageUrl` means "no
//! image" and unknown keys are dropped. The normalised object is then checked against
//! the embedded JSON Schema. Only input that passes both steps becomes a
//! typed [`PetDraft`] or [`PetPatch`].

use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::pet::{PetDraft, PetId, PetPatch};

static PET_FORM_SCHEMA_STR: &str = include_str!("../schema/pet-form-schema.json");
static PET_PATCH_SCHEMA_STR: &str = include_str!("../schema/pet-patch-schema.json");

/// Maximum length (in characters) of `name` and `ownerName`.
pub const MAX_NAME_LEN: usize = 100;
/// Maximum length (in characters) of `imageUrl`.
pub const MAX_IMAGE_URL_LEN: usize = 500;
/// Maximum length (in characters) of `notes`.
pub const MAX_NOTES_LEN: usize = 1000;
/// Largest accepted `age`.
pub const MAX_AGE: u32 = 99_999;
/// Maximum length of a pet id.
pub const MAX_ID_LEN: usize = 64;

const FIELDS: [&str; 5] = ["name", "ownerName", "imageUrl", "age", "notes"];

/// Why a payload or identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The raw input was not a JSON object.
    #[error("invalid pet data: expected an object")]
    NotAnObject,

    /// The normalised input violated the pet schema.
    #[error("invalid pet data: {}", .errors.join("; "))]
    Schema { errors: Vec<String> },

    /// A typed field is out of bounds.
    #[error("invalid pet data: {field} {message}")]
    Field { field: &'static str, message: String },

    /// The pet id is empty, too long, or contains characters outside
    /// `[A-Za-z0-9_-]`.
    #[error("invalid pet id: {id:?}")]
    InvalidId { id: String },

    /// The embedded schema could not be compiled.
    #[error("internal error: failed to compile embedded {name} schema: {message}")]
    SchemaCompile { name: &'static str, message: String },
}

/// Validate raw input for a new pet.
pub fn validate_pet_form(raw: &Value) -> Result<PetDraft, ValidationError> {
    let normalized = normalize(raw, Mode::Form)?;
    check_schema(form_validator()?, &normalized)?;

    let draft: PetDraft =
        serde_json::from_value(normalized).map_err(|e| ValidationError::Schema {
            errors: vec![e.to_string()],
        })?;
    draft.validate()?;
    Ok(draft)
}

/// Validate raw input for an edit. At least one known field must be present.
pub fn validate_pet_patch(raw: &Value) -> Result<PetPatch, ValidationError> {
    let normalized = normalize(raw, Mode::Patch)?;
    check_schema(patch_validator()?, &normalized)?;

    let obj = normalized.as_object().ok_or(ValidationError::NotAnObject)?;
    let string = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    let patch = PetPatch {
        name: string("name"),
        owner_name: string("ownerName"),
        image_url: obj
            .get("imageUrl")
            .map(|v| v.as_str().map(str::to_string)),
        age: obj.get("age").map(typed_age).transpose()?,
        notes: string("notes"),
    };
    patch.validate()?;
    Ok(patch)
}

fn typed_age(value: &Value) -> Result<u32, ValidationError> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ValidationError::Field {
            field: "age",
            message: format!("must be a whole number, got {value}"),
        })
}

/// Validate a pet identifier.
pub fn validate_pet_id(raw: &str) -> Result<PetId, ValidationError> {
    let well_formed = !raw.is_empty()
        && raw.len() <= MAX_ID_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(PetId::new(raw))
    } else {
        Err(ValidationError::InvalidId { id: raw.to_string() })
    }
}

pub(crate) fn check_draft(draft: &PetDraft) -> Result<(), ValidationError> {
    check_name("name", &draft.name)?;
    check_name("ownerName", &draft.owner_name)?;
    if let Some(url) = &draft.image_url {
        check_image_url(url)?;
    }
    check_age(draft.age)?;
    check_notes(&draft.notes)
}

pub(crate) fn check_patch(patch: &PetPatch) -> Result<(), ValidationError> {
    if patch.is_empty() {
        return Err(ValidationError::Field {
            field: "patch",
            message: "must set at least one field".to_string(),
        });
    }
    if let Some(name) = &patch.name {
        check_name("name", name)?;
    }
    if let Some(owner_name) = &patch.owner_name {
        check_name("ownerName", owner_name)?;
    }
    if let Some(Some(url)) = &patch.image_url {
        check_image_url(url)?;
    }
    if let Some(age) = patch.age {
        check_age(age)?;
    }
    if let Some(notes) = &patch.notes {
        check_notes(notes)?;
    }
    Ok(())
}

fn check_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(field_error(field, "is required"));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(field_error(
            field,
            &format!("exceeds {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

fn check_image_url(url: &str) -> Result<(), ValidationError> {
    if url.chars().count() > MAX_IMAGE_URL_LEN {
        return Err(field_error(
            "imageUrl",
            &format!("exceeds {MAX_IMAGE_URL_LEN} characters"),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(field_error("imageUrl", "must be an http(s) URL"));
    }
    Ok(())
}

fn check_age(age: u32) -> Result<(), ValidationError> {
    if age > MAX_AGE {
        return Err(field_error("age", &format!("exceeds {MAX_AGE}")));
    }
    Ok(())
}

fn check_notes(notes: &str) -> Result<(), ValidationError> {
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(field_error(
            "notes",
            &format!("exceeds {MAX_NOTES_LEN} characters"),
        ));
    }
    Ok(())
}

fn field_error(field: &'static str, message: &str) -> ValidationError {
    ValidationError::Field {
        field,
        message: message.to_string(),
    }
}

// ── Normalisation ────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Form,
    Patch,
}

fn normalize(raw: &Value, mode: Mode) -> Result<Value, ValidationError> {
    let input = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    let mut out = Map::new();

    for key in FIELDS {
        let Some(value) = input.get(key) else {
            continue;
        };
        let value = match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other.clone(),
        };

        match key {
            "imageUrl" => {
                let blank = matches!(&value, Value::Null)
                    || value.as_str().is_some_and(str::is_empty);
                match (blank, mode) {
                    (true, Mode::Form) => {}
                    (true, Mode::Patch) => {
                        out.insert(key.to_string(), Value::Null);
                    }
                    (false, _) => {
                        out.insert(key.to_string(), value);
                    }
                }
            }
            "age" => {
                out.insert(key.to_string(), coerce_age(value));
            }
            _ => {
                out.insert(key.to_string(), value);
            }
        }
    }

    Ok(Value::Object(out))
}

/// Numeric strings and integral floats (`"4"`, `4.0`) become integers.
/// Anything else is left for the schema to reject.
fn coerce_age(value: Value) -> Value {
    let integral = match &value {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) if !n.is_i64() && !n.is_u64() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= f64::from(MAX_AGE) + 1.0)
            .map(|f| f as i64),
        _ => None,
    };
    integral.map(Value::from).unwrap_or(value)
}

// ── Schema ───────────────────────────────────────────────────────────────

type CompiledSchema = Result<jsonschema::Validator, ValidationError>;

fn form_validator() -> Result<&'static jsonschema::Validator, ValidationError> {
    static FORM: OnceLock<CompiledSchema> = OnceLock::new();
    FORM.get_or_init(|| compile("pet form", PET_FORM_SCHEMA_STR))
        .as_ref()
        .map_err(|e| e.clone())
}

fn patch_validator() -> Result<&'static jsonschema::Validator, ValidationError> {
    static PATCH: OnceLock<CompiledSchema> = OnceLock::new();
    PATCH
        .get_or_init(|| compile("pet patch", PET_PATCH_SCHEMA_STR))
        .as_ref()
        .map_err(|e| e.clone())
}

fn compile(name: &'static str, source: &str) -> CompiledSchema {
    let schema: Value =
        serde_json::from_str(source).map_err(|e| ValidationError::SchemaCompile {
            name,
            message: e.to_string(),
        })?;
    jsonschema::validator_for(&schema).map_err(|e| ValidationError::SchemaCompile {
        name,
        message: e.to_string(),
    })
}

fn check_schema(validator: &jsonschema::Validator, doc: &Value) -> Result<(), ValidationError> {
    let errors: Vec<String> = validator
        .iter_errors(doc)
        .map(|e| format!("{}", e))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Schema { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_trims_and_coerces() {
        let draft = validate_pet_form(&json!({
            "name": "  Rex ",
            "ownerName": "Ann",
            "imageUrl": "",
            "age": " 4 ",
            "notes": "",
            "csrfToken": "ignored"
        }))
        .unwrap();
        assert_eq!(draft.name, "Rex");
        assert_eq!(draft.image_url, None);
        assert_eq!(draft.age, 4);
    }

    #[test]
    fn form_requires_fields() {
        let err = validate_pet_form(&json!({"name": "Rex"})).unwrap_err();
        assert!(matches!(err, ValidationError::Schema { .. }), "{err:?}");
    }

    #[test]
    fn form_rejects_blank_name() {
        let err = validate_pet_form(&json!({
            "name": "   ",
            "ownerName": "Ann",
            "age": 1,
            "notes": ""
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Schema { .. }), "{err:?}");
    }

    #[test]
    fn form_rejects_non_numeric_age() {
        let err = validate_pet_form(&json!({
            "name": "Rex",
            "ownerName": "Ann",
            "age": "old",
            "notes": ""
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Schema { .. }), "{err:?}");
    }

    #[test]
    fn form_rejects_non_object() {
        assert_eq!(
            validate_pet_form(&json!(["Rex"])).unwrap_err(),
            ValidationError::NotAnObject
        );
    }

    #[test]
    fn patch_keeps_only_present_fields() {
        let patch = validate_pet_patch(&json!({"name": "Max"})).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Max"));
        assert_eq!(patch.owner_name, None);
        assert_eq!(patch.image_url, None);
    }

    #[test]
    fn patch_blank_image_clears_it() {
        let patch = validate_pet_patch(&json!({"imageUrl": "  "})).unwrap();
        assert_eq!(patch.image_url, Some(None));
    }

    #[test]
    fn integral_float_age_is_kept_on_both_paths() {
        let patch = validate_pet_patch(&json!({"name": "Max", "age": 4.0})).unwrap();
        assert_eq!(patch.age, Some(4));

        let draft = validate_pet_form(&json!({
            "name": "Max",
            "ownerName": "Ann",
            "age": 4.0,
            "notes": ""
        }))
        .unwrap();
        assert_eq!(draft.age, 4);
    }

    #[test]
    fn fractional_age_is_rejected_on_both_paths() {
        assert!(validate_pet_patch(&json!({"age": 4.5})).is_err());
        assert!(validate_pet_form(&json!({
            "name": "Max",
            "ownerName": "Ann",
            "age": 4.5,
            "notes": ""
        }))
        .is_err());
    }

    #[test]
    fn patch_must_not_be_empty() {
        assert!(validate_pet_patch(&json!({})).is_err());
        assert!(validate_pet_patch(&json!({"unknown": 1})).is_err());
    }

    #[test]
    fn id_charset_and_length() {
        assert!(validate_pet_id("pet-12_a").is_ok());
        assert!(validate_pet_id("").is_err());
        assert!(validate_pet_id("pet 1").is_err());
        assert!(validate_pet_id(&"x".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn typed_draft_bounds() {
        let draft = PetDraft {
            name: "Rex".to_string(),
            owner_name: "Ann".to_string(),
            image_url: Some("ftp://nope".to_string()),
            age: 2,
            notes: String::new(),
        };
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::Field {
                field: "imageUrl",
                ..
            })
        ));
    }
}
