//! Pet route handlers: health, list, create, update, delete.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use petsoft_core::{validate_pet_form, validate_pet_id, validate_pet_patch, ValidationError};
use petsoft_storage::actions::MSG_INVALID_PET;
use petsoft_storage::{ActionError, ErrorKind, PetActions, UserIdentity};
use serde_json::Value;

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /pets
pub(crate) async fn handle_list_pets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserIdentity>,
) -> Response {
    match state.actions_for(user).list_pets().await {
        Ok(pets) => (StatusCode::OK, Json(pets)).into_response(),
        Err(err) => action_error(err),
    }
}

/// POST /pets
pub(crate) async fn handle_create_pet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserIdentity>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(raw) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected(rejection),
    };
    let draft = match validate_pet_form(&raw) {
        Ok(draft) => draft,
        Err(err) => return invalid_payload(&err),
    };
    match state.actions_for(user).add_pet(draft).await {
        Ok(pet) => (StatusCode::CREATED, Json(pet)).into_response(),
        Err(err) => action_error(err),
    }
}

/// PUT /pets/{id}
pub(crate) async fn handle_update_pet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserIdentity>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let id = match validate_pet_id(&id) {
        Ok(id) => id,
        Err(err) => return invalid_payload(&err),
    };
    let Json(raw) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected(rejection),
    };
    let patch = match validate_pet_patch(&raw) {
        Ok(patch) => patch,
        Err(err) => return invalid_payload(&err),
    };
    match state.actions_for(user).edit_pet(&id, patch).await {
        Ok(pet) => (StatusCode::OK, Json(pet)).into_response(),
        Err(err) => action_error(err),
    }
}

/// DELETE /pets/{id}
pub(crate) async fn handle_delete_pet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> Response {
    let id = match validate_pet_id(&id) {
        Ok(id) => id,
        Err(err) => return invalid_payload(&err),
    };
    match state.actions_for(user).delete_pet(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => action_error(err),
    }
}

fn invalid_payload(err: &ValidationError) -> Response {
    let body = serde_json::json!({
        "error": MSG_INVALID_PET,
        "details": err.to_string(),
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// A body the JSON extractor refused (bad content type, malformed JSON),
/// reported in the usual error shape.
pub(crate) fn rejected(rejection: JsonRejection) -> Response {
    tracing::debug!(status = %rejection.status(), "request body rejected");
    json_error(rejection.status(), &rejection.body_text()).into_response()
}

/// Map a failed action onto an HTTP status.
pub(crate) fn action_error(err: ActionError) -> Response {
    let status = if err.login_required {
        StatusCode::UNAUTHORIZED
    } else {
        match err.kind {
            ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PersistenceFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    };
    json_error(status, &err.message).into_response()
}
