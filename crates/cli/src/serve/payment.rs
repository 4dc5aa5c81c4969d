//! Checkout route handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use petsoft_storage::{PaymentError, UserIdentity};
use serde::Deserialize;

use super::handlers::rejected;
use super::json_error;
use super::state::AppState;

/// POST /payment/checkout
pub(crate) async fn handle_checkout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserIdentity>,
) -> Response {
    match state.checkout.create_checkout_session(&user).await {
        Ok(session) => {
            let body = serde_json::json!({
                "id": session.id,
                "url": session.url,
                "priceLabel": session.price_label,
                "successUrl": session.success_url,
                "cancelUrl": session.cancel_url,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => payment_error(err),
    }
}

/// Body the checkout provider posts once a session is paid.
#[derive(Debug, Deserialize)]
pub(crate) struct WebhookEvent {
    session_id: String,
}

/// POST /payment/webhook
pub(crate) async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<WebhookEvent>, JsonRejection>,
) -> Response {
    let provided = headers
        .get("x-webhook-secret")
        .and_then(|v| v.to_str().ok());
    let authentic = matches!(
        (state.webhook_secret.as_deref(), provided),
        (Some(expected), Some(given)) if expected == given
    );
    if !authentic {
        tracing::warn!("webhook rejected: bad secret");
        return json_error(StatusCode::FORBIDDEN, "invalid webhook secret").into_response();
    }
    let Json(event) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected(rejection),
    };

    let user_id = match state.checkout.complete(&event.session_id).await {
        Ok(user_id) => user_id,
        Err(err) => return payment_error(err),
    };

    match state.users.grant_access(&user_id).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, session_id = %event.session_id, "lifetime access granted");
            let body = serde_json::json!({
                "userId": user.id,
                "hasAccess": user.has_access,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "paid session for unknown user");
            json_error(StatusCode::NOT_FOUND, &err.to_string()).into_response()
        }
    }
}

fn payment_error(err: PaymentError) -> Response {
    let status = match &err {
        PaymentError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
        PaymentError::AlreadyCompleted { .. } | PaymentError::AlreadyPaid { .. } => {
            StatusCode::CONFLICT
        }
    };
    json_error(status, &err.to_string()).into_response()
}
