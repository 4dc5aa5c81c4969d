//! HTTP middleware: rate limiting, session authentication and the paid
//! access gate.

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use petsoft_storage::UserIdentity;

use super::state::AppState;

/// Paths reachable without a session token.
const PUBLIC_PATHS: [&str; 2] = ["/health", "/payment/webhook"];

/// Rate limiting middleware. Checks per-IP request rate before routing.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();
    match state.rate_limiter.check(ip).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(%ip, retry_after, "rate limit exceeded");
            let body = serde_json::json!({
                "error": "rate limit exceeded",
                "retry_after": retry_after,
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
    }
}

/// Session authentication middleware.
///
/// Every request outside [`PUBLIC_PATHS`] must carry
/// `Authorization: Bearer <token>` for a known user. The resolved
/// [`UserIdentity`] is attached as a request extension.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token else {
        return super::json_error(StatusCode::UNAUTHORIZED, "authentication required")
            .into_response();
    };

    match state.users.by_token(&token).await {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => super::json_error(StatusCode::UNAUTHORIZED, "invalid session token").into_response(),
    }
}

/// Lets only users with lifetime access through.
pub(crate) async fn require_access(request: Request<axum::body::Body>, next: Next) -> Response {
    let has_access = request
        .extensions()
        .get::<UserIdentity>()
        .is_some_and(|user| user.has_access);

    if has_access {
        next.run(request).await
    } else {
        super::json_error(StatusCode::PAYMENT_REQUIRED, "payment required").into_response()
    }
}
