//! `petsoft serve` -- HTTP JSON API over the pet server actions.
//!
//! Security features:
//! - Bearer session tokens resolved through the user directory
//! - Pet routes gated on paid lifetime access (402 otherwise)
//! - Webhook authenticated by a shared `X-Webhook-Secret`
//! - CORS headers on all responses (permissive for local dev)
//! - Per-IP rate limiting (default: 60 req/min, configurable)
//!
//! Endpoints:
//! - GET    /health             - Server status (no auth)
//! - GET    /pets               - The caller's pets
//! - POST   /pets               - Add a pet
//! - PUT    /pets/{id}          - Edit a pet (any subset of fields)
//! - DELETE /pets/{id}          - Delete a pet
//! - POST   /payment/checkout   - Open a hosted checkout session
//! - POST   /payment/webhook    - Provider callback: session paid (no bearer auth)
//!
//! All responses use Content-Type: application/json. Errors are
//! `{"error": message}`.

mod handlers;
mod middleware;
mod payment;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_create_pet, handle_delete_pet, handle_health, handle_list_pets, handle_not_found,
    handle_update_pet,
};
use self::middleware::{auth_middleware, rate_limit_middleware, require_access};
use self::payment::{handle_checkout, handle_webhook};
use self::state::AppState;
use crate::config::ServeConfig;

/// Maximum request body size: 64 KB. Pet payloads are a few hundred bytes.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Assemble the router and its middleware stack.
fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let pets = Router::new()
        .route("/pets", get(handle_list_pets).post(handle_create_pet))
        .route(
            "/pets/{id}",
            put(handle_update_pet).delete(handle_delete_pet),
        )
        .route_layer(axum_middleware::from_fn(require_access));

    Router::new()
        .route("/health", get(handle_health))
        .route("/payment/checkout", post(handle_checkout))
        .route("/payment/webhook", post(handle_webhook))
        .merge(pets)
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl+C.
pub(crate) async fn start_server(config: ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(&config).await);

    if state.webhook_secret.is_none() {
        tracing::warn!("no checkout.webhook_secret configured, payment webhook disabled");
    }
    tracing::info!(
        rate_limit = config.rate_limit,
        users = config.users.len(),
        "rate limit: {} requests per minute per IP",
        config.rate_limit
    );

    let app = router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("PetSoft listening on http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
