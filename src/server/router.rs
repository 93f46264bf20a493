use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use rebac_permission_guard::permission_middleware;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use super::state::AppState;
use crate::auth::identity_middleware;

/// Full application router.
///
/// Identity runs as an outer layer so the principal is in place before the
/// per-route permission guard.
pub fn build_router(state: AppState) -> Router {
    let guarded = Router::new()
        .merge(crate::projects::router())
        .merge(crate::users::router())
        .route_layer(from_fn_with_state(
            state.guard.clone(),
            permission_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(guarded)
        .layer(from_fn_with_state(
            state.identity.clone(),
            identity_middleware,
        ))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
