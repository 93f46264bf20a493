use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{MatchedPath, Path, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Json, RequestPartsExt};
use http_body_util::LengthLimitError;
use serde_json::{json, Value};
use tracing::warn;
use url::form_urlencoded;

use crate::descriptor::OperationKey;
use crate::guard::{Denied, EnforcementGuard, Principal, RequestParams};

/// Largest request body buffered for id resolution.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

impl IntoResponse for Denied {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": self.to_string(),
                "reason": self.code(),
            })),
        )
            .into_response()
    }
}

fn body_rejection(operation: &OperationKey, err: axum::Error) -> Response {
    let message = err.to_string();
    let (status, reason) = if err.into_inner().is::<LengthLimitError>() {
        (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
    } else {
        (StatusCode::BAD_REQUEST, "body_unreadable")
    };
    warn!(target = "permission-guard", %operation, error = %message, reason, "request body rejected");
    (
        status,
        Json(json!({
            "error": format!("Cannot read request body: {message}"),
            "reason": reason,
        })),
    )
        .into_response()
}

/// Route middleware enforcing the guard's permission table.
///
/// Install with `route_layer` so the matched route template is known.
pub async fn permission_middleware(
    State(guard): State<Arc<EnforcementGuard>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let Some(route) = parts.extensions.get::<MatchedPath>().map(|path| path.as_str().to_owned())
    else {
        return next.run(Request::from_parts(parts, body)).await;
    };
    let operation = OperationKey::new(parts.method.clone(), route);
    let principal = parts.extensions.get::<Principal>().cloned();

    let mut params = RequestParams::default();
    let body = if guard.table().is_declared(&operation) {
        params.path = parts
            .extract::<Path<HashMap<String, String>>>()
            .await
            .map(|Path(values)| values)
            .unwrap_or_default();
        params.query = parts
            .uri
            .query()
            .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let bytes = match to_bytes(body, DEFAULT_BODY_LIMIT).await {
            Ok(bytes) => bytes,
            Err(err) => return body_rejection(&operation, err),
        };
        if !bytes.is_empty() {
            params.body = serde_json::from_slice::<Value>(&bytes).ok();
        }
        Body::from(bytes)
    } else {
        body
    };

    match guard
        .authorize(&operation, principal.as_ref(), &params)
        .await
    {
        Ok(_) => next.run(Request::from_parts(parts, body)).await,
        Err(denied) => denied.into_response(),
    }
}
