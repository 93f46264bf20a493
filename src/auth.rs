//! Principal extraction from the identity proxy header.

use std::sync::Arc;

use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderName, Request};
use axum::middleware::Next;
use axum::response::Response;
use rebac_authz_types::Party;
use rebac_permission_guard::{Denied, Principal};
use tracing::debug;

use crate::errors::ApiError;

/// Header carrying the verified subject id.
#[derive(Clone, Debug)]
pub struct IdentityHeader(pub HeaderName);

/// Copy the subject header into a [`Principal`] request extension.
///
/// The header is trusted as-is; verification happens upstream. A missing or
/// blank header leaves the request anonymous.
pub async fn identity_middleware(
    State(header): State<Arc<IdentityHeader>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().remove::<Principal>();
    let subject = request
        .headers()
        .get(&header.0)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    match subject {
        Some(subject) => {
            request.extensions_mut().insert(Principal::new(subject));
        }
        None => debug!(path = %request.uri().path(), "anonymous request"),
    }
    next.run(request).await
}

/// The calling principal, required by the handler.
#[derive(Clone, Debug)]
pub struct CurrentPrincipal(pub Principal);

impl CurrentPrincipal {
    pub fn subject_id(&self) -> &str {
        &self.0.subject_id
    }

    pub fn party(&self) -> Result<Party, ApiError> {
        Party::user(self.subject_id()).map_err(|_| ApiError::Denied(Denied::MissingPrincipal))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or(ApiError::Denied(Denied::MissingPrincipal))
    }
}
