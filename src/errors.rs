//! Request-scoped error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rebac_authz_client::AuthzError;
use rebac_authz_types::PartyError;
use rebac_permission_guard::Denied;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::storage::RepositoryError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Denied(#[from] Denied),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    /// A relationship write or delete failed after the domain change landed.
    #[error("{source}")]
    SyncFailure {
        resource_id: Option<String>,
        #[source]
        source: AuthzError,
    },
    #[error("authorization service unavailable: {0}")]
    OracleUnavailable(#[source] AuthzError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn sync_failure(resource_id: impl Into<String>, source: AuthzError) -> Self {
        ApiError::SyncFailure {
            resource_id: Some(resource_id.into()),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Denied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::SyncFailure { .. } => StatusCode::BAD_GATEWAY,
            ApiError::OracleUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Denied(denied) => denied.code(),
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation_failed",
            ApiError::SyncFailure { .. } => "authorization_sync_failed",
            ApiError::OracleUnavailable(_) => "authorization_unavailable",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Sync { .. } => ApiError::SyncFailure {
                resource_id: None,
                source: err,
            },
            AuthzError::Query { .. } => ApiError::OracleUnavailable(err),
            AuthzError::InvalidTuple(message) => ApiError::Validation(message),
            AuthzError::Party(party) => ApiError::Validation(party.to_string()),
        }
    }
}

impl From<PartyError> for ApiError {
    fn from(err: PartyError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Denied(denied) = self {
            return denied.into_response();
        }
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, code = self.code(), "request failed");
        }

        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let ApiError::SyncFailure {
            resource_id: Some(id),
            ..
        } = &self
        {
            body["resource_id"] = json!(id);
        }
        (status, Json(body)).into_response()
    }
}
