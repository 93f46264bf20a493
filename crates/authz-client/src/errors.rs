use std::time::Duration;

use rebac_authz_types::PartyError;
use thiserror::Error;

/// Failures talking to the policy oracle.
#[derive(Clone, Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid oracle response: {0}")]
    InvalidResponse(String),
}

impl OracleError {
    /// Transport-level failures, as opposed to the oracle answering with an error.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, OracleError::Unavailable(_) | OracleError::Timeout(_))
    }
}

/// Errors surfaced by [`crate::AuthorizationClient`].
#[derive(Clone, Debug, Error)]
pub enum AuthzError {
    /// A relationship write or delete failed; domain and policy state have diverged.
    #[error("authorization sync failed during {operation} of {tuple}: {source}")]
    Sync {
        operation: &'static str,
        tuple: String,
        #[source]
        source: OracleError,
    },
    #[error("authorization query {operation} failed: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: OracleError,
    },
    #[error("invalid relationship tuple: {0}")]
    InvalidTuple(String),
    #[error(transparent)]
    Party(#[from] PartyError),
}

impl AuthzError {
    pub fn is_sync_failure(&self) -> bool {
        matches!(self, AuthzError::Sync { .. })
    }
}
