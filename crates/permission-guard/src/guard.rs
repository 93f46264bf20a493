use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use rebac_authz_client::AuthorizationClient;
use rebac_authz_types::{Party, PartyKind, Relation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::descriptor::{OperationKey, PermissionTable};

/// Authenticated caller, produced upstream by identity verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject_id: String,
}

impl Principal {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
        }
    }
}

/// Where a request may carry resource ids.
#[derive(Clone, Debug, Default)]
pub struct RequestParams {
    pub path: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

impl RequestParams {
    /// Look `source` up in path, then query, then top-level body fields.
    /// Empty values count as absent.
    pub fn resolve(&self, source: &str) -> Option<String> {
        let from_map = |map: &HashMap<String, String>| {
            map.get(source).filter(|value| !value.is_empty()).cloned()
        };

        from_map(&self.path)
            .or_else(|| from_map(&self.query))
            .or_else(|| {
                match self.body.as_ref()?.get(source)? {
                    Value::String(value) if !value.is_empty() => Some(value.clone()),
                    Value::Number(number) => Some(number.to_string()),
                    _ => None,
                }
            })
    }
}

/// Successful guard outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The operation declares no permissions; nothing was checked.
    Open,
    /// Every declared check passed.
    Granted,
}

/// Reasons a request is refused before the operation runs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Denied {
    #[error("No user found in request")]
    MissingPrincipal,
    #[error("Cannot find parameter '{source_name}' in request")]
    ParameterNotFound { source_name: String },
    #[error("Insufficient permissions for {permission} on {object_kind}")]
    InsufficientPermission {
        permission: Relation,
        object_kind: PartyKind,
    },
}

impl Denied {
    pub fn code(&self) -> &'static str {
        match self {
            Denied::MissingPrincipal => "missing_principal",
            Denied::ParameterNotFound { .. } => "parameter_not_found",
            Denied::InsufficientPermission { .. } => "permission_denied",
        }
    }
}

pub struct EnforcementGuard {
    client: AuthorizationClient,
    table: Arc<PermissionTable>,
}

impl EnforcementGuard {
    pub fn new(client: AuthorizationClient, table: PermissionTable) -> Self {
        Self {
            client,
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    pub async fn authorize(
        &self,
        operation: &OperationKey,
        principal: Option<&Principal>,
        params: &RequestParams,
    ) -> Result<Decision, Denied> {
        let Some(descriptors) = self.table.descriptors(operation) else {
            debug!(target = "permission-guard", %operation, "no permissions declared");
            return Ok(Decision::Open);
        };

        let user = principal
            .and_then(|principal| Party::user(principal.subject_id.as_str()).ok())
            .ok_or_else(|| self.deny(operation, Denied::MissingPrincipal))?;

        // One outcome per descriptor, in declaration order: `None` when the id
        // is missing, otherwise the check result. Every resolvable check runs.
        let outcomes = join_all(descriptors.iter().map(|descriptor| {
            let object = params
                .resolve(descriptor.object_id_source)
                .and_then(|id| Party::new(descriptor.object_kind, id).ok());
            let user = &user;
            async move {
                match object {
                    Some(object) => {
                        Some(self.client.check(user, descriptor.permission, &object).await)
                    }
                    None => None,
                }
            }
        }))
        .await;

        for (descriptor, outcome) in descriptors.iter().zip(outcomes) {
            let reason = match outcome {
                Some(true) => continue,
                Some(false) => Denied::InsufficientPermission {
                    permission: descriptor.permission,
                    object_kind: descriptor.object_kind,
                },
                None => Denied::ParameterNotFound {
                    source_name: descriptor.object_id_source.to_string(),
                },
            };
            return Err(self.deny(operation, reason));
        }

        debug!(target = "permission-guard", %operation, %user, "permissions granted");
        Ok(Decision::Granted)
    }

    fn deny(&self, operation: &OperationKey, reason: Denied) -> Denied {
        info!(
            target = "permission-guard",
            %operation,
            reason = reason.code(),
            "request denied: {reason}"
        );
        reason
    }
}
