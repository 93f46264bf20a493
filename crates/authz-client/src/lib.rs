//! Client-side access to the relationship-based policy oracle.
//!
//! [`AuthorizationClient`] is built once at startup and shared by reference
//! across request handlers. Checks fail closed: any transport error, oracle
//! error or timeout resolves to "deny". Writes and deletes surface failures
//! as [`AuthzError::Sync`] because they leave domain and policy state
//! diverged.

pub mod config;
mod credentials;
mod errors;
mod http_transport;
mod memory;
mod transport;

pub use crate::config::{ConfigError, OracleBackend, OracleSettings};
pub use credentials::ClientCredentials;
pub use errors::{AuthzError, OracleError};
pub use http_transport::HttpOracle;
pub use memory::{InMemoryOracle, RelationModel};
pub use transport::{ListedUser, OracleTransport, WriteRequest};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rebac_authz_types::{Party, PartyKind, Relation, TupleKey};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// User id mapped to every relation it holds on one object.
pub type UserRelations = BTreeMap<String, BTreeSet<Relation>>;

const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct AuthorizationClient {
    transport: Arc<dyn OracleTransport>,
    check_timeout: Duration,
}

impl AuthorizationClient {
    pub fn new(transport: Arc<dyn OracleTransport>) -> Self {
        Self {
            transport,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    pub fn with_check_timeout(mut self, check_timeout: Duration) -> Self {
        self.check_timeout = check_timeout;
        self
    }

    /// Build the transport selected by `settings`.
    pub fn connect(settings: &OracleSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let transport: Arc<dyn OracleTransport> = match settings.backend {
            OracleBackend::Memory => {
                Arc::new(InMemoryOracle::with_model(RelationModel::hierarchical()))
            }
            OracleBackend::Http => {
                let api_url = settings.api_url.as_deref().unwrap_or_default();
                let store_id = settings.store_id.as_deref().unwrap_or_default();
                let mut oracle = HttpOracle::new(api_url, store_id, settings.request_timeout()?)?
                    .with_authorization_model(settings.authorization_model_id.clone());
                if let Some(credentials) = settings.credentials.clone() {
                    oracle = oracle.with_credentials(credentials);
                }
                Arc::new(oracle)
            }
        };
        info!(
            target = "authz-client",
            backend = ?settings.backend,
            "authorization client ready"
        );
        Ok(Self::new(transport).with_check_timeout(settings.check_timeout()?))
    }

    /// Whether `principal` holds `permission` on `object`. Never errors:
    /// anything other than an explicit grant is a denial.
    pub async fn check(&self, principal: &Party, permission: Relation, object: &Party) -> bool {
        if permission.is_wildcard() {
            warn!(target = "authz-client", %principal, %object, "wildcard check denied");
            return false;
        }

        let tuple = TupleKey::new(principal, permission, object);
        match timeout(self.check_timeout, self.transport.check(&tuple)).await {
            Ok(Ok(allowed)) => {
                debug!(target = "authz-client", %tuple, allowed, "check resolved");
                allowed
            }
            Ok(Err(err)) => {
                warn!(target = "authz-client", %tuple, error = %err, "check failed; denying");
                false
            }
            Err(_) => {
                warn!(
                    target = "authz-client",
                    %tuple,
                    timeout = ?self.check_timeout,
                    "check timed out; denying"
                );
                false
            }
        }
    }

    /// Ids of every `object_kind` resource on which `principal` holds `relation`.
    pub async fn list_object_ids(
        &self,
        principal: &Party,
        object_kind: PartyKind,
        relation: Relation,
    ) -> Result<Vec<String>, AuthzError> {
        let objects = self
            .transport
            .list_objects(
                &principal.to_canonical_string(),
                relation.as_str(),
                object_kind.as_str(),
            )
            .await
            .map_err(|source| query_error("list_objects", source))?;

        objects
            .iter()
            .map(|object| match object.split_once(':') {
                Some((_, id)) if !id.is_empty() => Ok(id.to_string()),
                _ => Err(query_error(
                    "list_objects",
                    OracleError::InvalidResponse(format!("malformed object reference {object}")),
                )),
            })
            .collect()
    }

    /// Users holding any of `relations` on `object`, with the relations each holds.
    ///
    /// One query per relation runs concurrently. All of them are awaited and
    /// a single failure fails the whole call.
    pub async fn list_users_by_relations(
        &self,
        object: &Party,
        relations: &[Relation],
    ) -> Result<UserRelations, AuthzError> {
        let object_ref = object.to_canonical_object();
        let queries = relations.iter().map(|relation| {
            let object_ref = &object_ref;
            async move {
                self.transport
                    .list_users(object_ref, relation.as_str(), PartyKind::User.as_str())
                    .await
                    .map(|users| (*relation, users))
            }
        });

        let mut merged = UserRelations::new();
        for result in join_all(queries).await {
            let (relation, users) = result.map_err(|source| query_error("list_users", source))?;
            for user in users.into_iter().filter_map(|entry| entry.object) {
                merged.entry(user.id).or_default().insert(relation);
            }
        }
        Ok(merged)
    }

    pub async fn write_relationship(
        &self,
        user: &Party,
        object: &Party,
        relation: Relation,
    ) -> Result<(), AuthzError> {
        validate_relation(object, relation)?;
        let tuple = TupleKey::new(user, relation, object);
        self.submit("write", WriteRequest::write(tuple)).await
    }

    /// Deleting a tuple that does not exist succeeds.
    pub async fn delete_relationship(
        &self,
        user: &Party,
        object: &Party,
        relation: Relation,
    ) -> Result<(), AuthzError> {
        validate_relation(object, relation)?;
        let tuple = TupleKey::new(user, relation, object);
        self.submit("delete", WriteRequest::delete(tuple)).await
    }

    /// Delete every tuple whose object is `object`.
    pub async fn remove_all_for_object(&self, object: &Party) -> Result<(), AuthzError> {
        self.submit(
            "remove_object",
            WriteRequest::delete(TupleKey::any_on_object(object)),
        )
        .await
    }

    /// Delete every tuple whose user is `principal`.
    pub async fn remove_all_for_user(&self, principal: &Party) -> Result<(), AuthzError> {
        self.submit(
            "remove_user",
            WriteRequest::delete(TupleKey::any_for_user(principal)),
        )
        .await
    }

    async fn submit(
        &self,
        operation: &'static str,
        request: WriteRequest,
    ) -> Result<(), AuthzError> {
        let label = request
            .writes
            .iter()
            .chain(&request.deletes)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        match self.transport.write(request).await {
            Ok(()) => {
                info!(target = "authz-client", operation, tuple = %label, "relationship synced");
                Ok(())
            }
            Err(source) => {
                warn!(
                    target = "authz-client",
                    operation,
                    tuple = %label,
                    error = %source,
                    "relationship sync failed"
                );
                Err(AuthzError::Sync {
                    operation,
                    tuple: label,
                    source,
                })
            }
        }
    }
}

fn validate_relation(object: &Party, relation: Relation) -> Result<(), AuthzError> {
    if object.kind().accepts(relation) {
        Ok(())
    } else {
        Err(AuthzError::InvalidTuple(format!(
            "relation '{relation}' is not defined on {}",
            object.kind()
        )))
    }
}

fn query_error(operation: &'static str, source: OracleError) -> AuthzError {
    warn!(target = "authz-client", operation, error = %source, "oracle query failed");
    AuthzError::Query { operation, source }
}
