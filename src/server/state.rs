use std::sync::Arc;

use rebac_authz_client::AuthorizationClient;
use rebac_permission_guard::{EnforcementGuard, PermissionTable};

use crate::auth::IdentityHeader;
use crate::projects::Project;
use crate::storage::{InMemoryRepository, Repository};
use crate::sync::LifecycleSync;

/// Shared handles cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub projects: Arc<dyn Repository<Project>>,
    pub authz: AuthorizationClient,
    pub sync: LifecycleSync,
    pub guard: Arc<EnforcementGuard>,
    pub identity: Arc<IdentityHeader>,
}

impl AppState {
    pub fn new(
        authz: AuthorizationClient,
        projects: Arc<dyn Repository<Project>>,
        table: PermissionTable,
        identity: IdentityHeader,
    ) -> Self {
        Self {
            guard: Arc::new(EnforcementGuard::new(authz.clone(), table)),
            sync: LifecycleSync::new(authz.clone()),
            authz,
            projects,
            identity: Arc::new(identity),
        }
    }

    /// In-memory project store with the default permission table.
    pub fn in_memory(authz: AuthorizationClient, identity: IdentityHeader) -> Self {
        Self::new(
            authz,
            Arc::new(InMemoryRepository::<Project>::new()),
            crate::policy::permission_table(),
            identity,
        )
    }
}
