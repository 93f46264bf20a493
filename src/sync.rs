//! Relationship upkeep tied to domain lifecycle events.
//!
//! Each hook runs after the domain change it mirrors has been persisted. A
//! failure here means the oracle no longer agrees with the store, so it is
//! returned to the caller instead of being swallowed.

use rebac_authz_client::{AuthorizationClient, AuthzError};
use rebac_authz_types::{Party, Relation};
use tracing::info;

#[derive(Clone)]
pub struct LifecycleSync {
    client: AuthorizationClient,
}

impl LifecycleSync {
    pub fn new(client: AuthorizationClient) -> Self {
        Self { client }
    }

    /// The creator becomes owner of the new resource.
    pub async fn resource_created(&self, creator: &Party, resource: &Party) -> Result<(), AuthzError> {
        self.client
            .write_relationship(creator, resource, Relation::Owner)
            .await?;
        info!(%creator, %resource, "owner relationship recorded");
        Ok(())
    }

    pub async fn member_added(
        &self,
        member: &Party,
        resource: &Party,
        role: Relation,
    ) -> Result<(), AuthzError> {
        self.client.write_relationship(member, resource, role).await
    }

    /// Removes exactly the `(member, role, resource)` tuple; other roles the
    /// member holds on the resource stay in place.
    pub async fn member_removed(
        &self,
        member: &Party,
        resource: &Party,
        role: Relation,
    ) -> Result<(), AuthzError> {
        self.client.delete_relationship(member, resource, role).await
    }

    pub async fn resource_deleted(&self, resource: &Party) -> Result<(), AuthzError> {
        self.client.remove_all_for_object(resource).await
    }

    pub async fn principal_removed(&self, principal: &Party) -> Result<(), AuthzError> {
        self.client.remove_all_for_user(principal).await
    }
}
