use std::collections::BTreeSet;

use rebac_authz_types::{PartyKind, Relation};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    #[serde(default)]
    pub name: String,
}

impl CreateProject {
    pub fn validated_name(&self) -> Result<&str, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        Ok(name)
    }
}

/// Body of both member add and member removal.
#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub role: String,
}

impl MembershipRequest {
    pub fn validate(&self) -> Result<(&str, Relation), ApiError> {
        let user_id = self.user_id.trim();
        if user_id.is_empty() {
            return Err(ApiError::Validation("userId must not be empty".into()));
        }
        let role = self
            .role
            .parse::<Relation>()
            .ok()
            .filter(|role| PartyKind::Project.accepts(*role))
            .ok_or_else(|| {
                ApiError::Validation(format!(
                    "role must be one of owner, admin, member (got '{}')",
                    self.role
                ))
            })?;
        Ok((user_id, role))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub role: Relation,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberView {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub roles: BTreeSet<Relation>,
}
