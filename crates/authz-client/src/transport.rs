use async_trait::async_trait;
use rebac_authz_types::{PartyObject, TupleKey};
use serde::{Deserialize, Serialize};

use crate::OracleError;

/// Tuple changes submitted in one oracle write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteRequest {
    pub writes: Vec<TupleKey>,
    pub deletes: Vec<TupleKey>,
}

impl WriteRequest {
    pub fn write(tuple: TupleKey) -> Self {
        Self {
            writes: vec![tuple],
            deletes: Vec::new(),
        }
    }

    pub fn delete(tuple: TupleKey) -> Self {
        Self {
            writes: Vec::new(),
            deletes: vec![tuple],
        }
    }
}

/// A user entry returned by `list-users`. Wildcard entries carry no object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListedUser {
    #[serde(default)]
    pub object: Option<PartyObject>,
}

/// Raw operations offered by a policy oracle.
#[async_trait]
pub trait OracleTransport: Send + Sync {
    async fn check(&self, tuple: &TupleKey) -> Result<bool, OracleError>;

    /// Returns canonical `type:id` strings.
    async fn list_objects(
        &self,
        user: &str,
        relation: &str,
        object_type: &str,
    ) -> Result<Vec<String>, OracleError>;

    async fn list_users(
        &self,
        object: &PartyObject,
        relation: &str,
        user_type: &str,
    ) -> Result<Vec<ListedUser>, OracleError>;

    async fn write(&self, request: WriteRequest) -> Result<(), OracleError>;
}
