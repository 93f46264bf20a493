use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::Document;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// False when the owner relationship could not be recorded at creation.
    pub authz_synced: bool,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            authz_synced: true,
        }
    }
}

impl Document for Project {
    const COLLECTION: &'static str = "Project";

    fn id(&self) -> &str {
        &self.id
    }
}
