//! Document persistence behind a generic CRUD repository.

use std::fmt::Debug;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{collection} with ID {id} not found")]
    NotFound { collection: &'static str, id: String },
    #[error("{collection} with ID {id} already exists")]
    Conflict { collection: &'static str, id: String },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A stored document with a string identity.
pub trait Document: Clone + Debug + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

#[async_trait]
pub trait Repository<T: Document>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<T, RepositoryError>;

    /// Documents whose ids are in `ids`, in the given order; unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<T>, RepositoryError>;

    async fn create(&self, document: T) -> Result<T, RepositoryError>;

    async fn update(&self, document: T) -> Result<T, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<T, RepositoryError>;
}

pub struct InMemoryRepository<T: Document> {
    documents: DashMap<String, T>,
}

impl<T: Document> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }
}

impl<T: Document> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn not_found(id: &str) -> RepositoryError {
        RepositoryError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl<T: Document> Repository<T> for InMemoryRepository<T> {
    async fn find_by_id(&self, id: &str) -> Result<T, RepositoryError> {
        self.documents
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<T>, RepositoryError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.documents.get(id).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn create(&self, document: T) -> Result<T, RepositoryError> {
        let id = document.id().to_string();
        match self.documents.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Err(RepositoryError::Conflict {
                collection: T::COLLECTION,
                id: entry.key().clone(),
            }),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(document.clone());
                Ok(document)
            }
        }
    }

    async fn update(&self, document: T) -> Result<T, RepositoryError> {
        let mut entry = self
            .documents
            .get_mut(document.id())
            .ok_or_else(|| Self::not_found(document.id()))?;
        *entry = document.clone();
        Ok(document)
    }

    async fn delete(&self, id: &str) -> Result<T, RepositoryError> {
        self.documents
            .remove(id)
            .map(|(_, document)| document)
            .ok_or_else(|| Self::not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Note {
        id: String,
        body: &'static str,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "Note";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, body: &'static str) -> Note {
        Note {
            id: id.into(),
            body,
        }
    }

    #[tokio::test]
    async fn not_found_is_distinct() {
        let repo = InMemoryRepository::<Note>::new();
        assert_eq!(
            repo.find_by_id("n1").await,
            Err(RepositoryError::NotFound {
                collection: "Note",
                id: "n1".into()
            })
        );
        assert!(repo.delete("n1").await.is_err());
    }

    #[tokio::test]
    async fn find_by_ids_keeps_request_order_and_skips_unknown() {
        let repo = InMemoryRepository::new();
        repo.create(note("a", "first")).await.unwrap();
        repo.create(note("b", "second")).await.unwrap();

        let found = repo
            .find_by_ids(&["b".into(), "zzz".into(), "a".into()])
            .await
            .unwrap();
        assert_eq!(found, vec![note("b", "second"), note("a", "first")]);
    }

    #[tokio::test]
    async fn create_rejects_duplicates_and_update_replaces() {
        let repo = InMemoryRepository::new();
        repo.create(note("a", "first")).await.unwrap();
        assert!(matches!(
            repo.create(note("a", "again")).await,
            Err(RepositoryError::Conflict { .. })
        ));

        repo.update(note("a", "edited")).await.unwrap();
        assert_eq!(repo.find_by_id("a").await.unwrap().body, "edited");
        assert!(repo.update(note("missing", "x")).await.is_err());
    }
}
