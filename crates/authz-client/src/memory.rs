use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashSet;
use rebac_authz_types::{Party, PartyObject, Relation, TupleKey};

use crate::transport::{ListedUser, OracleTransport, WriteRequest};
use crate::OracleError;

/// Which stored relations also satisfy a queried relation.
#[derive(Clone, Debug, Default)]
pub struct RelationModel {
    implied_by: HashMap<String, Vec<String>>,
}

impl RelationModel {
    /// Only exact tuples satisfy a check.
    pub fn direct() -> Self {
        Self::default()
    }

    /// `owner` implies `admin`, which implies `member`.
    pub fn hierarchical() -> Self {
        Self::direct()
            .implies(Relation::Owner, Relation::Admin)
            .implies(Relation::Owner, Relation::Member)
            .implies(Relation::Admin, Relation::Member)
    }

    pub fn implies(mut self, stronger: Relation, weaker: Relation) -> Self {
        self.implied_by
            .entry(weaker.as_str().to_string())
            .or_default()
            .push(stronger.as_str().to_string());
        self
    }

    fn satisfying<'a>(&'a self, relation: &'a str) -> impl Iterator<Item = &'a str> {
        std::iter::once(relation).chain(
            self.implied_by
                .get(relation)
                .into_iter()
                .flatten()
                .map(String::as_str),
        )
    }
}

/// Tuple store living in process memory.
#[derive(Default)]
pub struct InMemoryOracle {
    tuples: DashSet<TupleKey>,
    model: RelationModel,
    checks: AtomicUsize,
}

impl InMemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: RelationModel) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn contains(&self, tuple: &TupleKey) -> bool {
        self.tuples.contains(tuple)
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Number of `check` calls served so far.
    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    fn holds(&self, user: &str, relation: &str, object: &str) -> bool {
        self.model.satisfying(relation).any(|candidate| {
            self.tuples.contains(&TupleKey {
                user: user.to_string(),
                relation: candidate.to_string(),
                object: object.to_string(),
            })
        })
    }
}

#[async_trait]
impl OracleTransport for InMemoryOracle {
    async fn check(&self, tuple: &TupleKey) -> Result<bool, OracleError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.holds(&tuple.user, &tuple.relation, &tuple.object))
    }

    async fn list_objects(
        &self,
        user: &str,
        relation: &str,
        object_type: &str,
    ) -> Result<Vec<String>, OracleError> {
        let prefix = format!("{object_type}:");
        let candidates: HashSet<String> = self
            .tuples
            .iter()
            .filter(|tuple| tuple.user == user && tuple.object.starts_with(&prefix))
            .map(|tuple| tuple.object.clone())
            .collect();
        let mut objects: Vec<String> = candidates
            .into_iter()
            .filter(|object| self.holds(user, relation, object))
            .collect();
        objects.sort();
        Ok(objects)
    }

    async fn list_users(
        &self,
        object: &PartyObject,
        relation: &str,
        user_type: &str,
    ) -> Result<Vec<ListedUser>, OracleError> {
        let object_ref = format!("{}:{}", object.kind, object.id);
        let candidates: HashSet<String> = self
            .tuples
            .iter()
            .filter(|tuple| tuple.object == object_ref)
            .map(|tuple| tuple.user.clone())
            .collect();

        let mut parties = Vec::new();
        for user in candidates {
            if !self.holds(&user, relation, &object_ref) {
                continue;
            }
            let party = Party::parse(&user)
                .map_err(|err| OracleError::InvalidResponse(err.to_string()))?;
            if party.kind().as_str() == user_type {
                parties.push(party);
            }
        }
        parties.sort_by(|a, b| a.id().cmp(b.id()));

        let users = parties
            .iter()
            .map(|party| ListedUser {
                object: Some(party.to_canonical_object()),
            })
            .collect();
        Ok(users)
    }

    async fn write(&self, request: WriteRequest) -> Result<(), OracleError> {
        if let Some(bad) = request.writes.iter().find(|tuple| tuple.is_wildcard()) {
            return Err(OracleError::Rejected {
                status: 400,
                message: format!("cannot write wildcard tuple {bad}"),
            });
        }
        for pattern in &request.deletes {
            if pattern.is_wildcard() {
                self.tuples.retain(|tuple| !pattern.matches(tuple));
            } else {
                self.tuples.remove(pattern);
            }
        }
        for tuple in request.writes {
            self.tuples.insert(tuple);
        }
        Ok(())
    }
}
