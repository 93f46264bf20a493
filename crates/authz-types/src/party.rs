use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::vocabulary::{PartyKind, Relation, WILDCARD};
use crate::PartyError;

/// A typed reference to a principal or a resource.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Party {
    kind: PartyKind,
    id: String,
}

/// Structured `{type, id}` form used by bulk queries.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PartyObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl Party {
    pub fn new(kind: PartyKind, id: impl Into<String>) -> Result<Self, PartyError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PartyError::EmptyId);
        }
        Ok(Self { kind, id })
    }

    pub fn user(id: impl Into<String>) -> Result<Self, PartyError> {
        Self::new(PartyKind::User, id)
    }

    pub fn project(id: impl Into<String>) -> Result<Self, PartyError> {
        Self::new(PartyKind::Project, id)
    }

    /// Build from an untyped kind name, as found in declarations and payloads.
    pub fn from_parts(kind: &str, id: impl Into<String>) -> Result<Self, PartyError> {
        Self::new(kind.parse()?, id)
    }

    /// Parse a canonical `kind:id` string. The id is everything after the
    /// first separator, so it may itself contain `:`.
    pub fn parse(canonical: &str) -> Result<Self, PartyError> {
        let (kind, id) = canonical
            .split_once(':')
            .ok_or_else(|| PartyError::Malformed(canonical.to_string()))?;
        Self::from_parts(kind, id)
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn to_canonical_string(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }

    pub fn to_canonical_object(&self) -> PartyObject {
        PartyObject {
            kind: self.kind.as_str().to_string(),
            id: self.id.clone(),
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for Party {
    type Err = PartyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Party::parse(raw)
    }
}

/// Tuple as written to or deleted from the oracle.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TupleKey {
    pub user: String,
    pub relation: String,
    pub object: String,
}

impl TupleKey {
    pub fn new(user: &Party, relation: Relation, object: &Party) -> Self {
        Self {
            user: user.to_canonical_string(),
            relation: relation.as_str().to_string(),
            object: object.to_canonical_string(),
        }
    }

    /// Every tuple whose object is `object`.
    pub fn any_on_object(object: &Party) -> Self {
        Self {
            user: WILDCARD.to_string(),
            relation: WILDCARD.to_string(),
            object: object.to_canonical_string(),
        }
    }

    /// Every tuple whose user is `user`.
    pub fn any_for_user(user: &Party) -> Self {
        Self {
            user: user.to_canonical_string(),
            relation: WILDCARD.to_string(),
            object: WILDCARD.to_string(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.user == WILDCARD || self.relation == WILDCARD || self.object == WILDCARD
    }

    /// Whether this (possibly wildcard) pattern covers `other`.
    pub fn matches(&self, other: &TupleKey) -> bool {
        fn field(pattern: &str, value: &str) -> bool {
            pattern == WILDCARD || pattern == value
        }
        field(&self.user, &other.user)
            && field(&self.relation, &other.relation)
            && field(&self.object, &other.object)
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_string_is_kind_colon_id() {
        let party = Party::user("auth0|1234567890").unwrap();
        assert_eq!(party.to_canonical_string(), "user:auth0|1234567890");
        assert_eq!(party.to_string(), "user:auth0|1234567890");
    }

    #[test]
    fn canonical_object_uses_type_field() {
        let party = Party::project("p-1").unwrap();
        let value = serde_json::to_value(party.to_canonical_object()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "project", "id": "p-1"}));
    }

    #[test]
    fn rejects_empty_id_and_unknown_kind() {
        assert_eq!(Party::project(""), Err(PartyError::EmptyId));
        assert_eq!(
            Party::from_parts("team", "x"),
            Err(PartyError::InvalidPartyKind("team".into()))
        );
    }

    #[test]
    fn parse_keeps_colons_in_id() {
        let party = Party::parse("user:google-oauth2:42").unwrap();
        assert_eq!(party.kind(), PartyKind::User);
        assert_eq!(party.id(), "google-oauth2:42");
        assert!(Party::parse("no-separator").is_err());
    }

    #[test]
    fn wildcard_patterns_match_concrete_tuples() {
        let alice = Party::user("alice").unwrap();
        let project = Party::project("p1").unwrap();
        let other = Party::project("p2").unwrap();
        let tuple = TupleKey::new(&alice, Relation::Owner, &project);

        assert!(TupleKey::any_on_object(&project).matches(&tuple));
        assert!(!TupleKey::any_on_object(&other).matches(&tuple));
        assert!(TupleKey::any_for_user(&alice).matches(&tuple));
        assert!(!tuple.is_wildcard());
        assert!(TupleKey::any_for_user(&alice).is_wildcard());
    }
}
