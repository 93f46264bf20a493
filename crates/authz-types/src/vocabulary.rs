use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PartyError;

/// Literal the oracle uses for "any user", "any relation" and "any object".
pub const WILDCARD: &str = "*";

/// Kinds of parties known to the authorization model.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    User,
    Project,
}

impl PartyKind {
    pub const ALL: [PartyKind; 2] = [PartyKind::User, PartyKind::Project];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::User => "user",
            PartyKind::Project => "project",
        }
    }

    /// Relations that may be written with an object of this kind.
    pub fn relations(&self) -> &'static [Relation] {
        match self {
            PartyKind::User => &[],
            PartyKind::Project => &[Relation::Owner, Relation::Admin, Relation::Member],
        }
    }

    pub fn accepts(&self, relation: Relation) -> bool {
        self.relations().contains(&relation)
    }
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartyKind {
    type Err = PartyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        PartyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| PartyError::InvalidPartyKind(raw.to_string()))
    }
}

/// Relation names exchanged with the oracle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "owner")]
    Owner,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "member")]
    Member,
    /// Matches every relation; only meaningful in bulk deletes.
    #[serde(rename = "*")]
    Any,
}

impl Relation {
    pub const ALL: [Relation; 4] = [
        Relation::Owner,
        Relation::Admin,
        Relation::Member,
        Relation::Any,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Owner => "owner",
            Relation::Admin => "admin",
            Relation::Member => "member",
            Relation::Any => WILDCARD,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Relation::Any)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = PartyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Relation::ALL
            .into_iter()
            .find(|relation| relation.as_str() == raw)
            .ok_or_else(|| PartyError::InvalidRelation(raw.to_string()))
    }
}
