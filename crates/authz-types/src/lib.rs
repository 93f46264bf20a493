//! Identity and resource references exchanged with the policy oracle.
//!
//! Every principal and every resource is a [`Party`]: a closed [`PartyKind`]
//! plus an opaque id. Relationships between two parties are named by a
//! [`Relation`] and travel to the oracle as a [`TupleKey`].

mod party;
mod vocabulary;

pub use party::{Party, PartyObject, TupleKey};
pub use vocabulary::{PartyKind, Relation, WILDCARD};

use thiserror::Error;

/// Errors raised while constructing vocabulary values.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PartyError {
    #[error("invalid party kind: {0}")]
    InvalidPartyKind(String),
    #[error("invalid relation: {0}")]
    InvalidRelation(String),
    #[error("party id must not be empty")]
    EmptyId,
    #[error("malformed party reference: {0}")]
    Malformed(String),
}
