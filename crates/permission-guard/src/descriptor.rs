use std::collections::HashMap;
use std::fmt;

use axum::http::Method;
use rebac_authz_types::{PartyKind, Relation};

/// Permission required on one resource before an operation may run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PermissionDescriptor {
    pub permission: Relation,
    pub object_kind: PartyKind,
    /// Name of the path, query or body field holding the resource id.
    pub object_id_source: &'static str,
}

impl PermissionDescriptor {
    pub const fn new(
        permission: Relation,
        object_kind: PartyKind,
        object_id_source: &'static str,
    ) -> Self {
        Self {
            permission,
            object_kind,
            object_id_source,
        }
    }
}

/// Identity of an operation: HTTP method plus route template.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub method: Method,
    pub route: String,
}

impl OperationKey {
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.route)
    }
}

/// Operation to descriptor lookup consulted by the guard.
#[derive(Clone, Debug, Default)]
pub struct PermissionTable {
    entries: HashMap<OperationKey, Vec<PermissionDescriptor>>,
}

impl PermissionTable {
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder::default()
    }

    /// Descriptors declared for `operation`, or `None` when it declares none.
    pub fn descriptors(&self, operation: &OperationKey) -> Option<&[PermissionDescriptor]> {
        self.entries
            .get(operation)
            .map(Vec::as_slice)
            .filter(|descriptors| !descriptors.is_empty())
    }

    pub fn is_declared(&self, operation: &OperationKey) -> bool {
        self.descriptors(operation).is_some()
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationKey> {
        self.entries.keys()
    }
}

#[derive(Debug, Default)]
pub struct PermissionTableBuilder {
    entries: HashMap<OperationKey, Vec<PermissionDescriptor>>,
}

impl PermissionTableBuilder {
    /// Declare descriptors for an operation; repeated declarations append.
    pub fn operation(
        mut self,
        method: Method,
        route: &str,
        descriptors: impl IntoIterator<Item = PermissionDescriptor>,
    ) -> Self {
        self.entries
            .entry(OperationKey::new(method, route))
            .or_default()
            .extend(descriptors);
        self
    }

    pub fn build(self) -> PermissionTable {
        PermissionTable {
            entries: self.entries,
        }
    }
}
