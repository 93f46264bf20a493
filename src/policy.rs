//! Permission declarations for every guarded route.

use axum::http::Method;
use rebac_authz_types::{PartyKind, Relation};
use rebac_permission_guard::{PermissionDescriptor, PermissionTable};

pub const PROJECT_ROUTE: &str = "/projects/:id";
pub const PROJECT_MEMBERS_ROUTE: &str = "/projects/:id/members";

const PROJECT_MEMBER: PermissionDescriptor =
    PermissionDescriptor::new(Relation::Member, PartyKind::Project, "id");
const PROJECT_ADMIN: PermissionDescriptor =
    PermissionDescriptor::new(Relation::Admin, PartyKind::Project, "id");
const PROJECT_OWNER: PermissionDescriptor =
    PermissionDescriptor::new(Relation::Owner, PartyKind::Project, "id");

/// Routes absent from this table are open. `GET /projects` filters its
/// results instead and `DELETE /users/me` only acts on the caller.
pub fn permission_table() -> PermissionTable {
    PermissionTable::builder()
        .operation(Method::GET, PROJECT_ROUTE, [PROJECT_MEMBER])
        .operation(Method::DELETE, PROJECT_ROUTE, [PROJECT_OWNER])
        .operation(Method::GET, PROJECT_MEMBERS_ROUTE, [PROJECT_MEMBER])
        .operation(Method::POST, PROJECT_MEMBERS_ROUTE, [PROJECT_ADMIN])
        .operation(Method::DELETE, PROJECT_MEMBERS_ROUTE, [PROJECT_ADMIN])
        .build()
}
