//! Per-operation permission enforcement.
//!
//! Operations declare [`PermissionDescriptor`]s in a statically built
//! [`PermissionTable`]. The [`EnforcementGuard`] looks an operation up,
//! resolves each descriptor's resource id from the request and asks the
//! authorization client. Undeclared operations are open; declared ones need
//! a principal and every check to pass.

mod descriptor;
mod guard;
mod middleware;

pub use descriptor::{OperationKey, PermissionDescriptor, PermissionTable, PermissionTableBuilder};
pub use guard::{Decision, Denied, EnforcementGuard, Principal, RequestParams};
pub use middleware::{permission_middleware, DEFAULT_BODY_LIMIT};
