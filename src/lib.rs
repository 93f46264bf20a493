//! Relationship-based access control for a project-management API.
//!
//! Requests pass through identity extraction, then the permission guard, then
//! the handlers, which keep the policy oracle's relationships in step with
//! project lifecycle events.

pub mod auth;
pub mod errors;
pub mod policy;
pub mod projects;
pub mod server;
pub mod settings;
pub mod storage;
pub mod sync;
pub mod users;

pub use errors::ApiError;
pub use server::{build_router, AppState};
pub use settings::{load_settings, AppSettings};
