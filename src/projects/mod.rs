//! Project resources and their membership.

mod dto;
mod handlers;
mod model;

pub use dto::{CreateProject, MemberView, Membership, MembershipRequest};
pub use model::Project;

use axum::routing::get;
use axum::Router;

use crate::policy::{PROJECT_MEMBERS_ROUTE, PROJECT_ROUTE};
use crate::server::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            PROJECT_ROUTE,
            get(handlers::get_project).delete(handlers::delete_project),
        )
        .route(
            PROJECT_MEMBERS_ROUTE,
            get(handlers::list_members)
                .post(handlers::add_member)
                .delete(handlers::remove_member),
        )
}
