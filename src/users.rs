//! Operations on the calling user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::delete;
use axum::Router;
use tracing::{info, instrument};

use crate::auth::CurrentPrincipal;
use crate::errors::ApiError;
use crate::server::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/users/me", delete(delete_me))
}

/// Drop every relationship the caller holds. Account data itself lives with
/// the identity provider.
#[instrument(name = "rebac.users.delete_me", skip_all, fields(subject = principal.subject_id()))]
async fn delete_me(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> Result<StatusCode, ApiError> {
    let user = principal.party()?;
    state
        .sync
        .principal_removed(&user)
        .await
        .map_err(|err| ApiError::sync_failure(user.id(), err))?;
    info!("user relationships removed");
    Ok(StatusCode::NO_CONTENT)
}
