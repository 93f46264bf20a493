use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rebac_authz_types::{Party, PartyKind, Relation};
use tracing::{instrument, warn};

use super::dto::{CreateProject, MemberView, Membership, MembershipRequest};
use super::model::Project;
use crate::auth::CurrentPrincipal;
use crate::errors::ApiError;
use crate::server::AppState;

const MEMBER_LISTING_RELATIONS: [Relation; 3] = [Relation::Member, Relation::Owner, Relation::Admin];

/// Projects the caller is a member of, in oracle order.
#[instrument(name = "rebac.projects.list", skip_all, fields(subject = principal.subject_id()))]
pub(super) async fn list_projects(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> Result<Json<Vec<Project>>, ApiError> {
    let user = principal.party()?;
    let ids = state
        .authz
        .list_object_ids(&user, PartyKind::Project, Relation::Member)
        .await?;
    Ok(Json(state.projects.find_by_ids(&ids).await?))
}

#[instrument(name = "rebac.projects.create", skip_all, fields(subject = principal.subject_id()))]
pub(super) async fn create_project(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Json(body): Json<CreateProject>,
) -> Result<impl IntoResponse, ApiError> {
    let creator = principal.party()?;
    let project = state
        .projects
        .create(Project::new(body.validated_name()?))
        .await?;
    let resource = Party::project(project.id.clone())?;

    if let Err(err) = state.sync.resource_created(&creator, &resource).await {
        warn!(project = %project.id, error = %err, "owner sync failed; project kept unsynced");
        let unsynced = Project {
            authz_synced: false,
            ..project
        };
        let id = unsynced.id.clone();
        if let Err(update_err) = state.projects.update(unsynced).await {
            warn!(project = %id, error = %update_err, "failed to flag project as unsynced");
        }
        return Err(ApiError::sync_failure(id, err));
    }

    Ok((StatusCode::CREATED, Json(project)))
}

#[instrument(name = "rebac.projects.get", skip(state))]
pub(super) async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.projects.find_by_id(&id).await?))
}

#[instrument(name = "rebac.projects.delete", skip(state))]
pub(super) async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let project = state.projects.delete(&id).await?;
    let resource = Party::project(project.id.clone())?;
    state
        .sync
        .resource_deleted(&resource)
        .await
        .map_err(|err| ApiError::sync_failure(project.id, err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "rebac.projects.members", skip(state))]
pub(super) async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MemberView>>, ApiError> {
    let project = state.projects.find_by_id(&id).await?;
    let resource = Party::project(project.id)?;
    let members = state
        .authz
        .list_users_by_relations(&resource, &MEMBER_LISTING_RELATIONS)
        .await?
        .into_iter()
        .map(|(user_id, roles)| MemberView { user_id, roles })
        .collect();
    Ok(Json(members))
}

#[instrument(name = "rebac.projects.add_member", skip(state, body))]
pub(super) async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MembershipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user_id, role) = body.validate()?;
    let project = state.projects.find_by_id(&id).await?;
    let member = Party::user(user_id)?;
    let resource = Party::project(project.id.clone())?;

    state
        .sync
        .member_added(&member, &resource, role)
        .await
        .map_err(|err| ApiError::sync_failure(project.id, err))?;
    Ok((
        StatusCode::CREATED,
        Json(Membership {
            user_id: user_id.to_string(),
            role,
        }),
    ))
}

#[instrument(name = "rebac.projects.remove_member", skip(state, body))]
pub(super) async fn remove_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MembershipRequest>,
) -> Result<StatusCode, ApiError> {
    let (user_id, role) = body.validate()?;
    let project = state.projects.find_by_id(&id).await?;
    let member = Party::user(user_id)?;
    let resource = Party::project(project.id.clone())?;

    state
        .sync
        .member_removed(&member, &resource, role)
        .await
        .map_err(|err| ApiError::sync_failure(project.id, err))?;
    Ok(StatusCode::NO_CONTENT)
}
