//! Group handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        group::CreateGroupRequest,
        membership::{Capability, RoleResponse},
    },
    routes::{AppJson, AppPath, require_capability},
    validation::clean_text,
};

const MAX_GROUP_NAME_LEN: usize = 100;

/// Create a group; the caller becomes its chairperson
pub async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Group name is required"));
    }
    if name.chars().count() > MAX_GROUP_NAME_LEN {
        return Err(ApiError::validation(format!(
            "Group name must be at most {} characters",
            MAX_GROUP_NAME_LEN
        )));
    }
    let description = clean_text(payload.description);

    let group = state
        .group_repository
        .create(name, description.as_deref(), user.id)
        .await?;

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_groups(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let groups = state.group_repository.list().await?;
    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_capability(&state, id, &user, Capability::ViewGroup).await?;

    let group = state
        .group_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found"))?;

    Ok(Json(group))
}

/// Caller's own role in the group
pub async fn my_role(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let role = state
        .membership_repository
        .get_role(id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this group"))?;

    Ok(Json(RoleResponse { role }))
}
