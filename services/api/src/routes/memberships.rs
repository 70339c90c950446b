//! Membership handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::membership::{
        AddMemberOutcome, AddMemberRequest, Capability, GroupRole, JoinOutcome, SetRoleRequest,
        is_self_demotion,
    },
    routes::{AppJson, AppPath, require_capability},
    validation::{normalize_phone, validate_username},
};

/// Join a group as a plain member; joining twice is not an error
pub async fn join_group(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(group_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .membership_repository
        .join(group_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found"))?;

    let status = match outcome {
        JoinOutcome::Joined(_) => StatusCode::CREATED,
        JoinOutcome::AlreadyMember(_) => StatusCode::OK,
    };

    Ok((status, Json(outcome)))
}

pub async fn leave_group(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(group_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.membership_repository.leave(group_id, user.id).await? {
        return Err(ApiError::not_found("Membership not found"));
    }

    Ok(Json(json!({ "message": "Left group" })))
}

/// Provision a member by phone number, creating the user if needed
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(group_id): AppPath<Uuid>,
    AppJson(payload): AppJson<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = validate_username(&payload.username)?;
    let phone = normalize_phone(&payload.phone)?;

    require_capability(&state, group_id, &user, Capability::AddMember).await?;

    let outcome = state
        .membership_repository
        .add_member(group_id, &username, &phone)
        .await?;

    let status = match outcome {
        AddMemberOutcome::Added(_) => StatusCode::CREATED,
        AddMemberOutcome::AlreadyMember(_) => StatusCode::OK,
    };

    Ok((status, Json(outcome)))
}

pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(group_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_capability(&state, group_id, &user, Capability::ViewGroup).await?;

    let members = state.membership_repository.list_members(group_id).await?;
    Ok(Json(members))
}

/// Members with roles and phone numbers, for officers
pub async fn list_roles(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(group_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_capability(&state, group_id, &user, Capability::ViewRoles).await?;

    let members = state
        .membership_repository
        .list_members_with_roles(group_id)
        .await?;
    Ok(Json(members))
}

pub async fn set_role(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath((group_id, target_user_id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<SetRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    let role: GroupRole = payload.role.parse().map_err(|e| {
        let allowed: Vec<&str> = GroupRole::ALL.iter().map(|r| r.as_str()).collect();
        ApiError::validation(format!("{}; expected one of {}", e, allowed.join(", ")))
    })?;

    let actor_role = require_capability(&state, group_id, &user, Capability::ChangeRole).await?;

    if is_self_demotion(user.id, actor_role, target_user_id, role) {
        return Err(ApiError::validation("You cannot demote yourself"));
    }

    let membership = state
        .membership_repository
        .set_role(group_id, target_user_id, role, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Membership not found"))?;

    Ok(Json(membership))
}
