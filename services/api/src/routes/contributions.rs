//! Contribution ledger handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        contribution::{
            Contribution, ContributionChanges, ContributionLedger, ContributionQuery,
            ContributionStatus, CreateContributionRequest, DeleteContributionRequest,
            RejectContributionRequest,
        },
        membership::Capability,
    },
    notifications::NotificationEvent,
    repositories::LedgerOutcome,
    routes::{AppJson, AppPath, AppQuery, JsonOrDefault, require_capability},
    validation::{clean_text, validate_amount},
};

/// Record a pending contribution for the caller
pub async fn create_contribution(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateContributionRequest>,
) -> ApiResult<impl IntoResponse> {
    let amount = validate_amount(payload.amount)?;
    let note = clean_text(payload.note);

    require_capability(&state, payload.group_id, &user, Capability::Contribute).await?;

    let contribution = state
        .contribution_repository
        .create(
            payload.group_id,
            user.id,
            amount,
            payload.paid_at,
            note.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(contribution)))
}

/// Live contributions of a group with verified totals
pub async fn list_contributions(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(query): AppQuery<ContributionQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ContributionStatus>)
        .transpose()
        .map_err(ApiError::validation)?;

    require_capability(&state, query.group_id, &user, Capability::ViewGroup).await?;

    let items = state
        .contribution_repository
        .list_by_group(query.group_id, status)
        .await?;
    let total = state
        .summary_repository
        .group_total(query.group_id, ContributionStatus::Verified)
        .await?;
    let totals_by_member = state
        .summary_repository
        .member_totals(query.group_id, ContributionStatus::Verified)
        .await?;

    Ok(Json(ContributionLedger {
        total,
        totals_by_member,
        items,
    }))
}

/// Load a live contribution and check the caller may act on its group
async fn authorize(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    capability: Capability,
) -> ApiResult<Contribution> {
    let contribution = state
        .contribution_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contribution not found"))?;

    require_capability(state, contribution.group_id, user, capability).await?;
    Ok(contribution)
}

pub async fn verify_contribution(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &user, id, Capability::VerifyContribution).await?;

    let contribution = state
        .contribution_repository
        .verify(id, user.id)
        .await?
        .applied()
        .ok_or_else(|| ApiError::not_found("Contribution not found"))?;

    state.notifier.notify(
        &contribution.user_id.to_string(),
        NotificationEvent::ContributionVerified,
        &format!("Your contribution of {} was verified", contribution.amount),
    );

    Ok(Json(contribution))
}

pub async fn reject_contribution(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    JsonOrDefault(payload): JsonOrDefault<RejectContributionRequest>,
) -> ApiResult<impl IntoResponse> {
    let note = clean_text(payload.note);

    authorize(&state, &user, id, Capability::VerifyContribution).await?;

    let contribution = state
        .contribution_repository
        .reject(id, user.id, note.as_deref())
        .await?
        .applied()
        .ok_or_else(|| ApiError::not_found("Contribution not found"))?;

    state.notifier.notify(
        &contribution.user_id.to_string(),
        NotificationEvent::ContributionRejected,
        &format!("Your contribution of {} was rejected", contribution.amount),
    );

    Ok(Json(contribution))
}

/// Edit a contribution; verification always starts over
pub async fn edit_contribution(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(mut changes): AppJson<ContributionChanges>,
) -> ApiResult<impl IntoResponse> {
    if let Some(amount) = changes.amount {
        changes.amount = Some(validate_amount(amount)?);
    }
    if let Some(note) = changes.note.take() {
        changes.note = Some(clean_text(note));
    }

    authorize(&state, &user, id, Capability::EditContribution).await?;

    match state
        .contribution_repository
        .edit(id, user.id, &changes)
        .await?
    {
        LedgerOutcome::Applied(contribution) => Ok(Json(contribution)),
        LedgerOutcome::NotFound => Err(ApiError::not_found("Contribution not found")),
        LedgerOutcome::AlreadyDeleted => {
            Err(ApiError::conflict("Cannot edit a deleted contribution"))
        }
    }
}

/// Soft-delete a contribution
pub async fn delete_contribution(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    JsonOrDefault(payload): JsonOrDefault<DeleteContributionRequest>,
) -> ApiResult<impl IntoResponse> {
    let reason = clean_text(payload.reason);

    authorize(&state, &user, id, Capability::EditContribution).await?;

    match state
        .contribution_repository
        .soft_delete(id, user.id, reason.as_deref())
        .await?
    {
        LedgerOutcome::Applied(contribution) => Ok(Json(contribution)),
        LedgerOutcome::NotFound => Err(ApiError::not_found("Contribution not found")),
        LedgerOutcome::AlreadyDeleted => Err(ApiError::conflict("Contribution already deleted")),
    }
}

/// Audit trail of a contribution, oldest first
pub async fn audit_trail(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &user, id, Capability::ViewAudit).await?;

    let entries = state.contribution_repository.audit_trail(id).await?;
    Ok(Json(entries))
}
