//! Review handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        job::JobStatus,
        review::{ProviderReviews, SubmitReviewRequest, SubmitReviewResponse, validate_rating},
    },
    routes::{AppJson, AppPath},
};

/// Review a completed job, once, as its customer
pub async fn submit_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<SubmitReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let rating = validate_rating(payload.rating).map_err(ApiError::validation)?;
    let comment = payload
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::validation("Comment is required"))?;

    let job = state
        .job_repository
        .find_by_id(payload.job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if job.customer_id != user.id {
        return Err(ApiError::forbidden("Only the job's customer can review it"));
    }

    let provider_id = job
        .provider_id
        .ok_or_else(|| ApiError::validation("Job does not have an assigned provider to review"))?;

    if job.status != JobStatus::Completed {
        return Err(ApiError::validation("Only completed jobs can be reviewed"));
    }

    let review = state
        .review_repository
        .create(job.id, provider_id, rating, comment)
        .await?
        .ok_or_else(|| ApiError::conflict("This job has already been reviewed"))?;

    let reviews = state
        .review_repository
        .list_for_provider(provider_id)
        .await?;
    let summary = ProviderReviews::new(provider_id, reviews);

    Ok((
        StatusCode::CREATED,
        Json(SubmitReviewResponse {
            review,
            provider_rating: summary.rating,
        }),
    ))
}

/// All reviews of a provider with the running average
pub async fn provider_reviews(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(provider_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let reviews = state
        .review_repository
        .list_for_provider(provider_id)
        .await?;

    Ok(Json(ProviderReviews::new(provider_id, reviews)))
}
