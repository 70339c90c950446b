//! Job lifecycle handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::job::{
        CreateJobRequest, JobFilter, JobListQuery, JobRole, JobStatus, NewJob,
        UpdateJobStatusRequest,
    },
    notifications::{NotificationEvent, PROVIDER_POOL},
    routes::{AppJson, AppPath, AppQuery, payments::notify_release},
};

/// Create a job for the caller and tell the provider pool about it
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateJobRequest>,
) -> ApiResult<impl IntoResponse> {
    let seed = state.job_repository.count().await?;
    let new_job = NewJob::resolve(user.id, &payload, seed, Utc::now());
    let job = state.job_repository.create(&new_job).await?;

    state.notifier.notify(
        PROVIDER_POOL,
        NotificationEvent::JobCreated,
        &format!("New {} job in {}", job.service_type, job.suburb),
    );

    Ok((StatusCode::CREATED, Json(job)))
}

/// List jobs; `role` narrows to the customer or provider side of `user_id`
/// (the caller when omitted)
pub async fn list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(query): AppQuery<JobListQuery>,
) -> ApiResult<impl IntoResponse> {
    let statuses = query.statuses().map_err(ApiError::validation)?;
    let subject = query.user_id.unwrap_or(user.id);

    let filter = JobFilter {
        customer_id: (query.role == Some(JobRole::Customer)).then_some(subject),
        provider_id: (query.role == Some(JobRole::Provider)).then_some(subject),
        statuses,
    };

    let jobs = state.job_repository.list(&filter).await?;
    Ok(Json(jobs))
}

/// Move a job along its lifecycle
///
/// A provider accepts a job by binding themselves to it; afterwards only
/// the customer or that provider may move it. Completing releases an
/// escrowed payment and notifies the provider.
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateJobStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let next: JobStatus = payload.status.parse().map_err(ApiError::validation)?;

    match (next, payload.provider_id) {
        (JobStatus::Accepted, None) => {
            return Err(ApiError::validation("provider_id is required to accept a job"));
        }
        (JobStatus::Accepted, Some(provider_id)) if provider_id != user.id => {
            return Err(ApiError::forbidden(
                "Providers can only accept jobs for themselves",
            ));
        }
        (JobStatus::Accepted, Some(_)) | (_, None) => {}
        (_, Some(_)) => {
            return Err(ApiError::validation(
                "provider_id can only be set when accepting a job",
            ));
        }
    }

    let current = state
        .job_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if !current.can_be_moved_by(user.id, next) {
        return Err(ApiError::forbidden(match next {
            JobStatus::Accepted => "Customers cannot accept their own jobs",
            _ => "Only the job's customer or provider can change its status",
        }));
    }

    if !current.status.can_transition_to(next) {
        return Err(ApiError::conflict(format!(
            "Cannot move job from {} to {}",
            current.status, next
        )));
    }

    let mut job = state
        .job_repository
        .transition(id, current.status, next, payload.provider_id)
        .await?
        .ok_or_else(|| ApiError::conflict("Job status changed concurrently, retry"))?;

    match next {
        JobStatus::Accepted => {
            state.notifier.notify(
                &job.customer_id.to_string(),
                NotificationEvent::JobAccepted,
                &format!("Your {} job has been accepted", job.service_type),
            );
        }
        JobStatus::Completed => {
            if let Some(released) = state.job_repository.release_payment(id).await? {
                info!("Job {} payment released after completion", id);
                job = released;
                notify_release(&state, &job);
            }
        }
        _ => {}
    }

    Ok(Json(job))
}
