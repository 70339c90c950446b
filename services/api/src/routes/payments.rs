//! Payment handlers: checkout links and the gateway webhook

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use tracing::{error, warn};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::job::{Job, PaymentStatus},
    notifications::NotificationEvent,
    payments::{
        CheckoutRequest, CheckoutResponse, WebhookPayload, WebhookResponse, checkout_url,
        resolve_webhook_status, secret_matches,
    },
    routes::AppJson,
};

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Hosted checkout link for one of the caller's jobs; the amount defaults
/// to the job price
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CheckoutRequest>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .job_repository
        .find_by_id(payload.job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if job.customer_id != user.id {
        return Err(ApiError::forbidden("Only the job's customer can pay for it"));
    }

    let amount = payload
        .amount_cents
        .filter(|a| a.is_finite())
        .unwrap_or(job.price_cents as f64);

    let url = checkout_url(
        &state.config.payment_checkout_base_url,
        &state.config.payment_currency,
        job.id,
        amount,
    )
    .map_err(|e| {
        error!("Failed to build checkout URL: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(CheckoutResponse { checkout_url: url }))
}

/// Tell the bound provider their payout was released
pub(crate) fn notify_release(state: &AppState, job: &Job) {
    if let Some(provider_id) = job.provider_id {
        state.notifier.notify(
            &provider_id.to_string(),
            NotificationEvent::PaymentReleased,
            &format!(
                "Payment of {} cents released for job {}",
                job.provider_payout_cents, job.id
            ),
        );
    }
}

/// Gateway callback driving a job's payment to ESCROW or PAID
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<WebhookPayload>,
) -> ApiResult<impl IntoResponse> {
    if let Some(secret) = &state.config.payment_webhook_secret {
        let presented = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if !secret_matches(secret, presented) {
            warn!("Webhook for job {} rejected: bad secret", payload.job_id);
            return Err(ApiError::Unauthorized);
        }
    }

    let target = resolve_webhook_status(payload.status.as_deref(), payload.event.as_deref())
        .map_err(|e| {
            warn!("Webhook for job {} rejected: {}", payload.job_id, e);
            ApiError::validation(e.to_string())
        })?;

    if state
        .job_repository
        .find_by_id(payload.job_id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Job not found"));
    }

    let job = state
        .job_repository
        .advance_payment(payload.job_id, target)
        .await?
        .ok_or_else(|| match target {
            PaymentStatus::Escrow => ApiError::conflict("Payment already escrowed or released"),
            _ => ApiError::conflict("Payment has not been escrowed yet or is already released"),
        })?;

    let message = match target {
        PaymentStatus::Escrow => "Payment moved to escrow",
        _ => {
            notify_release(&state, &job);
            "Payment released to provider"
        }
    };

    Ok(Json(WebhookResponse {
        message: message.to_string(),
        job,
    }))
}
