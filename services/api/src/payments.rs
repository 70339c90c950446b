//! Payment gateway boundary: checkout links and webhook interpretation
//!
//! The gateway is expected to send an explicit `status`. Inferring the
//! target from the free-text `event` name is kept only for older
//! integrations and never leaves this module.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::models::job::{Job, PaymentStatus};

/// Request for a hosted checkout link
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub job_id: Uuid,
    pub amount_cents: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

/// Asynchronous payment event pushed by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub job_id: Uuid,
    pub status: Option<String>,
    pub event: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub message: String,
    pub job: Job,
}

/// Whole positive cents, or zero for anything else
pub fn normalise_amount(amount_cents: f64) -> i64 {
    if !amount_cents.is_finite() || amount_cents <= 0.0 {
        return 0;
    }
    amount_cents.floor() as i64
}

/// Checkout URL carrying the job id, plus amount and currency when the
/// amount is positive
pub fn checkout_url(
    base_url: &str,
    currency: &str,
    job_id: Uuid,
    amount_cents: f64,
) -> Result<String, String> {
    let id = job_id.to_string();
    let amount = normalise_amount(amount_cents);

    let mut params: Vec<(&str, String)> = vec![("id", id)];
    if amount > 0 {
        params.push(("amount", amount.to_string()));
        params.push(("currency", currency.to_string()));
    }

    Url::parse_with_params(base_url, &params)
        .map(|url| url.to_string())
        .map_err(|e| format!("Invalid checkout base URL: {}", e))
}

/// Why a webhook payload could not be mapped to a payment state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// Neither `status` nor `event` was usable
    Undetermined,
    /// `status` named a state the webhook may not drive
    Unsupported(String),
}

impl std::fmt::Display for WebhookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookError::Undetermined => {
                f.write_str("Unable to determine payment status from payload")
            }
            WebhookError::Unsupported(status) => {
                write!(f, "Unsupported payment status: {}", status)
            }
        }
    }
}

/// Target payment state for a webhook; an explicit status wins over the
/// event name
pub fn resolve_webhook_status(
    status: Option<&str>,
    event: Option<&str>,
) -> Result<PaymentStatus, WebhookError> {
    if let Some(status) = status.map(str::trim).filter(|s| !s.is_empty()) {
        return match status.to_ascii_uppercase().as_str() {
            "ESCROW" => Ok(PaymentStatus::Escrow),
            "PAID" => Ok(PaymentStatus::Paid),
            other => Err(WebhookError::Unsupported(other.to_string())),
        };
    }

    let event = event
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or(WebhookError::Undetermined)?;

    if ["escrow", "payment_success", "payment_completed"]
        .iter()
        .any(|k| event.contains(k))
    {
        return Ok(PaymentStatus::Escrow);
    }

    if ["paid", "release"].iter().any(|k| event.contains(k)) {
        return Ok(PaymentStatus::Paid);
    }

    Err(WebhookError::Undetermined)
}

/// Compare a presented webhook secret without leaking where it differs
pub fn secret_matches(expected: &str, presented: Option<&str>) -> bool {
    presented.is_some_and(|p| bool::from(p.as_bytes().ct_eq(expected.as_bytes())))
}
