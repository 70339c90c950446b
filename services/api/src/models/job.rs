//! Job lifecycle, payment escrow states and pricing

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Platform commission in percent of the job price
pub const COMMISSION_PERCENT: i64 = 10;

/// Price charged when the service type has no entry in the price table
pub const DEFAULT_PRICE_CENTS: i64 = 4000;

/// Hours between job creation and the default scheduled start
pub const DEFAULT_SCHEDULE_OFFSET_HOURS: i64 = 4;

const PRICE_TABLE: [(&str, i64); 4] = [
    ("cleaning", 4500),
    ("plumbing", 6500),
    ("gardening", 3500),
    ("electrical", 7000),
];

const SUBURB_ROTATION: [&str; 4] = ["Sandton", "Rosebank", "Midrand", "Fourways"];

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Accepted => "ACCEPTED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    /// Statuses a job may be moved to from `self`
    pub fn allowed_next(self) -> &'static [JobStatus] {
        match self {
            JobStatus::Pending => &[JobStatus::Accepted, JobStatus::Cancelled],
            JobStatus::Accepted => &[
                JobStatus::InProgress,
                JobStatus::Completed,
                JobStatus::Cancelled,
            ],
            JobStatus::InProgress => &[
                JobStatus::InProgress,
                JobStatus::Completed,
                JobStatus::Cancelled,
            ],
            JobStatus::Completed | JobStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self.allowed_next().contains(&next)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PENDING" => Ok(JobStatus::Pending),
            "ACCEPTED" => Ok(JobStatus::Accepted),
            "IN_PROGRESS" => Ok(JobStatus::InProgress),
            "COMPLETED" => Ok(JobStatus::Completed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            other => Err(format!("Invalid job status: {}", other)),
        }
    }
}

/// Payment sub-state; only ever moves PENDING -> ESCROW -> PAID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Escrow,
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Escrow => "ESCROW",
            PaymentStatus::Paid => "PAID",
        })
    }
}

/// Job entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub service_type: String,
    pub notes: Option<String>,
    pub status: JobStatus,
    pub suburb: String,
    pub price_cents: i64,
    pub payment_status: PaymentStatus,
    pub provider_payout_cents: i64,
    pub platform_commission_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub payment_escrowed_at: Option<DateTime<Utc>>,
    pub payment_released_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Whether `actor` may move this job to `next`
    ///
    /// A provider accepts a job for themselves and never on their own job.
    /// Every later move belongs to the customer or the bound provider.
    pub fn can_be_moved_by(&self, actor: Uuid, next: JobStatus) -> bool {
        match next {
            JobStatus::Accepted => actor != self.customer_id,
            _ => actor == self.customer_id || self.provider_id == Some(actor),
        }
    }
}

/// Split of a price into platform commission and provider payout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payouts {
    pub platform_commission_cents: i64,
    pub provider_payout_cents: i64,
}

/// Commission is 10% rounded half-up on whole cents; the payout is the
/// remainder, never negative
pub fn calculate_payouts(price_cents: i64) -> Payouts {
    let price = price_cents.max(0);
    let platform_commission_cents = (price * COMMISSION_PERCENT + 50) / 100;
    let provider_payout_cents = (price - platform_commission_cents).max(0);

    Payouts {
        platform_commission_cents,
        provider_payout_cents,
    }
}

/// Display form of a service type; blank input becomes `General`
pub fn normalise_service_type(service_type: Option<&str>) -> String {
    match service_type.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "General".to_string(),
    }
}

pub fn resolve_price(service_type: Option<&str>) -> i64 {
    let key = service_type.unwrap_or_default().trim().to_ascii_lowercase();
    PRICE_TABLE
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_PRICE_CENTS)
}

/// Explicit suburb if given, otherwise a rotation slot picked by `seed`
pub fn resolve_suburb(suburb: Option<&str>, seed: i64) -> String {
    match suburb.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            let slot = seed.rem_euclid(SUBURB_ROTATION.len() as i64) as usize;
            SUBURB_ROTATION[slot].to_string()
        }
    }
}

/// Request for creating a job
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateJobRequest {
    pub service_type: Option<String>,
    pub notes: Option<String>,
    pub suburb: Option<String>,
}

/// Fully resolved job, ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub customer_id: Uuid,
    pub service_type: String,
    pub notes: Option<String>,
    pub suburb: String,
    pub price_cents: i64,
    pub scheduled_at: DateTime<Utc>,
}

impl NewJob {
    /// Resolve price, suburb and schedule for a request; `seed` picks the
    /// fallback suburb
    pub fn resolve(
        customer_id: Uuid,
        request: &CreateJobRequest,
        seed: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let service_type = request.service_type.as_deref();
        Self {
            customer_id,
            service_type: normalise_service_type(service_type),
            notes: request
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            suburb: resolve_suburb(request.suburb.as_deref(), seed),
            price_cents: resolve_price(service_type),
            scheduled_at: now + Duration::hours(DEFAULT_SCHEDULE_OFFSET_HOURS),
        }
    }
}

/// Request for moving a job to another status
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateJobStatusRequest {
    pub status: String,
    pub provider_id: Option<Uuid>,
}

/// Which side of a job the listing is filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobRole {
    Customer,
    Provider,
}

/// Query parameters for listing jobs
///
/// `status` may repeat (`status=A&status=B`) or carry a comma list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub role: Option<JobRole>,
    pub user_id: Option<Uuid>,
    #[serde(default, deserialize_with = "comma_separated")]
    pub status: Vec<String>,
}

impl JobListQuery {
    pub fn statuses(&self) -> Result<Vec<JobStatus>, String> {
        self.status.iter().map(|s| s.parse()).collect()
    }
}

fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Filter handed to the job repository
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub customer_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub statuses: Vec<JobStatus>,
}
