//! Job repository for database operations
//!
//! Status and payment changes are compare-and-swap updates: the expected
//! current state is part of the `WHERE` clause, so of two racing callers at
//! most one sees a row come back.

use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::job::{
    Job, JobFilter, JobStatus, NewJob, PaymentStatus, calculate_payouts,
};

const JOB_COLUMNS: &str = "id, customer_id, provider_id, service_type, notes, status, suburb, \
     price_cents, payment_status, provider_payout_cents, platform_commission_cents, \
     created_at, updated_at, scheduled_at, started_at, completed_at, \
     payment_escrowed_at, payment_released_at";

/// Job repository
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Number of jobs ever created
    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn create(&self, job: &NewJob) -> DatabaseResult<Job> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs (customer_id, service_type, notes, suburb, price_cents, scheduled_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.customer_id)
        .bind(&job.service_type)
        .bind(&job.notes)
        .bind(&job.suburb)
        .bind(job.price_cents)
        .bind(job.scheduled_at)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Created job {} ({}, {} cents) for customer {}",
            job.id, job.service_type, job.price_cents, job.customer_id
        );
        Ok(job)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Jobs matching the filter, newest first; an empty status list matches
    /// every status
    pub async fn list(&self, filter: &JobFilter) -> DatabaseResult<Vec<Job>> {
        let statuses: Vec<String> = filter
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let jobs = sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE ($1::UUID IS NULL OR customer_id = $1)
              AND ($2::UUID IS NULL OR provider_id = $2)
              AND (cardinality($3::TEXT[]) = 0 OR status::TEXT = ANY($3))
            ORDER BY created_at DESC, id ASC
            "#
        ))
        .bind(filter.customer_id)
        .bind(filter.provider_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Move a job from `from` to `to`, binding `provider_id` when given
    ///
    /// `started_at` is set on the first entry to IN_PROGRESS only.
    /// Returns `None` when the job is no longer in `from`.
    pub async fn transition(
        &self,
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
        provider_id: Option<Uuid>,
    ) -> DatabaseResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = $3,
                provider_id = COALESCE($4, provider_id),
                updated_at = NOW(),
                started_at = CASE
                    WHEN $3 = 'IN_PROGRESS'::job_status THEN COALESCE(started_at, NOW())
                    ELSE started_at
                END,
                completed_at = CASE
                    WHEN $3 = 'COMPLETED'::job_status THEN NOW()
                    ELSE completed_at
                END
            WHERE id = $1 AND status = $2
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(job) = &job {
            info!("Job {} moved from {} to {}", job.id, from, to);
        }
        Ok(job)
    }

    /// Hold the job's payment in escrow, splitting the price into
    /// commission and payout; `None` unless the payment is PENDING
    pub async fn move_to_escrow(&self, id: Uuid) -> DatabaseResult<Option<Job>> {
        let Some(current) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let payouts = calculate_payouts(current.price_cents);

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET payment_status = $2,
                platform_commission_cents = $4,
                provider_payout_cents = $5,
                payment_escrowed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND payment_status = $3 AND price_cents = $6
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(PaymentStatus::Escrow)
        .bind(PaymentStatus::Pending)
        .bind(payouts.platform_commission_cents)
        .bind(payouts.provider_payout_cents)
        .bind(current.price_cents)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(job) = &job {
            info!(
                "Job {} payment escrowed: commission {}, payout {}",
                job.id, job.platform_commission_cents, job.provider_payout_cents
            );
        }
        Ok(job)
    }

    /// Release an escrowed payment; `None` unless the payment is ESCROW
    pub async fn release_payment(&self, id: Uuid) -> DatabaseResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET payment_status = $2,
                payment_released_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND payment_status = $3
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(PaymentStatus::Paid)
        .bind(PaymentStatus::Escrow)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(job) = &job {
            info!("Job {} payment released", job.id);
        }
        Ok(job)
    }

    /// Drive the payment to `target` if it sits in the required predecessor
    /// state
    pub async fn advance_payment(
        &self,
        id: Uuid,
        target: PaymentStatus,
    ) -> DatabaseResult<Option<Job>> {
        match target {
            PaymentStatus::Escrow => self.move_to_escrow(id).await,
            PaymentStatus::Paid => self.release_payment(id).await,
            PaymentStatus::Pending => Ok(None),
        }
    }
}
