//! Read-side aggregates over the contribution ledger
//!
//! Every query excludes soft-deleted rows and filters on a single status,
//! which callers default to `verified`.

use common::error::DatabaseResult;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::contribution::ContributionStatus;
use crate::models::summary::{MemberTotal, MonthAggregate, MonthlySummaryRow, fill_year};

/// Aggregation repository
#[derive(Clone)]
pub struct SummaryRepository {
    pool: PgPool,
}

impl SummaryRepository {
    /// Create a new summary repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sum per contributor, largest first
    pub async fn member_totals(
        &self,
        group_id: Uuid,
        status: ContributionStatus,
    ) -> DatabaseResult<Vec<MemberTotal>> {
        let totals = sqlx::query_as::<_, MemberTotal>(
            r#"
            SELECT c.user_id, u.username, SUM(c.amount) AS total
            FROM contributions c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.group_id = $1
              AND c.status = $2
              AND c.deleted_at IS NULL
            GROUP BY c.user_id, u.username
            ORDER BY total DESC, c.user_id ASC
            "#,
        )
        .bind(group_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Sum over the whole group, zero when nothing matches
    pub async fn group_total(
        &self,
        group_id: Uuid,
        status: ContributionStatus,
    ) -> DatabaseResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM contributions
            WHERE group_id = $1
              AND status = $2
              AND deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Twelve monthly rows for `year`, bucketed by payment date in UTC
    pub async fn monthly_summary(
        &self,
        group_id: Uuid,
        year: i32,
        status: ContributionStatus,
    ) -> DatabaseResult<Vec<MonthlySummaryRow>> {
        let aggregates = sqlx::query_as::<_, MonthAggregate>(
            r#"
            SELECT EXTRACT(MONTH FROM COALESCE(paid_at, created_at) AT TIME ZONE 'UTC')::INT AS month,
                   SUM(amount) AS in_total,
                   COUNT(*) AS tx_count
            FROM contributions
            WHERE group_id = $1
              AND status = $2
              AND deleted_at IS NULL
              AND EXTRACT(YEAR FROM COALESCE(paid_at, created_at) AT TIME ZONE 'UTC')::INT = $3
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(group_id)
        .bind(status)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(fill_year(year, &aggregates))
    }
}
