//! Aggregation read models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Verified total for one contributor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MemberTotal {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub total: Decimal,
}

/// Raw per-month aggregate as returned by storage; months without
/// activity are absent
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct MonthAggregate {
    pub month: i32,
    pub in_total: Decimal,
    pub tx_count: i64,
}

/// One calendar month of the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummaryRow {
    /// `YYYY-MM`
    pub month: String,
    pub in_total: Decimal,
    pub out_total: Decimal,
    pub net: Decimal,
    pub tx_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub group_id: Uuid,
    pub year: i32,
    pub months: Vec<MonthlySummaryRow>,
}

/// Query parameters for the monthly summary
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    pub year: Option<i32>,
}

/// Expand sparse month aggregates into exactly twelve rows, January first
///
/// Aggregates with a month outside 1..=12 are ignored.
pub fn fill_year(year: i32, aggregates: &[MonthAggregate]) -> Vec<MonthlySummaryRow> {
    (1..=12)
        .map(|month| {
            let (in_total, tx_count) = aggregates
                .iter()
                .find(|a| a.month == month)
                .map(|a| (a.in_total, a.tx_count))
                .unwrap_or((Decimal::ZERO, 0));

            MonthlySummaryRow {
                month: format!("{:04}-{:02}", year, month),
                in_total,
                out_total: Decimal::ZERO,
                net: in_total,
                tx_count,
            }
        })
        .collect()
}
