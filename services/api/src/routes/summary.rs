//! Aggregation handlers

use axum::{Json, extract::State, response::IntoResponse};
use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiResult,
    middleware::AuthUser,
    models::{
        contribution::ContributionStatus,
        membership::Capability,
        summary::{MonthlySummary, SummaryQuery},
    },
    routes::{AppPath, AppQuery, require_capability},
    validation::validate_year,
};

/// Twelve monthly rows of verified contributions; `year` defaults to the
/// current year
pub async fn monthly_summary(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(group_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<SummaryQuery>,
) -> ApiResult<impl IntoResponse> {
    let year = validate_year(query.year.unwrap_or_else(|| Utc::now().year()))?;

    require_capability(&state, group_id, &user, Capability::ViewGroup).await?;

    let months = state
        .summary_repository
        .monthly_summary(group_id, year, ContributionStatus::Verified)
        .await?;

    Ok(Json(MonthlySummary {
        group_id,
        year,
        months,
    }))
}
