use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use velo_shared::errors::{AppError, AppResult, ErrorCode};
use velo_shared::models::{DailyMetric, PrRecord};
use velo_shared::schema::{activities, daily_metrics, pr_records};
use velo_shared::types::ApiResponse;

use crate::AppState;

const MAX_WINDOW_DAYS: i64 = 365;

/// Validate a PMC window length.
pub fn check_window(days: i64) -> AppResult<i64> {
    if days < 1 || days > MAX_WINDOW_DAYS {
        return Err(AppError::new(
            ErrorCode::InvalidDateRange,
            format!("days must be between 1 and {MAX_WINDOW_DAYS}"),
        ));
    }
    Ok(days)
}

// --- PMC ---

#[derive(Debug, Deserialize)]
pub struct PmcQuery {
    pub user_id: Uuid,
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 { 90 }

/// GET /metrics/pmc?user_id=&days=90
/// Daily CTL/ATL/TSB rows for the chart, oldest first.
pub async fn get_pmc(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PmcQuery>,
) -> AppResult<Json<ApiResponse<Vec<DailyMetric>>>> {
    let days = check_window(query.days)?;
    let from = Utc::now().date_naive() - chrono::Duration::days(days - 1);

    let mut conn = state.db.get().map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let rows: Vec<DailyMetric> = daily_metrics::table
        .filter(daily_metrics::user_id.eq(query.user_id))
        .filter(daily_metrics::date.ge(from))
        .order(daily_metrics::date.asc())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(rows)))
}

// --- Power curve / PRs ---

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

/// GET /metrics/power-curve?user_id=
/// The athlete's current best per duration bucket.
pub async fn get_power_curve(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<Vec<PrRecord>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let records: Vec<PrRecord> = pr_records::table
        .filter(pr_records::user_id.eq(query.user_id))
        .order(pr_records::duration_s.asc())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(records)))
}

// --- Summary cards ---

#[derive(Debug, Serialize)]
pub struct MetricsSummary {
    pub ride_count: i64,
    pub total_distance_m: f64,
    pub total_moving_time_s: i64,
    pub tss_last_7d: f64,
    pub tss_last_28d: f64,
    pub ctl: Option<f64>,
    pub atl: Option<f64>,
    pub tsb: Option<f64>,
    pub pr_count: i64,
}

/// GET /metrics/summary?user_id=
/// Dashboard summary cards: lifetime totals, recent load, current form.
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<MetricsSummary>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let (ride_count, total_distance_m, total_moving_time_s): (i64, Option<f64>, Option<i64>) =
        activities::table
            .filter(activities::user_id.eq(query.user_id))
            .select((
                diesel::dsl::count_star(),
                diesel::dsl::sum(activities::distance_m),
                diesel::dsl::sum(activities::moving_time_s),
            ))
            .first(&mut conn)?;

    let today = Utc::now().date_naive();
    let tss_since = |conn: &mut diesel::pg::PgConnection, days: i64| -> Result<f64, diesel::result::Error> {
        let from = today - chrono::Duration::days(days - 1);
        let total: Option<f64> = daily_metrics::table
            .filter(daily_metrics::user_id.eq(query.user_id))
            .filter(daily_metrics::date.ge(from))
            .select(diesel::dsl::sum(daily_metrics::tss))
            .first(conn)?;
        Ok(total.unwrap_or(0.0))
    };

    let tss_last_7d = tss_since(&mut conn, 7)?;
    let tss_last_28d = tss_since(&mut conn, 28)?;

    let latest: Option<DailyMetric> = daily_metrics::table
        .filter(daily_metrics::user_id.eq(query.user_id))
        .order(daily_metrics::date.desc())
        .first(&mut conn)
        .optional()?;

    let pr_count: i64 = pr_records::table
        .filter(pr_records::user_id.eq(query.user_id))
        .count()
        .get_result(&mut conn)?;

    let summary = MetricsSummary {
        ride_count,
        total_distance_m: total_distance_m.unwrap_or(0.0),
        total_moving_time_s: total_moving_time_s.unwrap_or(0),
        tss_last_7d,
        tss_last_28d,
        ctl: latest.as_ref().map(|m| m.ctl),
        atl: latest.as_ref().map(|m| m.atl),
        tsb: latest.as_ref().map(|m| m.tsb),
        pr_count,
    };

    Ok(Json(ApiResponse::ok(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds_are_enforced() {
        assert!(check_window(0).is_err());
        assert!(check_window(-7).is_err());
        assert!(check_window(366).is_err());
        assert_eq!(check_window(90).unwrap(), 90);
        assert_eq!(check_window(365).unwrap(), 365);
    }
}
