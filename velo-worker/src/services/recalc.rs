use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use velo_analytics::pmc::compute_pmc;
use velo_shared::models::{upsert_daily_metric, NewDailyMetric};
use velo_shared::schema::{activities, users};

use crate::AppState;

/// Bucket ride TSS by UTC day and zero-fill the range from the first
/// ride through `through`, so rest days decay CTL/ATL.
pub fn daily_tss_series(
    rides: &[(DateTime<Utc>, Option<f64>)],
    through: NaiveDate,
) -> Vec<(NaiveDate, f64)> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (start, tss) in rides {
        *by_day.entry(start.date_naive()).or_insert(0.0) += tss.unwrap_or(0.0);
    }

    let Some((&first, _)) = by_day.iter().next() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut day = first;
    while day <= through {
        out.push((day, by_day.get(&day).copied().unwrap_or(0.0)));
        day += chrono::Duration::days(1);
    }
    out
}

/// Rebuild the full daily_metrics range for one user.
pub fn recalc_user_metrics(
    conn: &mut diesel::pg::PgConnection,
    user_id: Uuid,
) -> anyhow::Result<usize> {
    let rides: Vec<(DateTime<Utc>, Option<f64>)> = activities::table
        .filter(activities::user_id.eq(user_id))
        .select((activities::start_time, activities::tss))
        .load(conn)?;

    let series = daily_tss_series(&rides, Utc::now().date_naive());
    if series.is_empty() {
        tracing::debug!(user_id = %user_id, "no activities, skipping recalc");
        return Ok(0);
    }

    let pmc = compute_pmc(&series);
    for point in &pmc {
        upsert_daily_metric(conn, &NewDailyMetric {
            user_id,
            date: point.date,
            tss: point.tss,
            ctl: point.ctl,
            atl: point.atl,
            tsb: point.tsb,
        })?;
    }

    tracing::info!(user_id = %user_id, days = pmc.len(), "daily metrics recalculated");
    Ok(pmc.len())
}

/// Spawn the periodic full recalc across all users. The first tick
/// fires at startup, so a restarted worker catches up on missed days.
pub fn spawn_recalc_sweep(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            state.config.recalc_interval_secs,
        ));

        loop {
            interval.tick().await;

            tracing::info!("running PMC recalc sweep");
            match sweep(&state) {
                Ok(user_count) => {
                    tracing::info!(users = user_count, "PMC recalc sweep completed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "PMC recalc sweep failed");
                }
            }
        }
    });
}

fn sweep(state: &Arc<AppState>) -> anyhow::Result<usize> {
    let mut conn = state.db.get()?;
    let ids: Vec<Uuid> = users::table.select(users::id).load(&mut conn)?;

    for id in &ids {
        if let Err(e) = recalc_user_metrics(&mut conn, *id) {
            tracing::error!(user_id = %id, error = %e, "user recalc failed");
        }
    }

    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("{date}T10:00:00Z"))
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day(date: &str) -> NaiveDate {
        date.parse().unwrap()
    }

    #[test]
    fn rides_on_one_day_are_summed() {
        let rides = vec![
            (at("2025-05-01"), Some(60.0)),
            (at("2025-05-01"), Some(25.0)),
        ];
        let series = daily_tss_series(&rides, day("2025-05-01"));
        assert_eq!(series, vec![(day("2025-05-01"), 85.0)]);
    }

    #[test]
    fn gaps_are_zero_filled_through_the_end_date() {
        let rides = vec![(at("2025-05-01"), Some(80.0))];
        let series = daily_tss_series(&rides, day("2025-05-04"));
        assert_eq!(series.len(), 4);
        assert_eq!(series[0], (day("2025-05-01"), 80.0));
        assert_eq!(series[2], (day("2025-05-03"), 0.0));
    }

    #[test]
    fn unscored_rides_count_as_zero_load() {
        let rides = vec![(at("2025-05-01"), None)];
        let series = daily_tss_series(&rides, day("2025-05-01"));
        assert_eq!(series, vec![(day("2025-05-01"), 0.0)]);
    }

    #[test]
    fn no_rides_no_series() {
        assert!(daily_tss_series(&[], day("2025-05-01")).is_empty());
    }
}
