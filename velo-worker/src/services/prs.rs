use chrono::Duration;
use diesel::prelude::*;
use uuid::Uuid;

use velo_analytics::mmp::power_curve;
use velo_shared::models::{upsert_pr_record, Activity, NewPrRecord};
use velo_shared::schema::{activities, pr_records, streams};

/// Mean heart rate over a window, ignoring missing samples.
pub fn window_avg_hr(hr: &[Option<i32>], start: usize, len: usize) -> Option<f64> {
    let window = hr.get(start..start + len)?;
    let values: Vec<i32> = window.iter().flatten().copied().collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i32>() as f64 / values.len() as f64)
}

/// Run the ride's power curve against the stored records. Returns the
/// duration buckets where a new PR was set.
pub fn detect_activity_prs(
    conn: &mut diesel::pg::PgConnection,
    activity: &Activity,
    watts: &[f64],
    hr: &[Option<i32>],
) -> anyhow::Result<Vec<u32>> {
    let mut new_prs = Vec::new();

    for point in power_curve(watts) {
        let record = NewPrRecord {
            user_id: activity.user_id,
            activity_id: activity.id,
            duration_s: point.duration_s as i32,
            start_time: activity.start_time + Duration::seconds(point.best.start as i64),
            end_time: activity.start_time
                + Duration::seconds((point.best.start + point.best.len) as i64),
            avg_power: point.best.avg_power,
            avg_hr: window_avg_hr(hr, point.best.start, point.best.len),
        };

        if upsert_pr_record(conn, &record)? {
            tracing::info!(
                user_id = %activity.user_id,
                duration_s = point.duration_s,
                avg_power = point.best.avg_power,
                "new power PR"
            );
            new_prs.push(point.duration_s);
        }
    }

    Ok(new_prs)
}

/// Drop and re-detect every record for a user from stored streams.
/// Used after an activity delete, since the removed ride may have held
/// records.
pub fn rebuild_user_prs(conn: &mut diesel::pg::PgConnection, user_id: Uuid) -> anyhow::Result<()> {
    diesel::delete(pr_records::table.filter(pr_records::user_id.eq(user_id))).execute(conn)?;

    let rides: Vec<Activity> = activities::table
        .filter(activities::user_id.eq(user_id))
        .order(activities::start_time.asc())
        .load(conn)?;

    for activity in &rides {
        let samples: Vec<(Option<i32>, Option<i32>)> = streams::table
            .filter(streams::activity_id.eq(activity.id))
            .order(streams::timestamp.asc())
            .select((streams::watts, streams::heartrate))
            .load(conn)?;

        if samples.iter().all(|(watts, _)| watts.is_none()) {
            continue;
        }

        let watts: Vec<f64> = samples
            .iter()
            .map(|(w, _)| w.map(f64::from).unwrap_or(0.0))
            .collect();
        let hr: Vec<Option<i32>> = samples.iter().map(|(_, h)| *h).collect();

        detect_activity_prs(conn, activity, &watts, &hr)?;
    }

    tracing::info!(user_id = %user_id, rides = rides.len(), "power PRs rebuilt");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hr_average_skips_missing_samples() {
        let hr = vec![Some(140), None, Some(160), Some(150)];
        assert_eq!(window_avg_hr(&hr, 0, 4), Some(150.0));
    }

    #[test]
    fn hr_average_none_when_window_is_empty_of_data() {
        let hr = vec![None, None];
        assert_eq!(window_avg_hr(&hr, 0, 2), None);
    }

    #[test]
    fn hr_average_none_when_window_out_of_range() {
        let hr = vec![Some(140)];
        assert_eq!(window_avg_hr(&hr, 0, 5), None);
    }
}
