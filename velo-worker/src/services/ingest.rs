use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use velo_shared::models::{Activity, NewActivity, NewStreamSample, User};
use velo_shared::schema::{activities, streams, users};
use velo_shared::types::job::{queues, JobEnvelope, SyncJob};
use velo_shared::types::strava::StreamSet;

use crate::services::{prs, recalc};
use crate::AppState;

const STREAM_INSERT_CHUNK: usize = 1000;

/// Refresh tokens this close to expiry.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

const SYNC_PAGE_SIZE: u32 = 50;

/// Refresh the user's access token when it expires within the margin,
/// persisting the new pair.
pub async fn ensure_fresh_token(
    state: &Arc<AppState>,
    conn: &mut diesel::pg::PgConnection,
    user: &mut User,
) -> anyhow::Result<()> {
    if user.token_expires_at > Utc::now() + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) {
        return Ok(());
    }

    tracing::info!(user_id = %user.id, "access token expiring, refreshing");
    let token = state.strava.refresh_token(&user.refresh_token).await?;
    let expires_at = token.expires_at_utc();

    diesel::update(users::table.find(user.id))
        .set((
            users::access_token.eq(&token.access_token),
            users::refresh_token.eq(&token.refresh_token),
            users::token_expires_at.eq(expires_at),
        ))
        .execute(conn)?;

    user.access_token = token.access_token;
    user.refresh_token = token.refresh_token;
    user.token_expires_at = expires_at;
    Ok(())
}

/// Fetch one activity (summary + streams) from Strava, store it, then
/// recompute the user's PMC and power PRs.
pub async fn fetch_and_store_activity(
    state: &Arc<AppState>,
    user_id: Uuid,
    strava_activity_id: i64,
) -> anyhow::Result<()> {
    let mut conn = state.db.get()?;
    let mut user: User = users::table.find(user_id).first(&mut conn)?;
    ensure_fresh_token(state, &mut conn, &mut user).await?;

    let summary = state
        .strava
        .get_activity(&user.access_token, strava_activity_id)
        .await?;
    let stream_set = state
        .strava
        .get_activity_streams(&user.access_token, strava_activity_id)
        .await?;

    let watts = watt_series(&stream_set);
    let (tss, np) = velo_analytics::activity_tss(
        summary.moving_time as f64,
        watts.as_deref(),
        summary.average_watts,
        summary.average_heartrate,
        user.ftp as f64,
        user.lthr as f64,
    );

    let new_activity = NewActivity {
        user_id,
        strava_id: summary.id,
        name: summary.name.clone(),
        start_time: summary.start_date,
        distance_m: summary.distance,
        moving_time_s: summary.moving_time,
        elev_gain_m: summary.total_elevation_gain,
        avg_power: summary.average_watts,
        avg_hr: summary.average_heartrate,
    };

    let activity: Activity = conn.transaction(|conn| {
        let activity: Activity = diesel::insert_into(activities::table)
            .values(&new_activity)
            .on_conflict(activities::strava_id)
            .do_update()
            .set(&new_activity)
            .get_result(conn)?;

        diesel::update(activities::table.find(activity.id))
            .set((activities::tss.eq(tss), activities::np.eq(np)))
            .execute(conn)?;

        // Re-ingest replaces the whole sample set.
        diesel::delete(streams::table.filter(streams::activity_id.eq(activity.id)))
            .execute(conn)?;
        let rows = map_stream_rows(activity.id, activity.start_time, &stream_set);
        for chunk in rows.chunks(STREAM_INSERT_CHUNK) {
            diesel::insert_into(streams::table).values(chunk).execute(conn)?;
        }

        Ok::<_, diesel::result::Error>(activity)
    })?;

    recalc::recalc_user_metrics(&mut conn, user_id)?;

    if let Some(watts) = watts {
        let hr = hr_series(&stream_set);
        let new_prs = prs::detect_activity_prs(&mut conn, &activity, &watts, &hr)?;
        if !new_prs.is_empty() {
            tracing::info!(
                user_id = %user_id,
                strava_id = strava_activity_id,
                buckets = ?new_prs,
                "activity set new power PRs"
            );
        }
    }

    tracing::info!(
        user_id = %user_id,
        strava_id = strava_activity_id,
        samples = stream_set.len(),
        tss = ?tss,
        "activity ingested"
    );
    Ok(())
}

/// List the athlete's recent rides and enqueue a fetch per missing one,
/// followed by a metrics recalc.
pub async fn initial_sync(state: &Arc<AppState>, user_id: Uuid, days_back: i64) -> anyhow::Result<()> {
    let mut conn = state.db.get()?;
    let mut user: User = users::table.find(user_id).first(&mut conn)?;
    ensure_fresh_token(state, &mut conn, &mut user).await?;

    let after = (Utc::now() - Duration::days(days_back)).timestamp();
    let mut page = 1u32;
    let mut seen = 0usize;
    let mut enqueued = 0usize;

    loop {
        let batch = state
            .strava
            .list_activities(&user.access_token, Some(after), page, SYNC_PAGE_SIZE)
            .await?;
        if batch.is_empty() {
            break;
        }
        seen += batch.len();

        for summary in &batch {
            let exists: bool = diesel::select(diesel::dsl::exists(
                activities::table.filter(activities::strava_id.eq(summary.id)),
            ))
            .get_result(&mut conn)?;
            if exists {
                continue;
            }

            enqueue(state, SyncJob::FetchActivity {
                user_id,
                strava_activity_id: summary.id,
            })
            .await?;
            enqueued += 1;
        }

        if batch.len() < SYNC_PAGE_SIZE as usize {
            break;
        }
        page += 1;
    }

    enqueue(state, SyncJob::RecalcMetrics { user_id }).await?;

    tracing::info!(
        user_id = %user_id,
        days_back,
        seen,
        enqueued,
        "initial sync scan complete"
    );
    Ok(())
}

/// Handle a Strava delete event. Unknown activities are ignored so the
/// job stays idempotent.
pub async fn delete_activity(state: &Arc<AppState>, strava_activity_id: i64) -> anyhow::Result<()> {
    let mut conn = state.db.get()?;

    let activity = activities::table
        .filter(activities::strava_id.eq(strava_activity_id))
        .first::<Activity>(&mut conn)
        .optional()?;

    let Some(activity) = activity else {
        tracing::debug!(strava_id = strava_activity_id, "delete for unknown activity, ignoring");
        return Ok(());
    };

    // Streams and PR rows go with it via ON DELETE CASCADE.
    diesel::delete(activities::table.find(activity.id)).execute(&mut conn)?;

    recalc::recalc_user_metrics(&mut conn, activity.user_id)?;
    prs::rebuild_user_prs(&mut conn, activity.user_id)?;

    tracing::info!(
        user_id = %activity.user_id,
        strava_id = strava_activity_id,
        "activity deleted"
    );
    Ok(())
}

async fn enqueue(state: &Arc<AppState>, job: SyncJob) -> anyhow::Result<()> {
    let envelope = JobEnvelope::new(job);
    let payload = serde_json::to_string(&envelope)?;
    state.redis.lpush(queues::SYNC, &payload).await?;
    Ok(())
}

/// The ride's 1 Hz watt series for NP and MMP. None when the ride has
/// no power channel at all; recorded gaps count as 0 W.
pub fn watt_series(stream_set: &StreamSet) -> Option<Vec<f64>> {
    let channel = stream_set.watts.as_ref()?;
    if channel.data.is_empty() {
        return None;
    }
    let len = stream_set.len().max(channel.data.len());
    Some(
        (0..len)
            .map(|i| {
                channel
                    .data
                    .get(i)
                    .copied()
                    .flatten()
                    .map(f64::from)
                    .unwrap_or(0.0)
            })
            .collect(),
    )
}

/// Per-sample heart rate aligned with the watt series.
pub fn hr_series(stream_set: &StreamSet) -> Vec<Option<i32>> {
    let len = stream_set.len();
    (0..len)
        .map(|i| {
            stream_set
                .heartrate
                .as_ref()
                .and_then(|c| c.data.get(i).copied().flatten())
        })
        .collect()
}

/// Align all channels on the time channel and produce insertable rows.
/// Channels shorter than the time series pad with NULLs.
pub fn map_stream_rows(
    activity_id: Uuid,
    start_time: DateTime<Utc>,
    stream_set: &StreamSet,
) -> Vec<NewStreamSample> {
    let Some(time) = stream_set.time.as_ref() else {
        return Vec::new();
    };

    let get_f64 = |channel: &Option<velo_shared::types::strava::StreamChannel<Option<f64>>>, i: usize| {
        channel.as_ref().and_then(|c| c.data.get(i).copied().flatten())
    };
    let get_i32 = |channel: &Option<velo_shared::types::strava::StreamChannel<Option<i32>>>, i: usize| {
        channel.as_ref().and_then(|c| c.data.get(i).copied().flatten())
    };

    time.data
        .iter()
        .enumerate()
        .map(|(i, &offset)| {
            let latlng = stream_set
                .latlng
                .as_ref()
                .and_then(|c| c.data.get(i).copied());

            NewStreamSample {
                activity_id,
                timestamp: start_time + Duration::seconds(offset),
                lat: latlng.map(|p| p[0]),
                lon: latlng.map(|p| p[1]),
                altitude: get_f64(&stream_set.altitude, i),
                distance: get_f64(&stream_set.distance, i),
                velocity_smooth: get_f64(&stream_set.velocity_smooth, i),
                heartrate: get_i32(&stream_set.heartrate, i),
                cadence: get_i32(&stream_set.cadence, i),
                watts: get_i32(&stream_set.watts, i),
                temp: get_f64(&stream_set.temp, i),
                moving: stream_set
                    .moving
                    .as_ref()
                    .and_then(|c| c.data.get(i).copied())
                    .unwrap_or(true),
                grade_smooth: get_f64(&stream_set.grade_smooth, i),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use velo_shared::types::strava::StreamChannel;

    fn stream_set() -> StreamSet {
        StreamSet {
            time: Some(StreamChannel { data: vec![0, 1, 2, 3], original_size: Some(4) }),
            watts: Some(StreamChannel {
                data: vec![Some(200), None, Some(240), Some(260)],
                original_size: Some(4),
            }),
            heartrate: Some(StreamChannel {
                data: vec![Some(140), Some(142), None],
                original_size: Some(3),
            }),
            latlng: Some(StreamChannel {
                data: vec![[50.8, 4.3], [50.8, 4.31]],
                original_size: Some(2),
            }),
            ..StreamSet::default()
        }
    }

    #[test]
    fn watt_series_fills_gaps_with_zero() {
        let watts = watt_series(&stream_set()).unwrap();
        assert_eq!(watts, vec![200.0, 0.0, 240.0, 260.0]);
    }

    #[test]
    fn watt_series_none_without_power_channel() {
        let set = StreamSet {
            time: Some(StreamChannel { data: vec![0, 1], original_size: Some(2) }),
            ..StreamSet::default()
        };
        assert!(watt_series(&set).is_none());
    }

    #[test]
    fn stream_rows_align_on_the_time_channel() {
        let start = DateTime::parse_from_rfc3339("2025-06-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let rows = map_stream_rows(Uuid::nil(), start, &stream_set());

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2].timestamp, start + Duration::seconds(2));
        // Short channels pad with NULLs instead of truncating the ride.
        assert_eq!(rows[3].heartrate, None);
        assert_eq!(rows[3].lat, None);
        assert_eq!(rows[1].watts, None);
        assert!(rows[0].moving);
    }

    #[test]
    fn no_time_channel_means_no_rows() {
        let rows = map_stream_rows(Uuid::nil(), Utc::now(), &StreamSet::default());
        assert!(rows.is_empty());
    }
}
