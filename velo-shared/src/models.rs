use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{activities, daily_metrics, pr_records, streams, users};

// --- Users ---

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub strava_athlete_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub ftp: i32,
    pub lthr: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub strava_athlete_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
}

// --- Activities ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = activities)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub strava_id: i64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub distance_m: f64,
    pub moving_time_s: i32,
    pub elev_gain_m: f64,
    pub avg_power: Option<f64>,
    pub avg_hr: Option<f64>,
    pub tss: Option<f64>,
    pub np: Option<f64>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = activities)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub strava_id: i64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub distance_m: f64,
    pub moving_time_s: i32,
    pub elev_gain_m: f64,
    pub avg_power: Option<f64>,
    pub avg_hr: Option<f64>,
}

// --- Streams ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = streams)]
pub struct StreamSample {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<f64>,
    pub distance: Option<f64>,
    pub velocity_smooth: Option<f64>,
    pub heartrate: Option<i32>,
    pub cadence: Option<i32>,
    pub watts: Option<i32>,
    pub temp: Option<f64>,
    pub moving: bool,
    pub grade_smooth: Option<f64>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = streams)]
pub struct NewStreamSample {
    pub activity_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<f64>,
    pub distance: Option<f64>,
    pub velocity_smooth: Option<f64>,
    pub heartrate: Option<i32>,
    pub cadence: Option<i32>,
    pub watts: Option<i32>,
    pub temp: Option<f64>,
    pub moving: bool,
    pub grade_smooth: Option<f64>,
}

// --- Daily metrics (PMC snapshot) ---

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = daily_metrics)]
pub struct DailyMetric {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub tss: f64,
    pub ctl: f64,
    pub atl: f64,
    pub tsb: f64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = daily_metrics)]
pub struct NewDailyMetric {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub tss: f64,
    pub ctl: f64,
    pub atl: f64,
    pub tsb: f64,
}

/// Upsert one PMC day using ON CONFLICT (user_id, date) DO UPDATE.
pub fn upsert_daily_metric(
    conn: &mut diesel::pg::PgConnection,
    metric: &NewDailyMetric,
) -> Result<(), diesel::result::Error> {
    use diesel::sql_types::{Date, Double, Uuid as SqlUuid};

    diesel::sql_query(
        "INSERT INTO daily_metrics (user_id, date, tss, ctl, atl, tsb) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (user_id, date) DO UPDATE \
         SET tss = EXCLUDED.tss, ctl = EXCLUDED.ctl, \
             atl = EXCLUDED.atl, tsb = EXCLUDED.tsb",
    )
    .bind::<SqlUuid, _>(metric.user_id)
    .bind::<Date, _>(metric.date)
    .bind::<Double, _>(metric.tss)
    .bind::<Double, _>(metric.ctl)
    .bind::<Double, _>(metric.atl)
    .bind::<Double, _>(metric.tsb)
    .execute(conn)?;
    Ok(())
}

// --- PR records ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = pr_records)]
pub struct PrRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_id: Uuid,
    pub duration_s: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub avg_power: f64,
    pub avg_hr: Option<f64>,
    pub set_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = pr_records)]
pub struct NewPrRecord {
    pub user_id: Uuid,
    pub activity_id: Uuid,
    pub duration_s: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub avg_power: f64,
    pub avg_hr: Option<f64>,
}

/// Upsert a PR candidate for one (user, duration) bucket.
///
/// The conditional DO UPDATE only fires when the candidate is strictly
/// better, so ties keep the earlier record. Returns true when the row
/// was inserted or replaced, i.e. a new PR was set.
pub fn upsert_pr_record(
    conn: &mut diesel::pg::PgConnection,
    record: &NewPrRecord,
) -> Result<bool, diesel::result::Error> {
    use diesel::sql_types::{Double, Int4, Nullable, Timestamptz, Uuid as SqlUuid};

    let affected = diesel::sql_query(
        "INSERT INTO pr_records \
           (user_id, activity_id, duration_s, start_time, end_time, avg_power, avg_hr) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (user_id, duration_s) DO UPDATE \
         SET activity_id = EXCLUDED.activity_id, \
             start_time = EXCLUDED.start_time, \
             end_time = EXCLUDED.end_time, \
             avg_power = EXCLUDED.avg_power, \
             avg_hr = EXCLUDED.avg_hr, \
             set_at = now() \
         WHERE pr_records.avg_power < EXCLUDED.avg_power",
    )
    .bind::<SqlUuid, _>(record.user_id)
    .bind::<SqlUuid, _>(record.activity_id)
    .bind::<Int4, _>(record.duration_s)
    .bind::<Timestamptz, _>(record.start_time)
    .bind::<Timestamptz, _>(record.end_time)
    .bind::<Double, _>(record.avg_power)
    .bind::<Nullable<Double>, _>(record.avg_hr)
    .execute(conn)?;

    Ok(affected > 0)
}
