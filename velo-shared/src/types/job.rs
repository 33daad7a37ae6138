use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping every job pushed onto the Redis sync queue.
///
/// Jobs are JSON-serialized, LPUSHed by the API and BRPOPped by the
/// worker, so the queue drains oldest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: Uuid,
    pub enqueued_at: DateTime<Utc>,
    pub job: SyncJob,
}

impl JobEnvelope {
    pub fn new(job: SyncJob) -> Self {
        Self {
            id: Uuid::now_v7(),
            enqueued_at: Utc::now(),
            job,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncJob {
    /// Fetch one activity (summary + streams) and ingest it.
    FetchActivity {
        user_id: Uuid,
        strava_activity_id: i64,
    },
    /// Backfill: list the athlete's activities for the past `days_back`
    /// days and enqueue a FetchActivity per missing ride.
    InitialSync {
        user_id: Uuid,
        days_back: i64,
    },
    /// Rebuild the full daily CTL/ATL/TSB range for a user.
    RecalcMetrics {
        user_id: Uuid,
    },
    /// Remove an activity (and its streams/PRs) after a Strava delete event.
    DeleteActivity {
        strava_activity_id: i64,
    },
}

/// Queue keys
pub mod queues {
    pub const SYNC: &str = "velo:jobs:sync";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = JobEnvelope::new(SyncJob::FetchActivity {
            user_id: Uuid::nil(),
            strava_activity_id: 1360128428,
        });
        let json = serde_json::to_string(&envelope).unwrap();
        let back: JobEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, envelope.id);
        assert_eq!(back.job, envelope.job);
    }

    #[test]
    fn jobs_are_tagged_by_type() {
        let json = serde_json::to_value(SyncJob::RecalcMetrics { user_id: Uuid::nil() }).unwrap();
        assert_eq!(json["type"], "recalc_metrics");

        let parsed: SyncJob = serde_json::from_str(
            r#"{"type":"delete_activity","strava_activity_id":99}"#,
        )
        .unwrap();
        assert_eq!(parsed, SyncJob::DeleteActivity { strava_activity_id: 99 });
    }
}
