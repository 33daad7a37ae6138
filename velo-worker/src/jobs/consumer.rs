use std::sync::Arc;

use velo_shared::types::job::{queues, JobEnvelope, SyncJob};

use crate::jobs::retry::RetryPolicy;
use crate::services::{ingest, recalc};
use crate::AppState;

/// BRPOP timeout; bounds how long a shutdown signal can go unnoticed.
const POLL_TIMEOUT_SECS: usize = 5;

/// Consume sync jobs from the Redis queue until the process exits.
///
/// One job is processed at a time: Strava's rate limits make parallel
/// ingestion for the same deployment counterproductive.
pub async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
    let policy = RetryPolicy::default();
    tracing::info!(queue = queues::SYNC, "sync consumer listening");

    loop {
        let payload = match state.redis.brpop(queues::SYNC, POLL_TIMEOUT_SECS).await {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(error = %e, "queue pop failed, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        };

        let envelope: JobEnvelope = match serde_json::from_str(&payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(error = %e, payload = %payload, "dropping malformed job");
                continue;
            }
        };

        process_with_retry(&state, &envelope, &policy).await;
    }
}

async fn process_with_retry(state: &Arc<AppState>, envelope: &JobEnvelope, policy: &RetryPolicy) {
    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            let delay = policy.delay_for(attempt - 1);
            tracing::warn!(
                job_id = %envelope.id,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "retrying job"
            );
            tokio::time::sleep(delay).await;
        }

        match process(state, &envelope.job).await {
            Ok(()) => {
                tracing::info!(job_id = %envelope.id, job = ?envelope.job, "job completed");
                return;
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %envelope.id,
                    attempt = attempt + 1,
                    error = %e,
                    "job attempt failed"
                );
            }
        }
    }

    tracing::error!(
        job_id = %envelope.id,
        job = ?envelope.job,
        "job dropped after {} attempts",
        policy.max_attempts
    );
}

async fn process(state: &Arc<AppState>, job: &SyncJob) -> anyhow::Result<()> {
    match job {
        SyncJob::FetchActivity { user_id, strava_activity_id } => {
            ingest::fetch_and_store_activity(state, *user_id, *strava_activity_id).await
        }
        SyncJob::InitialSync { user_id, days_back } => {
            ingest::initial_sync(state, *user_id, *days_back).await
        }
        SyncJob::RecalcMetrics { user_id } => {
            let mut conn = state.db.get()?;
            recalc::recalc_user_metrics(&mut conn, *user_id)?;
            Ok(())
        }
        SyncJob::DeleteActivity { strava_activity_id } => {
            ingest::delete_activity(state, *strava_activity_id).await
        }
    }
}
