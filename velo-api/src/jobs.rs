use uuid::Uuid;

use velo_shared::errors::{AppError, ErrorCode};
use velo_shared::types::job::{queues, JobEnvelope, SyncJob};

use crate::AppState;

/// Push a sync job onto the Redis queue and return its envelope id.
pub async fn enqueue(state: &AppState, job: SyncJob) -> Result<Uuid, AppError> {
    let envelope = JobEnvelope::new(job);
    let payload = serde_json::to_string(&envelope)
        .map_err(|e| AppError::internal(format!("job serialization failed: {e}")))?;

    state
        .redis
        .lpush(queues::SYNC, &payload)
        .await
        .map_err(|e| AppError::new(ErrorCode::QueueError, format!("enqueue failed: {e}")))?;

    tracing::debug!(job_id = %envelope.id, job = ?envelope.job, "job enqueued");
    Ok(envelope.id)
}
