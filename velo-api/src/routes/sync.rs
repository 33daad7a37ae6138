use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use velo_shared::errors::{AppError, AppResult, ErrorCode};
use velo_shared::schema::{activities, users};
use velo_shared::types::job::SyncJob;
use velo_shared::types::ApiResponse;

use crate::jobs;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct InitialSyncRequest {
    pub user_id: Uuid,
    #[serde(default = "default_days_back")]
    #[validate(range(min = 1, max = 365))]
    pub days_back: i64,
}

fn default_days_back() -> i64 { 30 }

#[derive(Debug, Deserialize)]
pub struct ActivitySyncRequest {
    pub user_id: Uuid,
    pub strava_activity_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SyncAck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<Uuid>,
}

fn require_user(conn: &mut diesel::pg::PgConnection, user_id: Uuid) -> AppResult<()> {
    let exists: bool = diesel::select(diesel::dsl::exists(users::table.find(user_id)))
        .get_result(conn)?;
    if !exists {
        return Err(AppError::new(
            ErrorCode::UserNotFound,
            format!("user {user_id} not found"),
        ));
    }
    Ok(())
}

/// POST /sync/initial-sync
/// Enqueue a backfill of the user's recent rides.
pub async fn initial_sync(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitialSyncRequest>,
) -> AppResult<Json<ApiResponse<SyncAck>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    require_user(&mut conn, req.user_id)?;

    let job_id = jobs::enqueue(&state, SyncJob::InitialSync {
        user_id: req.user_id,
        days_back: req.days_back,
    })
    .await?;

    tracing::info!(user_id = %req.user_id, days_back = req.days_back, "initial sync requested");

    Ok(Json(ApiResponse::ok_with_message(
        SyncAck {
            status: "started".into(),
            job_id: Some(job_id),
            activity_id: None,
        },
        format!("initial sync started for the past {} days", req.days_back),
    )))
}

/// POST /sync/activity
/// Enqueue a single ride fetch; already-stored rides short-circuit.
pub async fn sync_activity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActivitySyncRequest>,
) -> AppResult<Json<ApiResponse<SyncAck>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    require_user(&mut conn, req.user_id)?;

    let existing: Option<Uuid> = activities::table
        .filter(activities::strava_id.eq(req.strava_activity_id))
        .select(activities::id)
        .first(&mut conn)
        .optional()?;

    if let Some(activity_id) = existing {
        return Ok(Json(ApiResponse::ok_with_message(
            SyncAck {
                status: "exists".into(),
                job_id: None,
                activity_id: Some(activity_id),
            },
            format!("activity {} already synced", req.strava_activity_id),
        )));
    }

    let job_id = jobs::enqueue(&state, SyncJob::FetchActivity {
        user_id: req.user_id,
        strava_activity_id: req.strava_activity_id,
    })
    .await?;

    Ok(Json(ApiResponse::ok(SyncAck {
        status: "queued".into(),
        job_id: Some(job_id),
        activity_id: None,
    })))
}
