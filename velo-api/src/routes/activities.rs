use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use velo_shared::errors::{AppError, AppResult, ErrorCode};
use velo_shared::models::{Activity, StreamSample};
use velo_shared::schema::{activities, streams};
use velo_shared::types::pagination::{Paginated, PaginationParams};
use velo_shared::types::ApiResponse;

use crate::AppState;

/// GET /activities?page=1&per_page=20
/// Paginated ride list, newest first.
pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Activity>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let total: i64 = activities::table.count().get_result(&mut conn)?;

    let items: Vec<Activity> = activities::table
        .order(activities::start_time.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load(&mut conn)?;

    let paginated = Paginated::new(items, total as u64, &params);

    Ok(Json(ApiResponse::ok(paginated)))
}

/// GET /activities/:id
pub async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Activity>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let activity: Activity = activities::table
        .find(activity_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| {
            AppError::new(ErrorCode::ActivityNotFound, format!("activity {activity_id} not found"))
        })?;

    Ok(Json(ApiResponse::ok(activity)))
}

/// GET /activities/:id/streams
/// Ordered per-second samples for the ride explorer.
pub async fn get_activity_streams(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<StreamSample>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let exists: bool = diesel::select(diesel::dsl::exists(
        activities::table.find(activity_id),
    ))
    .get_result(&mut conn)?;
    if !exists {
        return Err(AppError::new(
            ErrorCode::ActivityNotFound,
            format!("activity {activity_id} not found"),
        ));
    }

    let samples: Vec<StreamSample> = streams::table
        .filter(streams::activity_id.eq(activity_id))
        .order(streams::timestamp.asc())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(samples)))
}
