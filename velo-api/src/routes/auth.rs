use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use velo_shared::errors::{AppError, AppResult, ErrorCode};
use velo_shared::models::{NewUser, User};
use velo_shared::schema::users;
use velo_shared::types::job::SyncJob;
use velo_shared::types::ApiResponse;

use crate::jobs;
use crate::AppState;

/// GET /auth/login
/// Kicks off the OAuth flow by redirecting to Strava's authorize page.
pub async fn login(State(state): State<Arc<AppState>>) -> Redirect {
    let url = state.strava.authorize_url(&state.config.oauth_redirect_uri());
    Redirect::temporary(&url)
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    #[allow(dead_code)]
    pub scope: Option<String>,
    /// Set by Strava when the athlete denies access.
    pub error: Option<String>,
}

/// GET /auth/callback
/// Exchanges the authorization code for tokens and creates or updates
/// the user. First-time connects get an initial backfill enqueued.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Redirect> {
    if let Some(error) = query.error {
        return Err(AppError::new(
            ErrorCode::OAuthError,
            format!("authorization denied: {error}"),
        ));
    }
    let code = query
        .code
        .ok_or_else(|| AppError::bad_request("authorization code is required"))?;

    let token = state
        .strava
        .exchange_code(&code)
        .await
        .map_err(|e| AppError::new(ErrorCode::TokenExchangeFailed, e.to_string()))?;

    let athlete = token
        .athlete
        .clone()
        .ok_or_else(|| AppError::new(ErrorCode::AthleteMissing, "token response carried no athlete"))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let existing: Option<User> = users::table
        .filter(users::strava_athlete_id.eq(athlete.id))
        .first(&mut conn)
        .optional()?;

    let (user_id, is_new_user) = match existing {
        Some(user) => {
            diesel::update(users::table.find(user.id))
                .set((
                    users::access_token.eq(&token.access_token),
                    users::refresh_token.eq(&token.refresh_token),
                    users::token_expires_at.eq(token.expires_at_utc()),
                ))
                .execute(&mut conn)?;
            (user.id, false)
        }
        None => {
            let new_user = NewUser {
                strava_athlete_id: athlete.id,
                access_token: token.access_token.clone(),
                refresh_token: token.refresh_token.clone(),
                token_expires_at: token.expires_at_utc(),
            };
            let user: User = diesel::insert_into(users::table)
                .values(&new_user)
                .get_result(&mut conn)?;

            // Take the athlete's declared FTP when Strava exposes it.
            if let Some(ftp) = athlete.ftp {
                diesel::update(users::table.find(user.id))
                    .set(users::ftp.eq(ftp))
                    .execute(&mut conn)?;
            }

            (user.id, true)
        }
    };

    if is_new_user {
        jobs::enqueue(&state, SyncJob::InitialSync {
            user_id,
            days_back: state.config.initial_sync_days,
        })
        .await?;
    }

    tracing::info!(
        user_id = %user_id,
        athlete_id = athlete.id,
        is_new = is_new_user,
        "strava oauth connected"
    );

    Ok(Redirect::to("/auth/success"))
}

/// GET /auth/success
pub async fn success() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::ok(serde_json::json!({
        "message": "Successfully authenticated with Strava"
    })))
}
