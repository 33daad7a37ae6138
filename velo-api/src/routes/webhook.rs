// Strava webhook intake.
//
// GET  /webhook  -- subscription verification handshake: Strava sends
//                   hub.mode/hub.verify_token/hub.challenge and expects
//                   the challenge echoed back within 2 seconds.
// POST /webhook  -- event delivery. The body is authenticated with an
//                   X-Strava-Signature header: hex HMAC-SHA256 of the
//                   raw body, keyed with the webhook verify token.
//
// Events are acknowledged fast and handed to the worker through the
// sync queue; no Strava API call happens on this path.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use diesel::prelude::*;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

use velo_shared::errors::{AppError, AppResult, ErrorCode};
use velo_shared::models::User;
use velo_shared::schema::users;
use velo_shared::types::job::SyncJob;
use velo_shared::types::strava::WebhookEvent;

use crate::jobs;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "X-Strava-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex HMAC-SHA256 signature for an event body.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a received signature in constant time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let expected = sign_payload(secret, body);
    use subtle::ConstantTimeEq;
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

// ─── Verification handshake ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: String,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: String,
    #[serde(rename = "hub.challenge")]
    pub challenge: String,
}

/// The handshake reply, or the error Strava should see.
pub fn verification_reply(expected_token: &str, query: &VerifyQuery) -> AppResult<serde_json::Value> {
    if query.mode != "subscribe" {
        return Err(AppError::new(
            ErrorCode::MalformedEvent,
            format!("unexpected hub.mode '{}'", query.mode),
        ));
    }
    if query.verify_token != expected_token {
        return Err(AppError::new(
            ErrorCode::VerifyTokenMismatch,
            "verify token does not match",
        ));
    }
    Ok(serde_json::json!({ "hub.challenge": query.challenge }))
}

/// GET /webhook
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let reply = verification_reply(&state.config.webhook_verify_token, &query)?;
    tracing::info!("webhook subscription verified");
    Ok(Json(reply))
}

// ─── Event intake ───────────────────────────────────────────────────────────

/// What an incoming event should turn into.
#[derive(Debug, PartialEq)]
pub enum EventAction {
    FetchActivity(i64),
    DeleteActivity(i64),
    Ignore,
}

/// Map an event to an action. Athlete events (deauthorizations, profile
/// updates) are acknowledged and dropped.
pub fn plan_event(event: &WebhookEvent) -> EventAction {
    if event.object_type != "activity" {
        return EventAction::Ignore;
    }
    match event.aspect_type.as_str() {
        "create" | "update" => EventAction::FetchActivity(event.object_id),
        "delete" => EventAction::DeleteActivity(event.object_id),
        _ => EventAction::Ignore,
    }
}

/// POST /webhook
pub async fn event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::new(ErrorCode::SignatureMissing, "missing event signature"))?;

    if !verify_signature(&state.config.webhook_verify_token, &body, signature) {
        return Err(AppError::new(ErrorCode::SignatureInvalid, "event signature mismatch"));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::new(ErrorCode::MalformedEvent, format!("bad event body: {e}")))?;

    tracing::info!(
        object_type = %event.object_type,
        aspect = %event.aspect_type,
        object_id = event.object_id,
        owner_id = event.owner_id,
        "webhook event received"
    );

    match plan_event(&event) {
        EventAction::FetchActivity(strava_activity_id) => {
            let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
            let user: Option<User> = users::table
                .filter(users::strava_athlete_id.eq(event.owner_id))
                .first(&mut conn)
                .optional()?;

            // Unknown athletes are acked, not errored: a non-2xx would
            // make Strava retry the delivery forever.
            match user {
                Some(user) => {
                    jobs::enqueue(&state, SyncJob::FetchActivity {
                        user_id: user.id,
                        strava_activity_id,
                    })
                    .await?;
                }
                None => {
                    tracing::warn!(owner_id = event.owner_id, "event for unknown athlete, dropped");
                }
            }
        }
        EventAction::DeleteActivity(strava_activity_id) => {
            jobs::enqueue(&state, SyncJob::DeleteActivity { strava_activity_id }).await?;
        }
        EventAction::Ignore => {
            tracing::debug!(object_type = %event.object_type, "event ignored");
        }
    }

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_roundtrip() {
        let secret = "verify-token-secret";
        let body = br#"{"object_type":"activity","aspect_type":"create"}"#;

        let sig = sign_payload(secret, body);
        assert!(verify_signature(secret, body, &sig));
        assert!(!verify_signature("wrong-secret", body, &sig));
        assert!(!verify_signature(secret, b"tampered", &sig));
    }

    #[test]
    fn handshake_echoes_the_challenge() {
        let query = VerifyQuery {
            mode: "subscribe".into(),
            verify_token: "tok".into(),
            challenge: "15f7d1a91c1f40f8a748fd134752feb3".into(),
        };
        let reply = verification_reply("tok", &query).unwrap();
        assert_eq!(reply["hub.challenge"], "15f7d1a91c1f40f8a748fd134752feb3");
    }

    #[test]
    fn handshake_rejects_bad_token() {
        let query = VerifyQuery {
            mode: "subscribe".into(),
            verify_token: "intruder".into(),
            challenge: "c".into(),
        };
        assert!(verification_reply("tok", &query).is_err());
    }

    #[test]
    fn handshake_rejects_bad_mode() {
        let query = VerifyQuery {
            mode: "unsubscribe".into(),
            verify_token: "tok".into(),
            challenge: "c".into(),
        };
        assert!(verification_reply("tok", &query).is_err());
    }

    fn activity_event(aspect: &str) -> WebhookEvent {
        WebhookEvent {
            object_type: "activity".into(),
            object_id: 1360128428,
            aspect_type: aspect.into(),
            owner_id: 134815,
            subscription_id: None,
            event_time: None,
            updates: None,
        }
    }

    #[test]
    fn create_and_update_fetch_the_activity() {
        assert_eq!(
            plan_event(&activity_event("create")),
            EventAction::FetchActivity(1360128428)
        );
        assert_eq!(
            plan_event(&activity_event("update")),
            EventAction::FetchActivity(1360128428)
        );
    }

    #[test]
    fn delete_removes_the_activity() {
        assert_eq!(
            plan_event(&activity_event("delete")),
            EventAction::DeleteActivity(1360128428)
        );
    }

    #[test]
    fn athlete_events_are_ignored() {
        let mut event = activity_event("update");
        event.object_type = "athlete".into();
        assert_eq!(plan_event(&event), EventAction::Ignore);
    }
}
