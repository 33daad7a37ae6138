use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of the OAuth token endpoint, for both the
/// `authorization_code` and `refresh_token` grants.
///
/// `expires_at` is Unix epoch seconds; `athlete` is only present on the
/// initial code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    #[serde(default)]
    pub athlete: Option<AthleteSummary>,
}

impl TokenResponse {
    pub fn expires_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteSummary {
    pub id: i64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    /// Functional threshold power, only exposed for some accounts.
    #[serde(default)]
    pub ftp: Option<i32>,
}

/// Activity summary as returned by `GET /athlete/activities` and
/// `GET /activities/{id}`. Only the fields Velo stores are modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryActivity {
    pub id: i64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub distance: f64,
    pub moving_time: i32,
    pub total_elevation_gain: f64,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
}

/// One stream channel from `GET /activities/{id}/streams?key_by_type=true`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChannel<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub original_size: Option<i64>,
}

/// The full key_by_type stream response. Any channel a ride was not
/// recorded with is simply absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamSet {
    #[serde(default)]
    pub time: Option<StreamChannel<i64>>,
    #[serde(default)]
    pub latlng: Option<StreamChannel<[f64; 2]>>,
    #[serde(default)]
    pub altitude: Option<StreamChannel<Option<f64>>>,
    #[serde(default)]
    pub distance: Option<StreamChannel<Option<f64>>>,
    #[serde(default)]
    pub velocity_smooth: Option<StreamChannel<Option<f64>>>,
    #[serde(default)]
    pub heartrate: Option<StreamChannel<Option<i32>>>,
    #[serde(default)]
    pub cadence: Option<StreamChannel<Option<i32>>>,
    #[serde(default)]
    pub watts: Option<StreamChannel<Option<i32>>>,
    #[serde(default)]
    pub temp: Option<StreamChannel<Option<f64>>>,
    #[serde(default)]
    pub moving: Option<StreamChannel<bool>>,
    #[serde(default)]
    pub grade_smooth: Option<StreamChannel<Option<f64>>>,
}

impl StreamSet {
    /// Number of samples, taken from the time channel.
    pub fn len(&self) -> usize {
        self.time.as_ref().map(|t| t.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A push subscription as returned by the Strava subscriptions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: i64,
    #[serde(default)]
    pub application_id: Option<i64>,
    pub callback_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Webhook event payload POSTed by Strava.
///
/// `object_type` is `"activity"` or `"athlete"`; `aspect_type` is
/// `"create"`, `"update"` or `"delete"`; `owner_id` is the athlete id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub object_type: String,
    pub object_id: i64,
    pub aspect_type: String,
    pub owner_id: i64,
    #[serde(default)]
    pub subscription_id: Option<i64>,
    #[serde(default)]
    pub event_time: Option<i64>,
    #[serde(default)]
    pub updates: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_parses_exchange_payload() {
        let body = r#"{
            "token_type": "Bearer",
            "access_token": "a1b2",
            "refresh_token": "r3f4",
            "expires_at": 1718000000,
            "expires_in": 21600,
            "athlete": {"id": 134815, "firstname": "Eddy", "lastname": "M."}
        }"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(token.access_token, "a1b2");
        assert_eq!(token.athlete.as_ref().unwrap().id, 134815);
        assert_eq!(token.expires_at_utc().timestamp(), 1718000000);
    }

    #[test]
    fn token_response_parses_refresh_payload_without_athlete() {
        let body = r#"{"access_token": "a", "refresh_token": "r", "expires_at": 1}"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        assert!(token.athlete.is_none());
    }

    #[test]
    fn stream_set_parses_key_by_type_payload() {
        let body = r#"{
            "time": {"data": [0, 1, 2], "original_size": 3},
            "watts": {"data": [210, null, 250], "original_size": 3},
            "latlng": {"data": [[50.8, 4.3], [50.8, 4.3], [50.8, 4.4]]},
            "moving": {"data": [true, false, true]}
        }"#;
        let streams: StreamSet = serde_json::from_str(body).unwrap();
        assert_eq!(streams.len(), 3);
        let watts = streams.watts.unwrap();
        assert_eq!(watts.data, vec![Some(210), None, Some(250)]);
        assert!(streams.heartrate.is_none());
    }

    #[test]
    fn webhook_event_parses_create() {
        let body = r#"{
            "object_type": "activity",
            "object_id": 1360128428,
            "aspect_type": "create",
            "owner_id": 134815,
            "subscription_id": 120475,
            "event_time": 1516126040
        }"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.aspect_type, "create");
        assert_eq!(event.owner_id, 134815);
    }
}
