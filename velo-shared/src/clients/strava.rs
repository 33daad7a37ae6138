use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::errors::{AppError, ErrorCode};
use crate::types::strava::{
    AthleteSummary, PushSubscription, StreamSet, SummaryActivity, TokenResponse,
};

const API_BASE: &str = "https://www.strava.com/api/v3";
const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
const AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";

/// Scopes Velo requests during the OAuth flow.
const OAUTH_SCOPES: &str = "read,activity:read_all,profile:read_all";

/// Stream channels fetched for every ride.
const STREAM_KEYS: &str =
    "time,latlng,altitude,distance,velocity_smooth,heartrate,cadence,watts,temp,moving,grade_smooth";

#[derive(Debug, thiserror::Error)]
pub enum StravaError {
    #[error("strava request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("strava API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("strava rate limit exceeded")]
    RateLimited,
}

impl From<StravaError> for AppError {
    fn from(err: StravaError) -> Self {
        match err {
            StravaError::RateLimited => {
                AppError::new(ErrorCode::StravaRateLimited, "strava rate limit exceeded")
            }
            other => AppError::new(ErrorCode::StravaApiError, other.to_string()),
        }
    }
}

/// Typed client for the subset of the Strava v3 API Velo talks to:
/// OAuth token grants, athlete/activity/stream reads, and the push
/// subscription management endpoints.
#[derive(Clone)]
pub struct StravaClient {
    http: Client,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("failed to build reqwest client");

        Self {
            http,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    /// URL of Strava's authorization page for the OAuth redirect.
    pub fn authorize_url(&self, redirect_uri: &str) -> String {
        format!(
            "{AUTHORIZE_URL}?client_id={}&redirect_uri={}&response_type=code&approval_prompt=auto&scope={OAUTH_SCOPES}",
            self.client_id, redirect_uri,
        )
    }

    /// Exchange an authorization code for a token pair + athlete summary.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, StravaError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        Self::parse(response).await
    }

    /// Trade a refresh token for a fresh access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, StravaError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn get_athlete(&self, access_token: &str) -> Result<AthleteSummary, StravaError> {
        let response = self
            .http
            .get(format!("{API_BASE}/athlete"))
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::parse(response).await
    }

    /// List the authenticated athlete's activities, newest first.
    ///
    /// `after` is Unix epoch seconds; pagination is 1-based.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SummaryActivity>, StravaError> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .http
            .get(format!("{API_BASE}/athlete/activities"))
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: i64,
    ) -> Result<SummaryActivity, StravaError> {
        let response = self
            .http
            .get(format!("{API_BASE}/activities/{activity_id}"))
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn get_activity_streams(
        &self,
        access_token: &str,
        activity_id: i64,
    ) -> Result<StreamSet, StravaError> {
        let response = self
            .http
            .get(format!("{API_BASE}/activities/{activity_id}/streams"))
            .bearer_auth(access_token)
            .query(&[("keys", STREAM_KEYS), ("key_by_type", "true")])
            .send()
            .await?;

        // A ride with no recorded streams comes back 404; treat as empty.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(StreamSet::default());
        }

        Self::parse(response).await
    }

    // --- Push subscriptions ---

    pub async fn create_subscription(
        &self,
        callback_url: &str,
        verify_token: &str,
    ) -> Result<PushSubscription, StravaError> {
        let response = self
            .http
            .post(format!("{API_BASE}/push_subscriptions"))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("callback_url", callback_url),
                ("verify_token", verify_token),
            ])
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<PushSubscription>, StravaError> {
        let response = self
            .http
            .get(format!("{API_BASE}/push_subscriptions"))
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn delete_subscription(&self, subscription_id: i64) -> Result<(), StravaError> {
        let response = self
            .http
            .delete(format!("{API_BASE}/push_subscriptions/{subscription_id}"))
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        Self::check(response).await.map(|_| ())
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, StravaError> {
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn check(response: Response) -> Result<Response, StravaError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StravaError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StravaError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_scopes_and_redirect() {
        let client = StravaClient::new("12345", "secret");
        let url = client.authorize_url("http://localhost:8000/auth/callback");
        assert!(url.starts_with("https://www.strava.com/oauth/authorize?client_id=12345"));
        assert!(url.contains("redirect_uri=http://localhost:8000/auth/callback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=read,activity:read_all,profile:read_all"));
    }
}
