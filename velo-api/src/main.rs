use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use velo_api::config::AppConfig;
use velo_api::routes::{activities, auth, health, metrics, sync, webhook};
use velo_api::AppState;
use velo_shared::clients::db::create_pool;
use velo_shared::clients::redis::RedisClient;
use velo_shared::clients::strava::StravaClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    velo_shared::middleware::init_tracing("velo-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);
    let redis = RedisClient::connect(&config.redis_url).await?;
    let strava = StravaClient::new(&config.strava_client_id, &config.strava_client_secret);
    let metrics_handle = velo_shared::middleware::init_metrics();

    let state = Arc::new(AppState { db, config, redis, strava, metrics_handle });

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/internal/metrics", get(health::prometheus_metrics))
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/success", get(auth::success))
        .route("/webhook", get(webhook::verify).post(webhook::event))
        .route("/activities", get(activities::list_activities))
        .route("/activities/:id", get(activities::get_activity))
        .route("/activities/:id/streams", get(activities::get_activity_streams))
        .route("/sync/initial-sync", post(sync::initial_sync))
        .route("/sync/activity", post(sync::sync_activity))
        .route("/metrics/pmc", get(metrics::get_pmc))
        .route("/metrics/power-curve", get(metrics::get_power_curve))
        .route("/metrics/summary", get(metrics::get_summary))
        .layer(middleware::from_fn(velo_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "velo-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
