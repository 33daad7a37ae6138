pub mod config;
pub mod jobs;
pub mod routes;

use velo_shared::clients::db::DbPool;
use velo_shared::clients::redis::RedisClient;
use velo_shared::clients::strava::StravaClient;

pub struct AppState {
    pub db: DbPool,
    pub config: config::AppConfig,
    pub redis: RedisClient,
    pub strava: StravaClient,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
