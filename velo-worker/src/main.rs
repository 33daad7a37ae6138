mod config;
mod jobs;
mod services;

use config::AppConfig;
use velo_shared::clients::db::{create_pool, DbPool};
use velo_shared::clients::redis::RedisClient;
use velo_shared::clients::strava::StravaClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub redis: RedisClient,
    pub strava: StravaClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    velo_shared::middleware::init_tracing("velo-worker");

    let config = AppConfig::load()?;

    let db = create_pool(&config.database_url);
    let redis = RedisClient::connect(&config.redis_url).await?;
    let strava = StravaClient::new(&config.strava_client_id, &config.strava_client_secret);

    let state = std::sync::Arc::new(AppState { db, config, redis, strava });

    // Periodic full PMC sweep so CTL/ATL keep decaying on rest days.
    services::recalc::spawn_recalc_sweep(state.clone());

    tracing::info!("velo-worker starting");
    jobs::consumer::run(state).await
}
