use std::net::SocketAddr;
use std::sync::Arc;

use common_observability::PricingMetrics;
use pricing_service::repo::postgres::pg_repositories;
use pricing_service::{build_router, AppState, PricingConfig, PricingService, PricingSettings};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    common_money::log_rounding_mode_once();

    let config = PricingConfig::from_env()?;
    let pool = PgPoolOptions::new()
        .acquire_timeout(config.store.timeout)
        .connect(&config.database_url)
        .await?;

    let metrics = Arc::new(PricingMetrics::new());
    let repos = pg_repositories(pool).guarded(config.store.clone(), metrics.clone());
    let settings = PricingSettings {
        first_order_code: config.first_order_code.clone(),
        candidate_limit: config.auto_apply_candidate_limit,
    };
    let state = AppState { pricing: Arc::new(PricingService::new(repos, settings, metrics)) };
    let app = build_router(state, &config.cors_allowed_origins);

    let ip: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((ip, config.port));
    info!(%addr, "starting pricing-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
