mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use trendscope_discovery::{AggregatorSettings, SnapshotAggregator, SnapshotCache};
use trendscope_trends::TrendsClient;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = trendscope_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let scenarios = trendscope_core::load_scenarios(&config.scenarios_path)?;
    tracing::info!(count = scenarios.len(), "loaded scenario configuration");

    let pool_config = trendscope_db::PoolConfig::from_app_config(&config);
    let pool = trendscope_db::connect_pool(&config.database_url, pool_config).await?;
    trendscope_db::run_migrations(&pool).await?;

    let trends = TrendsClient::new(&config.trends_base_url, config.trends_timeout_secs)?
        .with_retry_policy(config.trends_max_retries, config.trends_backoff_base_ms);
    let aggregator = SnapshotAggregator::new(
        Arc::new(trends),
        AggregatorSettings::from_app_config(&config),
    );
    let store = Arc::new(trendscope_db::PgSnapshotStore::new(pool.clone()));
    let cache = SnapshotCache::new(scenarios, aggregator, store);

    let _scheduler = scheduler::build_scheduler(cache.clone()).await?;

    let app = build_app(AppState {
        pool,
        cache,
        max_age: Duration::from_secs(config.snapshot_max_age_secs),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "trendscope server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
