use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use trendscope_discovery::{AggregatorSettings, SnapshotAggregator, SnapshotCache};
use trendscope_trends::TrendsClient;

#[derive(Debug, Parser)]
#[command(name = "trendscope-cli")]
#[command(about = "Scenario keyword discovery from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Discover high-interest keywords for one scenario.
    Discover {
        /// Scenario id from scenarios.yaml (e.g. travel, dental).
        scenario: String,
        /// Region code; defaults to the scenario's configured geo.
        #[arg(long)]
        geo: Option<String>,
        /// Ignore the stored snapshot and re-aggregate.
        #[arg(long)]
        force: bool,
    },
    /// List the configured scenarios and their seed keywords.
    Scenarios,
    /// Show stored snapshots for one scenario, newest first.
    History {
        scenario: String,
        #[arg(long)]
        geo: Option<String>,
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = trendscope_core::load_app_config_from_env()?;
    let scenarios = trendscope_core::load_scenarios(&config.scenarios_path)?;

    match cli.command {
        Commands::Scenarios => {
            for scenario in scenarios.iter() {
                println!(
                    "{:12} {} (geo={}, top_n={})",
                    scenario.id, scenario.name, scenario.geo, scenario.top_n
                );
                println!("             seeds: {}", scenario.seeds.join(", "));
            }
            return Ok(());
        }
        Commands::Discover {
            scenario,
            geo,
            force,
        } => {
            let cache = build_cache(&config, scenarios).await?;
            let served = if force {
                cache.force_refresh(&scenario, geo.as_deref()).await?
            } else {
                cache
                    .get_or_refresh(
                        &scenario,
                        geo.as_deref(),
                        Duration::from_secs(config.snapshot_max_age_secs),
                    )
                    .await?
            };

            let source = if served.from_cache { "store" } else { "live" };
            let stale_note = if served.stale { " (stale fallback)" } else { "" };
            println!(
                "snapshot {} for {} [{}] from {}{} at {}",
                served.snapshot.id,
                served.snapshot.scenario,
                served.snapshot.geo,
                source,
                stale_note,
                served.snapshot.created_at
            );

            println!("\ntop keywords:");
            for (rank, kw) in served.snapshot.top_keywords.iter().enumerate() {
                println!("  {}. {:16} avg_score={:.2}", rank + 1, kw.keyword, kw.avg_score);
            }

            println!("\nrelated keywords ({}):", served.snapshot.related_kws.len());
            for related in &served.snapshot.related_kws {
                println!(
                    "  [{}] {:20} source={} value={:.0}",
                    related.kind, related.keyword, related.source, related.value
                );
            }
        }
        Commands::History {
            scenario,
            geo,
            limit,
        } => {
            let cache = build_cache(&config, scenarios).await?;
            let snapshots = cache.history(&scenario, geo.as_deref(), limit).await?;
            if snapshots.is_empty() {
                println!("no stored snapshots for '{scenario}'");
                return Ok(());
            }
            for snapshot in snapshots {
                let top: Vec<String> = snapshot
                    .top_keywords
                    .iter()
                    .map(|k| format!("{} ({:.1})", k.keyword, k.avg_score))
                    .collect();
                println!(
                    "{}  {}  top: {}",
                    snapshot.created_at,
                    snapshot.id,
                    top.join(", ")
                );
            }
        }
    }

    Ok(())
}

async fn build_cache(
    config: &trendscope_core::AppConfig,
    scenarios: trendscope_core::ScenarioSet,
) -> anyhow::Result<SnapshotCache> {
    let pool_config = trendscope_db::PoolConfig::from_app_config(config);
    let pool = trendscope_db::connect_pool(&config.database_url, pool_config).await?;
    trendscope_db::run_migrations(&pool).await?;

    let trends = TrendsClient::new(&config.trends_base_url, config.trends_timeout_secs)?
        .with_retry_policy(config.trends_max_retries, config.trends_backoff_base_ms);
    let aggregator = SnapshotAggregator::new(
        Arc::new(trends),
        AggregatorSettings::from_app_config(config),
    );
    let store = Arc::new(trendscope_db::PgSnapshotStore::new(pool));

    Ok(SnapshotCache::new(scenarios, aggregator, store))
}
