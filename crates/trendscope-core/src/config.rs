use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing/validation logic is decoupled from the actual environment so it
/// can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let trends_base_url = require("TRENDSCOPE_TRENDS_BASE_URL")?;

    let bind_addr = parse_addr("TRENDSCOPE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("TRENDSCOPE_LOG_LEVEL", "info");
    let scenarios_path = PathBuf::from(or_default(
        "TRENDSCOPE_SCENARIOS_PATH",
        "./config/scenarios.yaml",
    ));

    let trends_timeout_secs = parse_u64("TRENDSCOPE_TRENDS_TIMEOUT_SECS", "30")?;
    let trends_max_retries = parse_u32("TRENDSCOPE_TRENDS_MAX_RETRIES", "3")?;
    let trends_backoff_base_ms = parse_u64("TRENDSCOPE_TRENDS_BACKOFF_BASE_MS", "1000")?;
    let trends_timeframe = or_default("TRENDSCOPE_TRENDS_TIMEFRAME", "today 1-m");
    let seed_fetch_timeout_secs = parse_u64("TRENDSCOPE_SEED_FETCH_TIMEOUT_SECS", "20")?;

    // 7 days, the discovery cache TTL.
    let snapshot_max_age_secs = parse_u64("TRENDSCOPE_SNAPSHOT_MAX_AGE_SECS", "604800")?;

    let db_max_connections = parse_u32("TRENDSCOPE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("TRENDSCOPE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("TRENDSCOPE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        bind_addr,
        log_level,
        scenarios_path,
        trends_base_url,
        trends_timeout_secs,
        trends_max_retries,
        trends_backoff_base_ms,
        trends_timeframe,
        seed_fetch_timeout_secs,
        snapshot_max_age_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}
