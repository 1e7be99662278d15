pub mod app_config;
pub mod config;
pub mod errors;
pub mod scenarios;
pub mod source;
pub mod store;
pub mod types;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use errors::{AggregationError, StoreError, TrendsError};
pub use scenarios::{load_scenarios, scenario_set, ScenarioConfig, ScenarioSet, ScenariosFile};
pub use source::TrendsSource;
pub use store::SnapshotStore;
pub use types::{
    InterestPoint, KeywordScore, KeywordSnapshot, RelatedEntry, RelatedKeyword, RelatedKind,
    RelatedQueries, TrendSeries,
};

/// Errors raised while loading or validating process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read scenarios file {path}: {source}")]
    ScenariosFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenarios file: {0}")]
    ScenariosFileParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
