//! Scenario configuration: the scenario-to-seed-keyword mapping.
//!
//! Loaded once from YAML at process start and read-only thereafter. The
//! loaded [`ScenarioSet`] is passed explicitly into the aggregator and cache
//! rather than living in ambient global state, so tests can fabricate
//! scenarios freely.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DEFAULT_GEO: &str = "TW";
const DEFAULT_TOP_N: usize = 5;

fn default_geo() -> String {
    DEFAULT_GEO.to_string()
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

/// One configured vertical: a stable id, a display name, and the ordered
/// seed keywords queried against the trends source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub id: String,
    pub name: String,
    /// Region code used when a request does not specify one.
    #[serde(default = "default_geo")]
    pub geo: String,
    /// How many ranked keywords a snapshot keeps.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Keywords with a merged average below this are dropped from the
    /// ranking. Unset keeps zero-interest seeds in the list.
    #[serde(default)]
    pub min_score: Option<f64>,
    pub seeds: Vec<String>,
}

/// Top-level shape of `scenarios.yaml`.
#[derive(Debug, Deserialize)]
pub struct ScenariosFile {
    pub scenarios: Vec<ScenarioConfig>,
}

/// Validated, immutable set of scenarios, in file order.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    scenarios: Vec<ScenarioConfig>,
}

impl ScenarioSet {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ScenarioConfig> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioConfig> {
        self.scenarios.iter()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.id.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Load and validate the scenario configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_scenarios(path: &Path) -> Result<ScenarioSet, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ScenariosFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: ScenariosFile = serde_yaml::from_str(&content)?;
    validate_scenarios(&file)?;

    Ok(ScenarioSet {
        scenarios: file.scenarios,
    })
}

/// Build a [`ScenarioSet`] from already-constructed configs, with the same
/// validation as [`load_scenarios`].
///
/// # Errors
///
/// Returns `ConfigError::Validation` if the set fails validation.
pub fn scenario_set(scenarios: Vec<ScenarioConfig>) -> Result<ScenarioSet, ConfigError> {
    let file = ScenariosFile { scenarios };
    validate_scenarios(&file)?;
    Ok(ScenarioSet {
        scenarios: file.scenarios,
    })
}

fn validate_scenarios(file: &ScenariosFile) -> Result<(), ConfigError> {
    if file.scenarios.is_empty() {
        return Err(ConfigError::Validation(
            "at least one scenario must be configured".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();

    for scenario in &file.scenarios {
        if scenario.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "scenario id must be non-empty".to_string(),
            ));
        }

        if !seen_ids.insert(scenario.id.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate scenario id: '{}'",
                scenario.id
            )));
        }

        if scenario.seeds.is_empty() {
            return Err(ConfigError::Validation(format!(
                "scenario '{}' has no seed keywords",
                scenario.id
            )));
        }

        if scenario.top_n == 0 {
            return Err(ConfigError::Validation(format!(
                "scenario '{}' has top_n = 0; must keep at least one keyword",
                scenario.id
            )));
        }

        let mut seen_seeds = HashSet::new();
        for seed in &scenario.seeds {
            if seed.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "scenario '{}' contains a blank seed keyword",
                    scenario.id
                )));
            }
            if !seen_seeds.insert(seed.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "scenario '{}' lists seed '{}' more than once",
                    scenario.id, seed
                )));
            }
        }
    }

    Ok(())
}
