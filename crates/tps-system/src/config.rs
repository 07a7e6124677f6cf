//! Engine configuration loading.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tps_core::MAX_OPTION_INDEX;
use tps_eval::EvalSettings;

/// Engine configuration (`tps.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Criteria cheaper than this are evaluated for every point during setup.
    #[serde(default = "default_cheap_cost_threshold")]
    pub cheap_cost_threshold: i32,

    /// Synchronous queries give up after this long.
    #[serde(default = "default_sync_hard_cap_ms")]
    pub sync_hard_cap_ms: u64,

    /// Synchronous queries slower than this log a warning.
    #[serde(default = "default_sync_warn_threshold_ms")]
    pub sync_warn_threshold_ms: u64,

    /// Finished queries delivered per `update` call.
    #[serde(default = "default_max_completions_per_update")]
    pub max_completions_per_update: usize,

    /// Number of fallback options a query may define.
    #[serde(default = "default_max_options")]
    pub max_options: usize,

    /// Log rejected criteria, missing objects and slow queries.
    #[serde(default = "default_warnings")]
    pub warnings: bool,
}

fn default_cheap_cost_threshold() -> i32 {
    tps_core::Cost::CHEAP_THRESHOLD
}

fn default_sync_hard_cap_ms() -> u64 {
    1000
}

fn default_sync_warn_threshold_ms() -> u64 {
    20
}

fn default_max_completions_per_update() -> usize {
    1
}

fn default_max_options() -> usize {
    MAX_OPTION_INDEX + 1
}

fn default_warnings() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cheap_cost_threshold: default_cheap_cost_threshold(),
            sync_hard_cap_ms: default_sync_hard_cap_ms(),
            sync_warn_threshold_ms: default_sync_warn_threshold_ms(),
            max_completions_per_update: default_max_completions_per_update(),
            max_options: default_max_options(),
            warnings: default_warnings(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Invalid engine config")?;
        anyhow::ensure!(
            config.max_options > 0 && config.max_options <= MAX_OPTION_INDEX + 1,
            "max_options must be between 1 and {}",
            MAX_OPTION_INDEX + 1
        );
        Ok(config)
    }

    pub fn sync_hard_cap(&self) -> Duration {
        Duration::from_millis(self.sync_hard_cap_ms)
    }

    pub fn sync_warn_threshold(&self) -> Duration {
        Duration::from_millis(self.sync_warn_threshold_ms)
    }

    pub fn eval_settings(&self) -> EvalSettings {
        EvalSettings {
            cheap_cost_threshold: self.cheap_cost_threshold,
            warnings: self.warnings,
        }
    }
}
