use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigurationError, grid::StepSet};

/// Parameters of one sweep, shared by every algorithm swept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Values taken by each raw weight.
    pub steps: Vec<f64>,
    /// Environment steps each training run may consume.
    pub training_budget: usize,
    pub cache_dir: PathBuf,
    /// Retrain and overwrite artifacts even when they are cached.
    pub force_retrain: bool,
    /// Number of grid points processed concurrently.
    pub jobs: usize,
    /// Base seed, combined with each cache key to seed training.
    pub seed: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            steps: vec![1.0, 10.0, 100.0],
            training_budget: 10_000,
            cache_dir: PathBuf::from("cached_models"),
            force_retrain: false,
            jobs: 1,
            seed: 0,
        }
    }
}

impl SweepConfig {
    /// Validates the whole configuration and returns its step set.
    pub fn step_set(&self) -> Result<StepSet, ConfigurationError> {
        if self.training_budget == 0 {
            return Err(ConfigurationError::EmptyBudget);
        }
        if self.jobs == 0 {
            return Err(ConfigurationError::NoWorkers);
        }
        StepSet::new(self.steps.clone())
    }
}
