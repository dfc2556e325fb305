//! Train-or-load memoization of trained policies.

use std::{fs, path::PathBuf};

use chrono::Utc;
use storesweep_env::EnvironmentFactory;
use storesweep_training::algorithm::{Trainer, TrainingError, TrainingRequest};
use tracing::{info, warn};

use crate::{
    artifact::{ARTIFACT_FORMAT_VERSION, ArtifactError, PolicyArtifact},
    cache_key::CacheKey,
    config::SweepConfig,
    error::SweepError,
    grid::GridPoint,
};

/// Returns the cached policy for a key, training and persisting it when absent.
#[derive(Debug, Clone)]
pub struct MemoizedTrainer {
    cache_dir: PathBuf,
    force_retrain: bool,
    base_seed: u64,
}

impl MemoizedTrainer {
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>, force_retrain: bool, base_seed: u64) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            force_retrain,
            base_seed,
        }
    }

    #[must_use]
    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(config.cache_dir.clone(), config.force_retrain, config.seed)
    }

    /// Loads the artifact stored under `key`, or trains one and stores it.
    ///
    /// An existing artifact that cannot be read is reported as
    /// [`SweepError::ArtifactCorruption`] and left in place. With
    /// `force_retrain`, existing artifacts are ignored and overwritten.
    pub fn train_or_load<F, T>(
        &self,
        factory: &F,
        trainer: &T,
        key: &CacheKey,
        point: &GridPoint,
        budget_steps: usize,
    ) -> Result<PolicyArtifact, SweepError>
    where
        F: EnvironmentFactory,
        T: Trainer,
    {
        let path = key.artifact_path(&self.cache_dir);
        if path.exists() {
            if !self.force_retrain {
                let artifact = load_checked(trainer, key, path)?;
                info!(%key, "loaded cached policy");
                return Ok(artifact);
            }
            warn!(%key, path = %path.display(), "force retrain: overwriting cached policy");
        }

        fs::create_dir_all(&self.cache_dir).map_err(|source| SweepError::CacheDir {
            path: self.cache_dir.clone(),
            source,
        })?;

        let request = TrainingRequest {
            weights: point.weights(),
            budget_steps,
            seed: key.training_seed(self.base_seed),
        };
        info!(%key, budget_steps, seed = request.seed, "training policy");
        let trained = trainer
            .train(factory, &request)
            .and_then(|trained| {
                if trained.final_return.is_finite() {
                    Ok(trained)
                } else {
                    Err(TrainingError::NonFiniteReturn)
                }
            })
            .map_err(|source| SweepError::TrainingFailure {
                key: key.clone(),
                source,
            })?;

        let artifact = PolicyArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            algorithm: trainer.algorithm(),
            cache_key: key.as_str().to_owned(),
            raw_weights: point.raw(),
            reward_weights: point.weights(),
            trained_at: Utc::now(),
            training_steps: trained.steps_used,
            final_return: trained.final_return,
            policy: trained.policy,
        };
        artifact
            .save(&path)
            .map_err(|source| SweepError::ArtifactWrite {
                path: path.clone(),
                source,
            })?;
        info!(
            %key,
            steps = artifact.training_steps,
            final_return = artifact.final_return,
            "saved trained policy"
        );
        Ok(artifact)
    }
}

/// Opens an artifact and checks that it belongs to `trainer` and `key`.
fn load_checked<T>(trainer: &T, key: &CacheKey, path: PathBuf) -> Result<PolicyArtifact, SweepError>
where
    T: Trainer,
{
    let check = || {
        let artifact = PolicyArtifact::open(&path)?;
        let expected = trainer.algorithm();
        if artifact.algorithm != expected {
            return Err(ArtifactError::AlgorithmMismatch {
                path: path.clone(),
                expected,
                found: artifact.algorithm,
            });
        }
        if artifact.cache_key != key.as_str() {
            return Err(ArtifactError::KeyMismatch {
                path: path.clone(),
                expected: key.as_str().to_owned(),
                found: artifact.cache_key,
            });
        }
        Ok(artifact)
    };
    check().map_err(|source| SweepError::ArtifactCorruption { path, source })
}
