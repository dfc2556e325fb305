use std::{io, path::PathBuf};

use storesweep_env::InvalidWeightsError;
use storesweep_training::algorithm::TrainingError;

use crate::{artifact::ArtifactError, cache_key::CacheKey};

/// Invalid or degenerate sweep input, detected before any training starts.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigurationError {
    #[display("step {step} must be finite and strictly positive")]
    InvalidStep { step: f64 },
    #[display("step {step} appears more than once in the step set")]
    DuplicateStep { step: f64 },
    #[display("step {step} rounds to a zero weight key")]
    ZeroKeyStep { step: f64 },
    #[display("steps {first} and {second} both round to weight key component {key}")]
    KeyCollision { first: f64, second: f64, key: u64 },
    #[display("invalid raw reward weights")]
    InvalidWeights(InvalidWeightsError),
    #[display("training budget must be at least one step")]
    EmptyBudget,
    #[display("worker count must be at least 1")]
    NoWorkers,
}

impl From<InvalidWeightsError> for ConfigurationError {
    fn from(err: InvalidWeightsError) -> Self {
        Self::InvalidWeights(err)
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ArchiveError {
    #[display("archive {} does not exist", path.display())]
    NotFound { path: PathBuf },
    #[display("failed to serialize archive {}", path.display())]
    Serialization {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("archive {} is not a valid result archive: {reason}", path.display())]
    Deserialization { path: PathBuf, reason: String },
    #[display("I/O error on archive {}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SweepError {
    #[display("invalid sweep configuration")]
    Configuration(ConfigurationError),
    #[display("training failed for cache key {key}")]
    TrainingFailure {
        key: CacheKey,
        source: TrainingError,
    },
    /// A cached artifact exists but cannot be used. Never retrained automatically.
    #[display("cached policy artifact {} is unusable", path.display())]
    ArtifactCorruption {
        path: PathBuf,
        source: ArtifactError,
    },
    #[display("failed to persist policy artifact {}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        source: ArtifactError,
    },
    #[display("failed to create cache directory {}", path.display())]
    CacheDir { path: PathBuf, source: io::Error },
    #[display("result archive error")]
    Archive(ArchiveError),
}

impl From<ConfigurationError> for SweepError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err)
    }
}

impl From<ArchiveError> for SweepError {
    fn from(err: ArchiveError) -> Self {
        Self::Archive(err)
    }
}
