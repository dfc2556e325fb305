//! Persisted trained policies.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storesweep_env::{Observation, REWARD_DIM, RewardWeights};
use storesweep_training::{
    algorithm::Algorithm,
    policy::{LinearPolicy, Policy},
};

use crate::atomic::atomic_write;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ArtifactError {
    #[display("failed to read {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("{} has unsupported format version {found}", path.display())]
    UnsupportedVersion { path: PathBuf, found: u32 },
    #[display("{} was trained by {found}, expected {expected}", path.display())]
    AlgorithmMismatch {
        path: PathBuf,
        expected: Algorithm,
        found: Algorithm,
    },
    #[display("{} is stored under key {found}, expected {expected}", path.display())]
    KeyMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[display("{} would store a non-finite {field}", path.display())]
    NonFinite { path: PathBuf, field: &'static str },
    #[display("failed to serialize {}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("failed to write {}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// A trained policy with the metadata it was trained under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyArtifact {
    pub format_version: u32,
    pub algorithm: Algorithm,
    pub cache_key: String,
    pub raw_weights: [f64; REWARD_DIM],
    pub reward_weights: RewardWeights,
    pub trained_at: DateTime<Utc>,
    pub training_steps: usize,
    pub final_return: f64,
    pub policy: LinearPolicy,
}

impl PolicyArtifact {
    pub fn open<P>(path: P) -> Result<Self, ArtifactError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ArtifactError::Read {
            path: path.to_owned(),
            source,
        })?;
        let artifact: Self = serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
            path: path.to_owned(),
            source,
        })?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                path: path.to_owned(),
                found: artifact.format_version,
            });
        }
        Ok(artifact)
    }

    /// Writes the artifact atomically; a crash never leaves a partial file.
    ///
    /// Non-finite numbers are rejected, since JSON would store them as `null`.
    pub fn save<P>(&self, path: P) -> Result<(), ArtifactError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if let Some(field) = self.non_finite_field() {
            return Err(ArtifactError::NonFinite {
                path: path.to_owned(),
                field,
            });
        }
        let json = serde_json::to_vec_pretty(self).map_err(|source| ArtifactError::Serialize {
            path: path.to_owned(),
            source,
        })?;
        atomic_write(path, &json).map_err(|source| ArtifactError::Write {
            path: path.to_owned(),
            source,
        })
    }

    fn non_finite_field(&self) -> Option<&'static str> {
        if !self.final_return.is_finite() {
            return Some("final_return");
        }
        if self.raw_weights.iter().any(|w| !w.is_finite()) {
            return Some("raw_weights");
        }
        if !self.policy.is_finite() {
            return Some("policy");
        }
        None
    }
}

impl Policy for PolicyArtifact {
    fn predict(&self, observation: &Observation) -> f64 {
        self.policy.predict(observation)
    }

    fn value_estimate(&self, observation: &Observation) -> Option<f64> {
        self.policy.value_estimate(observation)
    }
}
