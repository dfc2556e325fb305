use serde::{Deserialize, Serialize};

/// Number of reward components every environment reports.
pub const REWARD_DIM: usize = 3;

/// Maximum deviation from 1.0 accepted when reading already-normalized weights.
const NORMALIZED_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InvalidWeightsError {
    #[display("reward weights must be finite and non-negative, got {raw:?}")]
    NegativeOrNonFinite { raw: [f64; REWARD_DIM] },
    #[display("reward weights must not all be zero")]
    AllZero,
    #[display("normalized reward weights must sum to 1, got {sum}")]
    NotNormalized { sum: f64 },
}

/// Relative importance of the three reward components.
///
/// Always normalized: the components are non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; REWARD_DIM]", into = "[f64; REWARD_DIM]")]
pub struct RewardWeights([f64; REWARD_DIM]);

impl RewardWeights {
    /// Weights every component equally.
    #[must_use]
    pub fn equal() -> Self {
        Self([1.0 / 3.0; REWARD_DIM])
    }

    /// Normalizes raw (un-normalized) weights so that they sum to 1.
    ///
    /// Raw weights must be finite, non-negative and not all zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use storesweep_env::RewardWeights;
    ///
    /// let weights = RewardWeights::normalize([10.0, 1.0, 1.0]).unwrap();
    /// assert!((weights.as_array()[0] - 10.0 / 12.0).abs() < 1e-12);
    /// assert!(RewardWeights::normalize([0.0, 0.0, 0.0]).is_err());
    /// ```
    pub fn normalize(raw: [f64; REWARD_DIM]) -> Result<Self, InvalidWeightsError> {
        if raw.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(InvalidWeightsError::NegativeOrNonFinite { raw });
        }
        let sum: f64 = raw.iter().sum();
        if !sum.is_finite() {
            return Err(InvalidWeightsError::NegativeOrNonFinite { raw });
        }
        if sum <= 0.0 {
            return Err(InvalidWeightsError::AllZero);
        }
        Ok(Self(raw.map(|w| w / sum)))
    }

    #[must_use]
    pub fn as_array(&self) -> [f64; REWARD_DIM] {
        self.0
    }

    /// Weighted sum of per-component rewards.
    #[must_use]
    pub fn combine(&self, components: &[f64; REWARD_DIM]) -> f64 {
        self.0.iter().zip(components).map(|(w, c)| w * c).sum()
    }
}

impl TryFrom<[f64; REWARD_DIM]> for RewardWeights {
    type Error = InvalidWeightsError;

    fn try_from(value: [f64; REWARD_DIM]) -> Result<Self, Self::Error> {
        if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(InvalidWeightsError::NegativeOrNonFinite { raw: value });
        }
        let sum: f64 = value.iter().sum();
        if (sum - 1.0).abs() > NORMALIZED_SUM_TOLERANCE {
            return Err(InvalidWeightsError::NotNormalized { sum });
        }
        Ok(Self(value))
    }
}

impl From<RewardWeights> for [f64; REWARD_DIM] {
    fn from(value: RewardWeights) -> Self {
        value.0
    }
}
