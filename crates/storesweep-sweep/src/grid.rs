//! Enumeration of the reward-weight grid.

use std::{fmt, iter::FusedIterator};

use serde::{Deserialize, Serialize};
use storesweep_env::{REWARD_DIM, RewardWeights};

use crate::error::ConfigurationError;

/// Largest accepted step, so that any triple of steps has a finite sum.
const MAX_STEP: f64 = f64::MAX / 4.0;

/// Ordered set of strictly positive step values used on every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSet(Vec<f64>);

impl StepSet {
    /// Validates the steps: each must be strictly positive and at most
    /// [`f64::MAX`]` / 4`, and no value may repeat. An empty step set is valid and yields an empty grid.
    ///
    /// Results are keyed by [`WeightKey`], so every step must also round to
    /// its own non-zero integer; otherwise distinct grid points would share
    /// one entry of the archive.
    pub fn new(steps: Vec<f64>) -> Result<Self, ConfigurationError> {
        for (i, &step) in steps.iter().enumerate() {
            if !(step > 0.0 && step <= MAX_STEP) {
                return Err(ConfigurationError::InvalidStep { step });
            }
            if steps[..i].contains(&step) {
                return Err(ConfigurationError::DuplicateStep { step });
            }
            let key = key_component(step);
            if key == 0 {
                return Err(ConfigurationError::ZeroKeyStep { step });
            }
            if let Some(&first) = steps[..i].iter().find(|&&s| key_component(s) == key) {
                return Err(ConfigurationError::KeyCollision {
                    first,
                    second: step,
                    key,
                });
            }
        }
        Ok(Self(steps))
    }

    #[must_use]
    pub fn steps(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lazily enumerates S×S×S, first axis outermost.
    #[must_use]
    pub fn grid(&self) -> WeightGrid<'_> {
        WeightGrid {
            steps: &self.0,
            next_index: 0,
        }
    }
}

/// One raw weight triple of the grid and its normalized form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    raw: [f64; REWARD_DIM],
    weights: RewardWeights,
}

impl GridPoint {
    pub fn new(raw: [f64; REWARD_DIM]) -> Result<Self, ConfigurationError> {
        let weights = RewardWeights::normalize(raw)?;
        Ok(Self { raw, weights })
    }

    /// Weights before normalization, as drawn from the step set.
    #[must_use]
    pub fn raw(&self) -> [f64; REWARD_DIM] {
        self.raw
    }

    #[must_use]
    pub fn weights(&self) -> RewardWeights {
        self.weights
    }

    /// Key of this point in the aggregated results.
    #[must_use]
    pub fn key(&self) -> WeightKey {
        WeightKey::from_raw(self.raw)
    }
}

/// Iterator over every [`GridPoint`] of a [`StepSet`].
#[derive(Debug, Clone)]
pub struct WeightGrid<'a> {
    steps: &'a [f64],
    next_index: usize,
}

impl WeightGrid<'_> {
    fn total(&self) -> usize {
        self.steps.len().pow(3)
    }
}

impl Iterator for WeightGrid<'_> {
    type Item = GridPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.total() {
            return None;
        }
        let n = self.steps.len();
        let i = self.next_index;
        self.next_index += 1;
        let raw = [self.steps[i / (n * n)], self.steps[(i / n) % n], self.steps[i % n]];
        Some(GridPoint::new(raw).expect("step set holds strictly positive steps"))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total() - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WeightGrid<'_> {}

impl FusedIterator for WeightGrid<'_> {}

/// Integer-rounded raw weight triple identifying a grid point in the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeightKey(pub [u64; REWARD_DIM]);

impl WeightKey {
    #[must_use]
    pub fn from_raw(raw: [f64; REWARD_DIM]) -> Self {
        Self(raw.map(key_component))
    }
}

/// Nearest integer, saturating at the bounds of `u64`.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn key_component(weight: f64) -> u64 {
    weight.round() as u64
}

impl fmt::Display for WeightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "({a}, {b}, {c})")
    }
}
