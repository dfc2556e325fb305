use std::cell::Cell;

use serde::{Deserialize, Serialize};
use storesweep_env::Observation;

/// A decision rule mapping observations to actions.
pub trait Policy {
    fn predict(&self, observation: &Observation) -> f64;

    /// Estimated return from `observation`, if the policy carries a value function.
    fn value_estimate(&self, observation: &Observation) -> Option<f64> {
        let _ = observation;
        None
    }
}

/// Affine map of the observation squashed into the action bounds.
///
/// With parameters `w` (one per observation component plus a trailing bias),
/// the action is `low + (tanh(w · [obs, 1]) + 1) / 2 * (high - low)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPolicy {
    action_low: f64,
    action_high: f64,
    weights: Vec<f64>,
    value_weights: Option<Vec<f64>>,
}

impl LinearPolicy {
    #[must_use]
    pub fn new(weights: Vec<f64>, (action_low, action_high): (f64, f64)) -> Self {
        Self {
            action_low,
            action_high,
            weights,
            value_weights: None,
        }
    }

    /// Number of parameters for a policy over `observation_dim` inputs.
    #[must_use]
    pub fn parameter_count(observation_dim: usize) -> usize {
        observation_dim + 1
    }

    /// Attaches a linear value function with the same layout as the policy weights.
    #[must_use]
    pub fn with_value_function(mut self, value_weights: Vec<f64>) -> Self {
        self.value_weights = Some(value_weights);
        self
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn value_weights(&self) -> Option<&[f64]> {
        self.value_weights.as_deref()
    }

    #[must_use]
    pub fn action_bounds(&self) -> (f64, f64) {
        (self.action_low, self.action_high)
    }

    /// Whether every parameter (and value weight) is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.weights
            .iter()
            .chain(self.value_weights.iter().flatten())
            .all(|w| w.is_finite())
            && self.action_low.is_finite()
            && self.action_high.is_finite()
    }
}

impl Policy for LinearPolicy {
    fn predict(&self, observation: &Observation) -> f64 {
        let z = affine(&self.weights, observation);
        let unit = (z.tanh() + 1.0) / 2.0;
        self.action_low + unit * (self.action_high - self.action_low)
    }

    fn value_estimate(&self, observation: &Observation) -> Option<f64> {
        self.value_weights
            .as_deref()
            .map(|weights| affine(weights, observation))
    }
}

/// `weights[..n] · observation + weights[n]`, where the trailing weight is the bias.
pub(crate) fn affine(weights: &[f64], observation: &Observation) -> f64 {
    let Some((bias, coefficients)) = weights.split_last() else {
        return 0.0;
    };
    coefficients
        .iter()
        .zip(observation.as_slice())
        .map(|(w, x)| w * x)
        .sum::<f64>()
        + bias
}

/// Baseline that ignores observations and cycles through a fixed list of actions.
///
/// The position in the cycle is the only state it keeps.
#[derive(Debug, Clone)]
pub struct FixedDummyPolicy {
    actions: Vec<f64>,
    cursor: Cell<usize>,
}

impl FixedDummyPolicy {
    #[must_use]
    pub fn new(actions: Vec<f64>) -> Self {
        Self {
            actions,
            cursor: Cell::new(0),
        }
    }

    /// Restarts the cycle from the first action.
    pub fn rewind(&self) {
        self.cursor.set(0);
    }
}

impl Policy for FixedDummyPolicy {
    fn predict(&self, _observation: &Observation) -> f64 {
        if self.actions.is_empty() {
            return 0.0;
        }
        let i = self.cursor.get();
        self.cursor.set((i + 1) % self.actions.len());
        self.actions[i]
    }
}
