use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Frame, RewardWeights};

/// Per-step diagnostic values reported alongside an observation.
pub type StepInfo = BTreeMap<String, f64>;

/// Episode diagnostics: one time series per named field.
pub type OutputDict = BTreeMap<String, Vec<f64>>;

/// Observation vector handed to a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation(Vec<f64>);

impl Observation {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
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
}

/// Outcome of a single environment transition.
#[derive(Debug, Clone)]
pub struct Step {
    pub observation: Observation,
    pub reward: f64,
    /// The episode reached a terminal state of the simulated system.
    pub terminated: bool,
    /// The episode was cut off by its time limit.
    pub truncated: bool,
    pub info: StepInfo,
}

impl Step {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// A simulated control problem with a three-component reward.
///
/// The reward weighting is fixed for the lifetime of an instance; build a new
/// instance through an [`EnvironmentFactory`] to change it.
pub trait Environment {
    /// Dimension of every observation this environment produces.
    fn observation_dim(&self) -> usize;

    /// Inclusive `(min, max)` range of valid actions.
    fn action_bounds(&self) -> (f64, f64);

    fn reward_weights(&self) -> RewardWeights;

    /// Starts a fresh episode.
    fn reset(&mut self) -> (Observation, StepInfo);

    /// Applies `action` and advances the simulation by one step.
    fn step(&mut self, action: f64) -> Step;

    /// Renders the current state, or `None` when rendering is disabled.
    fn render(&self) -> Option<Frame>;

    /// Diagnostics collected since the last [`reset`](Environment::reset).
    fn output_dict(&self) -> OutputDict;
}

/// Builds independent environment instances for a given reward weighting.
///
/// Implemented for any `Fn(RewardWeights) -> E`, so closures can be passed
/// wherever a factory is expected.
pub trait EnvironmentFactory: Sync {
    type Env: Environment;

    fn build(&self, weights: RewardWeights) -> Self::Env;
}

impl<F, E> EnvironmentFactory for F
where
    F: Fn(RewardWeights) -> E + Sync,
    E: Environment,
{
    type Env = E;

    fn build(&self, weights: RewardWeights) -> Self::Env {
        self(weights)
    }
}
