use serde::{Deserialize, Serialize};
use storesweep_env::{Environment, EnvironmentFactory, Observation, RewardWeights};

use crate::{
    cross_entropy::CrossEntropyTrainer,
    genetic::GeneticTrainer,
    policy::{LinearPolicy, Policy},
};

/// Upper bound on the length of a single episode, in training and evaluation.
///
/// Guards against environments that never signal the end of an episode.
pub const MAX_EPISODE_STEPS: usize = 100_000;

/// Identity of a training algorithm.
///
/// The name is part of every cache key and archive file name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
pub enum Algorithm {
    #[display("Genetic")]
    Genetic,
    #[display("CrossEntropy")]
    CrossEntropy,
}

impl Algorithm {
    /// Algorithms swept by a default run, in order.
    pub const ALL: [Self; 2] = [Self::Genetic, Self::CrossEntropy];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Genetic => "Genetic",
            Self::CrossEntropy => "CrossEntropy",
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TrainingError {
    #[display("training budget must be at least one step")]
    EmptyBudget,
    #[display("environment produces empty observations")]
    EmptyObservation,
    #[display("environment reports invalid action bounds ({low}, {high})")]
    InvalidActionBounds { low: f64, high: f64 },
    #[display("training produced non-finite policy parameters")]
    NonFiniteParameters,
    #[display("environment produced a non-finite episode return")]
    NonFiniteReturn,
}

/// Everything a trainer needs besides the environment factory.
#[derive(Debug, Clone, Copy)]
pub struct TrainingRequest {
    pub weights: RewardWeights,
    /// Number of environment steps the trainer may consume.
    ///
    /// Checked between iterations, so the final iteration may overshoot it.
    pub budget_steps: usize,
    pub seed: u64,
}

/// A freshly trained policy together with training metadata.
#[derive(Debug, Clone)]
pub struct TrainedPolicy {
    pub policy: LinearPolicy,
    pub steps_used: usize,
    /// Undiscounted return of the returned policy on its last training episode.
    pub final_return: f64,
}

/// A policy optimization procedure.
pub trait Trainer: Sync {
    fn algorithm(&self) -> Algorithm;

    /// Trains a policy on environments built from `factory` with `request.weights`.
    fn train<F>(&self, factory: &F, request: &TrainingRequest) -> Result<TrainedPolicy, TrainingError>
    where
        F: EnvironmentFactory;
}

/// Dispatches to the trainer of a given [`Algorithm`].
#[derive(Debug, Clone)]
pub enum AlgorithmTrainer {
    Genetic(GeneticTrainer),
    CrossEntropy(CrossEntropyTrainer),
}

impl AlgorithmTrainer {
    /// The algorithm's trainer with default hyper-parameters.
    #[must_use]
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Genetic => Self::Genetic(GeneticTrainer::default()),
            Algorithm::CrossEntropy => Self::CrossEntropy(CrossEntropyTrainer::default()),
        }
    }
}

impl Trainer for AlgorithmTrainer {
    fn algorithm(&self) -> Algorithm {
        match self {
            Self::Genetic(trainer) => trainer.algorithm(),
            Self::CrossEntropy(trainer) => trainer.algorithm(),
        }
    }

    fn train<F>(&self, factory: &F, request: &TrainingRequest) -> Result<TrainedPolicy, TrainingError>
    where
        F: EnvironmentFactory,
    {
        match self {
            Self::Genetic(trainer) => trainer.train(factory, request),
            Self::CrossEntropy(trainer) => trainer.train(factory, request),
        }
    }
}

/// Shape of the problem a trainer optimizes over, probed from one environment.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProblemShape {
    pub observation_dim: usize,
    pub action_bounds: (f64, f64),
}

impl ProblemShape {
    pub(crate) fn probe<E>(env: &E) -> Result<Self, TrainingError>
    where
        E: Environment,
    {
        let observation_dim = env.observation_dim();
        if observation_dim == 0 {
            return Err(TrainingError::EmptyObservation);
        }
        let (low, high) = env.action_bounds();
        if !(low.is_finite() && high.is_finite() && low <= high) {
            return Err(TrainingError::InvalidActionBounds { low, high });
        }
        Ok(Self {
            observation_dim,
            action_bounds: (low, high),
        })
    }

    pub(crate) fn parameter_count(self) -> usize {
        LinearPolicy::parameter_count(self.observation_dim)
    }

    pub(crate) fn policy(self, params: Vec<f64>) -> LinearPolicy {
        LinearPolicy::new(params, self.action_bounds)
    }
}

/// One training episode.
#[derive(Debug, Clone, Default)]
pub(crate) struct Rollout {
    pub total_reward: f64,
    pub observations: Vec<Observation>,
    pub rewards: Vec<f64>,
}

impl Rollout {
    pub(crate) fn steps(&self) -> usize {
        self.rewards.len()
    }
}

pub(crate) fn rollout<E, P>(env: &mut E, policy: &P) -> Rollout
where
    E: Environment,
    P: Policy + ?Sized,
{
    let (mut observation, _info) = env.reset();
    let mut rollout = Rollout::default();
    while rollout.steps() < MAX_EPISODE_STEPS {
        let action = policy.predict(&observation);
        let step = env.step(action);
        rollout.total_reward += step.reward;
        rollout.rewards.push(step.reward);
        rollout
            .observations
            .push(std::mem::replace(&mut observation, step.observation));
        if step.terminated || step.truncated {
            break;
        }
    }
    rollout
}
