//! Trainer fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use storesweep_env::{Environment as _, EnvironmentFactory, GasStorageConfig};
use storesweep_training::{
    algorithm::{Algorithm, TrainedPolicy, Trainer, TrainingError, TrainingRequest},
    policy::LinearPolicy,
};

pub(crate) fn small_factory() -> GasStorageConfig {
    GasStorageConfig {
        horizon: 6,
        ..GasStorageConfig::default()
    }
}

/// Returns a policy derived from the request and counts invocations.
#[derive(Debug)]
pub(crate) struct CountingTrainer {
    algorithm: Algorithm,
    calls: AtomicUsize,
}

impl CountingTrainer {
    pub(crate) fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Trainer for CountingTrainer {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[expect(clippy::cast_precision_loss)]
    fn train<F>(&self, factory: &F, request: &TrainingRequest) -> Result<TrainedPolicy, TrainingError>
    where
        F: EnvironmentFactory,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let env = factory.build(request.weights);
        let [a, b, c] = request.weights.as_array();
        let bias = (request.seed % 1000) as f64 / 1000.0;
        let policy = LinearPolicy::new(vec![a - c, b - c, c - a, bias], env.action_bounds())
            .with_value_function(vec![a, b, c, 0.0]);
        Ok(TrainedPolicy {
            policy,
            steps_used: request.budget_steps,
            final_return: a - b,
        })
    }
}

/// Succeeds with a well-formed policy whose recorded return is NaN.
#[derive(Debug)]
pub(crate) struct NonFiniteTrainer;

impl Trainer for NonFiniteTrainer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::CrossEntropy
    }

    fn train<F>(&self, factory: &F, request: &TrainingRequest) -> Result<TrainedPolicy, TrainingError>
    where
        F: EnvironmentFactory,
    {
        let env = factory.build(request.weights);
        Ok(TrainedPolicy {
            policy: LinearPolicy::new(vec![0.0; 4], env.action_bounds()),
            steps_used: request.budget_steps,
            final_return: f64::NAN,
        })
    }
}

#[derive(Debug)]
pub(crate) struct FailingTrainer;

impl Trainer for FailingTrainer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Genetic
    }

    fn train<F>(&self, _factory: &F, _request: &TrainingRequest) -> Result<TrainedPolicy, TrainingError>
    where
        F: EnvironmentFactory,
    {
        Err(TrainingError::NonFiniteParameters)
    }
}
