//! Cross-entropy method over linear policy parameters.
//!
//! A diagonal Gaussian over parameter vectors is refined iteratively: sample
//! candidates, run one episode each, and refit mean and standard deviation to
//! the elite fraction. After the budget is spent, a linear value function is
//! fitted to the discounted returns of the final policy so that evaluation
//! can report value estimates.

use rand::{Rng as _, SeedableRng as _};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64Mcg;
use storesweep_env::EnvironmentFactory;
use tracing::debug;

use crate::{
    algorithm::{
        Algorithm, ProblemShape, TrainedPolicy, Trainer, TrainingError, TrainingRequest, rollout,
    },
    value,
};

const SAMPLE_COUNT: usize = 12;
const ELITE_FRACTION: f64 = 0.25;
const INITIAL_STD: f64 = 1.0;
const MIN_STD: f64 = 0.05;
const DISCOUNT: f64 = 0.99;
const VALUE_RIDGE: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct CrossEntropyTrainer {
    pub sample_count: usize,
    pub elite_fraction: f64,
    pub initial_std: f64,
    /// Floor on the per-parameter standard deviation.
    pub min_std: f64,
    /// Discount used for the value-function targets.
    pub discount: f64,
    pub value_ridge: f64,
}

impl Default for CrossEntropyTrainer {
    fn default() -> Self {
        Self {
            sample_count: SAMPLE_COUNT,
            elite_fraction: ELITE_FRACTION,
            initial_std: INITIAL_STD,
            min_std: MIN_STD,
            discount: DISCOUNT,
            value_ridge: VALUE_RIDGE,
        }
    }
}

impl CrossEntropyTrainer {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn elite_count(&self, sample_count: usize) -> usize {
        ((sample_count as f64 * self.elite_fraction).ceil() as usize).clamp(1, sample_count)
    }
}

impl Trainer for CrossEntropyTrainer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::CrossEntropy
    }

    #[expect(clippy::cast_precision_loss)]
    fn train<F>(&self, factory: &F, request: &TrainingRequest) -> Result<TrainedPolicy, TrainingError>
    where
        F: EnvironmentFactory,
    {
        if request.budget_steps == 0 {
            return Err(TrainingError::EmptyBudget);
        }
        let mut env = factory.build(request.weights);
        let shape = ProblemShape::probe(&env)?;
        let mut rng = Pcg64Mcg::seed_from_u64(request.seed);

        let dim = shape.parameter_count();
        let sample_count = self.sample_count.max(1);
        let elite_count = self.elite_count(sample_count);
        let mut mean = vec![0.0; dim];
        let mut std = vec![self.initial_std; dim];
        let mut steps_used = 0;
        let mut iteration = 0;

        while steps_used < request.budget_steps {
            let mut candidates = (0..sample_count)
                .map(|_| {
                    let params = mean
                        .iter()
                        .zip(&std)
                        .map(|(m, s)| m + s * rng.sample::<f64, _>(StandardNormal))
                        .collect::<Vec<_>>();
                    let episode = rollout(&mut env, &shape.policy(params.clone()));
                    steps_used += episode.steps();
                    (params, episode.total_reward)
                })
                .collect::<Vec<_>>();
            if candidates.iter().any(|(_, ret)| !ret.is_finite()) {
                return Err(TrainingError::NonFiniteReturn);
            }
            candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
            let elites = &candidates[..elite_count];

            let n = elite_count as f64;
            for (i, (mean_i, std_i)) in mean.iter_mut().zip(&mut std).enumerate() {
                let m = elites.iter().map(|(p, _)| p[i]).sum::<f64>() / n;
                let var = elites.iter().map(|(p, _)| (p[i] - m).powi(2)).sum::<f64>() / n;
                *mean_i = m;
                *std_i = var.sqrt().max(self.min_std);
            }
            debug!(
                iteration,
                steps_used,
                best = candidates[0].1,
                "refitted sampling distribution"
            );
            iteration += 1;
        }

        let policy = shape.policy(mean);
        let episode = rollout(&mut env, &policy);
        steps_used += episode.steps();
        if !episode.total_reward.is_finite() {
            return Err(TrainingError::NonFiniteReturn);
        }
        let returns = value::discounted_returns(&episode.rewards, self.discount);
        let policy = match value::fit_linear_value(&episode.observations, &returns, self.value_ridge) {
            Some(value_weights) => policy.with_value_function(value_weights),
            None => policy,
        };
        if !policy.is_finite() {
            return Err(TrainingError::NonFiniteParameters);
        }
        Ok(TrainedPolicy {
            policy,
            steps_used,
            final_return: episode.total_reward,
        })
    }
}
