//! Single-episode evaluation of a trained policy.

use serde::{Deserialize, Serialize};
use storesweep_env::{Environment, Frame, OutputDict};
use storesweep_training::{algorithm::MAX_EPISODE_STEPS, policy::Policy};

/// Everything recorded while a policy runs one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Reward received at each step.
    pub rewards: Vec<f64>,
    /// Rendered frame after each step; empty when the environment does not render.
    pub frames: Vec<Frame>,
    /// Value estimate of each observation the policy acted on; empty when the
    /// policy has no value function.
    pub value_estimates: Vec<f64>,
    /// Per-step diagnostic series exported by the environment.
    pub diagnostics: OutputDict,
}

impl EvaluationResult {
    #[must_use]
    pub fn steps(&self) -> usize {
        self.rewards.len()
    }

    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    /// Name of the first series holding a NaN or infinite value.
    #[must_use]
    pub fn non_finite_series(&self) -> Option<&str> {
        let non_finite = |series: &[f64]| series.iter().any(|v| !v.is_finite());
        if non_finite(&self.rewards) {
            return Some("rewards");
        }
        if non_finite(&self.value_estimates) {
            return Some("value_estimates");
        }
        self.diagnostics
            .iter()
            .find(|(_, series)| non_finite(series))
            .map(|(name, _)| name.as_str())
    }
}

/// Resets `env` and runs `policy` until the episode terminates or is truncated.
///
/// Episodes longer than [`MAX_EPISODE_STEPS`] are cut off.
pub fn evaluate<E, P>(env: &mut E, policy: &P) -> EvaluationResult
where
    E: Environment,
    P: Policy + ?Sized,
{
    let (mut observation, _info) = env.reset();
    let mut rewards = vec![];
    let mut frames = vec![];
    let mut value_estimates = vec![];

    while rewards.len() < MAX_EPISODE_STEPS {
        if let Some(value) = policy.value_estimate(&observation) {
            value_estimates.push(value);
        }
        let action = policy.predict(&observation);
        let step = env.step(action);
        rewards.push(step.reward);
        if let Some(frame) = env.render() {
            frames.push(frame);
        }
        if step.is_done() {
            break;
        }
        observation = step.observation;
    }

    EvaluationResult {
        rewards,
        frames,
        value_estimates,
        diagnostics: env.output_dict(),
    }
}

#[cfg(test)]
mod tests {
    use storesweep_env::{
        EnvironmentFactory as _, GasStorageConfig, Observation, RewardWeights, Step, StepInfo,
    };
    use storesweep_training::policy::{FixedDummyPolicy, LinearPolicy};

    use super::*;

    fn config(render: bool) -> GasStorageConfig {
        GasStorageConfig {
            horizon: 12,
            render,
            ..GasStorageConfig::default()
        }
    }

    #[test]
    fn test_one_entry_per_step() {
        let mut env = config(true).build(RewardWeights::equal());
        let policy = FixedDummyPolicy::new(vec![50.0, -50.0]);
        let result = evaluate(&mut env, &policy);
        assert_eq!(result.steps(), 12);
        assert_eq!(result.frames.len(), 12);
        assert!(result.value_estimates.is_empty());
        for series in result.diagnostics.values() {
            assert_eq!(series.len(), 12);
        }
        assert!(result.total_reward().is_finite());
    }

    #[test]
    fn test_no_frames_without_rendering() {
        let mut env = config(false).build(RewardWeights::equal());
        let policy = FixedDummyPolicy::new(vec![0.0]);
        let result = evaluate(&mut env, &policy);
        assert_eq!(result.steps(), 12);
        assert!(result.frames.is_empty());
    }

    #[test]
    fn test_value_estimates_follow_value_function() {
        let mut env = config(false).build(RewardWeights::equal());
        let policy = LinearPolicy::new(vec![0.0; 4], env.action_bounds())
            .with_value_function(vec![0.0, 0.0, 0.0, 1.5]);
        let result = evaluate(&mut env, &policy);
        assert_eq!(result.value_estimates, vec![1.5; 12]);
    }

    #[test]
    fn test_non_finite_series() {
        let mut env = config(false).build(RewardWeights::equal());
        let mut result = evaluate(&mut env, &FixedDummyPolicy::new(vec![10.0]));
        assert_eq!(result.non_finite_series(), None);

        result
            .diagnostics
            .get_mut("price_per_kg")
            .unwrap()
            .push(f64::INFINITY);
        assert_eq!(result.non_finite_series(), Some("price_per_kg"));
        result.rewards[0] = f64::NAN;
        assert_eq!(result.non_finite_series(), Some("rewards"));
    }

    #[test]
    fn test_episode_is_capped() {
        struct Endless;

        impl Environment for Endless {
            fn observation_dim(&self) -> usize {
                1
            }
            fn action_bounds(&self) -> (f64, f64) {
                (-1.0, 1.0)
            }
            fn reward_weights(&self) -> RewardWeights {
                RewardWeights::equal()
            }
            fn reset(&mut self) -> (Observation, StepInfo) {
                (Observation::new(vec![0.0]), StepInfo::new())
            }
            fn step(&mut self, _action: f64) -> Step {
                Step {
                    observation: Observation::new(vec![0.0]),
                    reward: 1.0,
                    terminated: false,
                    truncated: false,
                    info: StepInfo::new(),
                }
            }
            fn render(&self) -> Option<Frame> {
                None
            }
            fn output_dict(&self) -> OutputDict {
                OutputDict::new()
            }
        }

        let result = evaluate(&mut Endless, &FixedDummyPolicy::new(vec![0.0]));
        assert_eq!(result.steps(), MAX_EPISODE_STEPS);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let factory = config(true);
        let weights = RewardWeights::normalize([1.0, 10.0, 100.0]).unwrap();
        let policy = LinearPolicy::new(vec![0.5, -1.0, 0.2, 0.1], (-100.0, 100.0));
        let a = evaluate(&mut factory.build(weights), &policy);
        let b = evaluate(&mut factory.build(weights), &policy);
        assert_eq!(a, b);
    }
}
