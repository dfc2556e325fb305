//! Single-cavern gas storage under a time-varying price.
//!
//! The controller chooses a mass flow into (positive) or out of (negative) the
//! storage each step. Three reward components are reported and combined with
//! the instance's [`RewardWeights`]:
//!
//! 1. **economic**: revenue from withdrawing minus cost of injecting gas at the
//!    current price,
//! 2. **fill**: negative squared distance between fill level and the target
//!    fill level,
//! 3. **effort**: negative squared flow relative to the maximum flow.
//!
//! Prices follow a daily sine profile with seeded noise, so two environments
//! built from the same [`GasStorageConfig`] replay identical episodes.

use std::f64::consts::TAU;

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::{
    Environment, EnvironmentFactory, Frame, Observation, OutputDict, REWARD_DIM, RewardWeights,
    Step, StepInfo,
};

const FRAME_HEIGHT: u16 = 16;
const MAX_FRAME_WIDTH: usize = 64;
const FILL_PIXEL: u8 = 255;
const PRICE_PIXEL: u8 = 128;

/// Static parameters of a [`GasStorageEnv`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasStorageConfig {
    pub capacity_kg: f64,
    /// Fill level (fraction of capacity) at the start of an episode.
    pub initial_fill: f64,
    /// Fill level (fraction of capacity) the fill reward pulls towards.
    pub target_fill: f64,
    pub step_seconds: f64,
    /// Number of steps after which an episode is truncated.
    pub horizon: usize,
    pub base_price_per_kg: f64,
    /// Relative amplitude of the periodic price component.
    pub price_amplitude: f64,
    /// Relative amplitude of the uniform price noise.
    pub price_noise: f64,
    pub price_period_steps: f64,
    pub seed: u64,
    /// Scale the economic reward into roughly `[-1, 1]`.
    pub normalize_rewards: bool,
    pub render: bool,
}

impl Default for GasStorageConfig {
    fn default() -> Self {
        Self {
            capacity_kg: 5.0e6,
            initial_fill: 0.5,
            target_fill: 0.8,
            step_seconds: 3600.0,
            horizon: 48,
            base_price_per_kg: 0.5,
            price_amplitude: 0.2,
            price_noise: 0.05,
            price_period_steps: 24.0,
            seed: 0,
            normalize_rewards: true,
            render: true,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InvalidGasStorageConfig {
    #[display("{field} must be finite and strictly positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[display("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[display("{field} must be a fraction in [0, 1], got {value}")]
    FractionOutOfRange { field: &'static str, value: f64 },
}

impl GasStorageConfig {
    /// Checks that every episode built from this config yields finite rewards.
    pub fn validate(&self) -> Result<(), InvalidGasStorageConfig> {
        for (field, value) in [
            ("capacity_kg", self.capacity_kg),
            ("step_seconds", self.step_seconds),
            ("base_price_per_kg", self.base_price_per_kg),
            ("price_period_steps", self.price_period_steps),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(InvalidGasStorageConfig::NotPositive { field, value });
            }
        }
        for (field, value) in [
            ("price_amplitude", self.price_amplitude),
            ("price_noise", self.price_noise),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(InvalidGasStorageConfig::Negative { field, value });
            }
        }
        for (field, value) in [
            ("initial_fill", self.initial_fill),
            ("target_fill", self.target_fill),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(InvalidGasStorageConfig::FractionOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

impl EnvironmentFactory for GasStorageConfig {
    type Env = GasStorageEnv;

    fn build(&self, weights: RewardWeights) -> Self::Env {
        GasStorageEnv::new(self.clone(), weights)
    }
}

#[derive(Debug, Clone, Default)]
struct EpisodeHistory {
    fill: Vec<f64>,
    price: Vec<f64>,
    mdot: Vec<f64>,
    reward: Vec<f64>,
    components: [Vec<f64>; REWARD_DIM],
}

impl EpisodeHistory {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone)]
pub struct GasStorageEnv {
    config: GasStorageConfig,
    weights: RewardWeights,
    prices: Vec<f64>,
    time_step: usize,
    level_kg: f64,
    history: EpisodeHistory,
}

impl GasStorageEnv {
    /// Maximum injection rate.
    pub const MAX_STORAGE_MDOT_KG_PER_S: f64 = 100.0;
    /// Maximum withdrawal rate (negative flow).
    pub const MIN_STORAGE_MDOT_KG_PER_S: f64 = -100.0;

    pub const OBSERVATION_DIM: usize = 3;

    #[must_use]
    pub fn new(config: GasStorageConfig, weights: RewardWeights) -> Self {
        let prices = price_series(&config);
        let level_kg = initial_level(&config);
        Self {
            config,
            weights,
            prices,
            time_step: 0,
            level_kg,
            history: EpisodeHistory::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &GasStorageConfig {
        &self.config
    }

    #[must_use]
    pub fn fill_level(&self) -> f64 {
        self.level_kg / self.config.capacity_kg
    }

    fn horizon(&self) -> usize {
        self.config.horizon.max(1)
    }

    fn price_at(&self, time_step: usize) -> f64 {
        self.prices[time_step.min(self.prices.len() - 1)]
    }

    #[expect(clippy::cast_precision_loss)]
    fn observation(&self) -> Observation {
        let price = self.price_at(self.time_step);
        Observation::new(vec![
            self.fill_level(),
            price / self.config.base_price_per_kg - 1.0,
            self.time_step as f64 / self.horizon() as f64,
        ])
    }

    fn reward_components(&self, price: f64, mass_kg: f64, mdot: f64) -> [f64; REWARD_DIM] {
        let mut economic = -price * mass_kg;
        if self.config.normalize_rewards {
            economic /= self.config.base_price_per_kg
                * Self::MAX_STORAGE_MDOT_KG_PER_S
                * self.config.step_seconds;
        }
        let fill_error = self.fill_level() - self.config.target_fill;
        let effort = mdot / Self::MAX_STORAGE_MDOT_KG_PER_S;
        [economic, -fill_error * fill_error, -effort * effort]
    }
}

impl Environment for GasStorageEnv {
    fn observation_dim(&self) -> usize {
        Self::OBSERVATION_DIM
    }

    fn action_bounds(&self) -> (f64, f64) {
        (
            Self::MIN_STORAGE_MDOT_KG_PER_S,
            Self::MAX_STORAGE_MDOT_KG_PER_S,
        )
    }

    fn reward_weights(&self) -> RewardWeights {
        self.weights
    }

    fn reset(&mut self) -> (Observation, StepInfo) {
        self.time_step = 0;
        self.level_kg = initial_level(&self.config);
        self.history.clear();
        let info = StepInfo::from([
            ("fill_level".to_owned(), self.fill_level()),
            ("price_per_kg".to_owned(), self.price_at(0)),
        ]);
        (self.observation(), info)
    }

    fn step(&mut self, action: f64) -> Step {
        let requested = if action.is_finite() {
            action.clamp(
                Self::MIN_STORAGE_MDOT_KG_PER_S,
                Self::MAX_STORAGE_MDOT_KG_PER_S,
            )
        } else {
            0.0
        };
        let dt = self.config.step_seconds;
        let price = self.price_at(self.time_step);

        let old_level = self.level_kg;
        self.level_kg = (old_level + requested * dt).clamp(0.0, self.config.capacity_kg);
        let mass_kg = self.level_kg - old_level;
        let mdot = mass_kg / dt;

        let components = self.reward_components(price, mass_kg, mdot);
        let reward = self.weights.combine(&components);

        self.history.fill.push(self.fill_level());
        self.history.price.push(price);
        self.history.mdot.push(mdot);
        self.history.reward.push(reward);
        for (series, value) in self.history.components.iter_mut().zip(components) {
            series.push(value);
        }

        self.time_step += 1;
        let info = StepInfo::from([
            ("fill_level".to_owned(), self.fill_level()),
            ("price_per_kg".to_owned(), price),
            ("mdot_kg_per_s".to_owned(), mdot),
            ("reward_economic".to_owned(), components[0]),
            ("reward_fill".to_owned(), components[1]),
            ("reward_effort".to_owned(), components[2]),
        ]);
        Step {
            observation: self.observation(),
            reward,
            terminated: false,
            truncated: self.time_step >= self.horizon(),
            info,
        }
    }

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn render(&self) -> Option<Frame> {
        if !self.config.render {
            return None;
        }
        let width = self.horizon().min(MAX_FRAME_WIDTH);
        let mut frame = Frame::blank(width as u16, FRAME_HEIGHT);
        let height = f64::from(FRAME_HEIGHT);

        let start = self.history.fill.len().saturating_sub(width);
        let fills = &self.history.fill[start..];
        let prices = &self.history.price[start..];
        let max_price = self.config.base_price_per_kg
            * (1.0 + self.config.price_amplitude + self.config.price_noise);

        for (x, (fill, price)) in fills.iter().zip(prices).enumerate() {
            let x = x as u16;
            let filled = (fill.clamp(0.0, 1.0) * height).round() as u16;
            for y in (FRAME_HEIGHT - filled)..FRAME_HEIGHT {
                frame.set(x, y, FILL_PIXEL);
            }
            let price_row = ((1.0 - price / max_price).clamp(0.0, 1.0) * (height - 1.0)) as u16;
            frame.set(x, price_row, PRICE_PIXEL);
        }
        Some(frame)
    }

    fn output_dict(&self) -> OutputDict {
        let [economic, fill, effort] = self.history.components.clone();
        OutputDict::from([
            ("fill_level".to_owned(), self.history.fill.clone()),
            ("price_per_kg".to_owned(), self.history.price.clone()),
            ("mdot_kg_per_s".to_owned(), self.history.mdot.clone()),
            ("reward".to_owned(), self.history.reward.clone()),
            ("reward_economic".to_owned(), economic),
            ("reward_fill".to_owned(), fill),
            ("reward_effort".to_owned(), effort),
        ])
    }
}

fn initial_level(config: &GasStorageConfig) -> f64 {
    config.initial_fill.clamp(0.0, 1.0) * config.capacity_kg
}

#[expect(clippy::cast_precision_loss)]
fn price_series(config: &GasStorageConfig) -> Vec<f64> {
    let mut rng = Pcg64Mcg::seed_from_u64(config.seed);
    (0..config.horizon.max(1))
        .map(|t| {
            let phase = TAU * t as f64 / config.price_period_steps;
            let noise = rng.random_range(-1.0..=1.0);
            config.base_price_per_kg
                * (1.0 + config.price_amplitude * phase.sin() + config.price_noise * noise)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> GasStorageConfig {
        GasStorageConfig {
            horizon: 6,
            ..GasStorageConfig::default()
        }
    }

    #[test]
    fn test_truncates_at_horizon() {
        let mut env = GasStorageEnv::new(small_config(), RewardWeights::equal());
        env.reset();
        let mut steps = 0;
        loop {
            let step = env.step(0.0);
            steps += 1;
            if step.is_done() {
                assert!(step.truncated);
                assert!(!step.terminated);
                break;
            }
        }
        assert_eq!(steps, 6);
    }

    #[test]
    fn test_default_config_is_valid() {
        GasStorageConfig::default().validate().unwrap();
        small_config().validate().unwrap();
    }

    #[test]
    fn test_degenerate_config_is_rejected() {
        let invalid = [
            GasStorageConfig {
                step_seconds: 0.0,
                ..small_config()
            },
            GasStorageConfig {
                capacity_kg: 0.0,
                ..small_config()
            },
            GasStorageConfig {
                price_period_steps: 0.0,
                ..small_config()
            },
            GasStorageConfig {
                base_price_per_kg: f64::NAN,
                ..small_config()
            },
        ];
        for config in invalid {
            assert!(matches!(
                config.validate(),
                Err(InvalidGasStorageConfig::NotPositive { .. })
            ));
        }
        assert!(matches!(
            GasStorageConfig {
                price_noise: -0.1,
                ..small_config()
            }
            .validate(),
            Err(InvalidGasStorageConfig::Negative { field: "price_noise", .. })
        ));
        assert!(matches!(
            GasStorageConfig {
                target_fill: 1.5,
                ..small_config()
            }
            .validate(),
            Err(InvalidGasStorageConfig::FractionOutOfRange { field: "target_fill", .. })
        ));
    }

    #[test]
    fn test_zero_step_length_yields_non_finite_rewards() {
        let config = GasStorageConfig {
            step_seconds: 0.0,
            ..small_config()
        };
        let mut env = GasStorageEnv::new(config, RewardWeights::equal());
        env.reset();
        assert!(!env.step(0.0).reward.is_finite());
    }

    #[test]
    fn test_action_is_clamped_to_flow_limits() {
        let mut env = GasStorageEnv::new(small_config(), RewardWeights::equal());
        env.reset();
        let step = env.step(1.0e9);
        assert_eq!(
            step.info["mdot_kg_per_s"],
            GasStorageEnv::MAX_STORAGE_MDOT_KG_PER_S
        );
        let step = env.step(f64::NAN);
        assert_eq!(step.info["mdot_kg_per_s"], 0.0);
    }

    #[test]
    fn test_fill_level_stays_within_capacity() {
        let config = GasStorageConfig {
            capacity_kg: 1.0e5,
            ..small_config()
        };
        let mut env = GasStorageEnv::new(config, RewardWeights::equal());
        env.reset();
        for _ in 0..3 {
            env.step(GasStorageEnv::MAX_STORAGE_MDOT_KG_PER_S);
        }
        assert!((env.fill_level() - 1.0).abs() < 1e-12);
        for _ in 0..3 {
            env.step(GasStorageEnv::MIN_STORAGE_MDOT_KG_PER_S);
        }
        assert!(env.fill_level().abs() < 1e-12);
    }

    #[test]
    fn test_reward_uses_weights() {
        let only_effort = RewardWeights::normalize([0.0, 0.0, 1.0]).unwrap();
        let mut env = GasStorageEnv::new(small_config(), only_effort);
        env.reset();
        let step = env.step(GasStorageEnv::MAX_STORAGE_MDOT_KG_PER_S / 2.0);
        assert!((step.reward - (-0.25)).abs() < 1e-12);

        let step = env.step(0.0);
        assert_eq!(step.reward, 0.0);
    }

    #[test]
    fn test_episodes_are_reproducible() {
        let run = || {
            let mut env = small_config().build(RewardWeights::equal());
            env.reset();
            (0..6).map(|i| env.step(f64::from(i) * 10.0).reward).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut env = GasStorageEnv::new(small_config(), RewardWeights::equal());
        env.reset();
        env.step(10.0);
        env.step(10.0);
        assert_eq!(env.output_dict()["fill_level"].len(), 2);

        let (observation, _) = env.reset();
        assert!(env.output_dict()["fill_level"].is_empty());
        assert_eq!(observation.len(), GasStorageEnv::OBSERVATION_DIM);
        assert_eq!(observation.as_slice()[0], 0.5);
    }

    #[test]
    fn test_render() {
        let mut env = GasStorageEnv::new(small_config(), RewardWeights::equal());
        env.reset();
        env.step(0.0);
        let frame = env.render().unwrap();
        assert_eq!(frame.width(), 6);
        assert_eq!(frame.height(), FRAME_HEIGHT);
        // half full: the bottom row of the first column is filled
        assert_eq!(frame.get(0, FRAME_HEIGHT - 1), Some(FILL_PIXEL));

        let config = GasStorageConfig {
            render: false,
            ..small_config()
        };
        let env = GasStorageEnv::new(config, RewardWeights::equal());
        assert!(env.render().is_none());
    }
}
