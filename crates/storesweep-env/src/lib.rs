//! Simulation environments driven by the reward-weight sweep.
//!
//! This crate defines the narrow interface the sweep needs from a simulated
//! control problem and ships one implementation:
//!
//! - [`Environment`] - reset/step/render/diagnostics of one episode
//! - [`EnvironmentFactory`] - builds a fresh environment for a reward weighting
//! - [`RewardWeights`] - normalized weighting of the three reward components
//! - [`Frame`] - grayscale rendering of one step
//! - [`GasStorageEnv`] - gas storage operated against a fluctuating price
//!
//! # Reward Weighting
//!
//! Every environment reports three reward components per step and combines
//! them with its [`RewardWeights`]. The weighting is fixed when the
//! environment is built; callers that need a different weighting build a new
//! instance from the factory instead of mutating a shared one. This keeps
//! environments independent, so training and evaluation of different
//! weightings can run on separate threads.
//!
//! # Example
//!
//! ```
//! use storesweep_env::{Environment, EnvironmentFactory, GasStorageConfig, RewardWeights};
//!
//! let weights = RewardWeights::normalize([1.0, 10.0, 1.0]).unwrap();
//! let mut env = GasStorageConfig::default().build(weights);
//!
//! let (_observation, _info) = env.reset();
//! let mut total = 0.0;
//! loop {
//!     let step = env.step(0.0);
//!     total += step.reward;
//!     if step.is_done() {
//!         break;
//!     }
//! }
//! assert!(total.is_finite());
//! ```

pub use self::{environment::*, frame::*, gas_storage::*, weights::*};

mod environment;
mod frame;
mod gas_storage;
mod weights;
