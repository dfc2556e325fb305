//! Policies and the training algorithms that produce them.
//!
//! This crate is the training collaborator of the sweep: given an environment
//! factory, a reward weighting and a step budget, a [`Trainer`](algorithm::Trainer)
//! returns a trained [`LinearPolicy`](policy::LinearPolicy).
//!
//! # Algorithms
//!
//! - [`genetic`] - generational GA with elitism, tournament selection, BLX-α
//!   crossover and Gaussian mutation; fitness is evaluated in parallel
//! - [`cross_entropy`] - cross-entropy method over a diagonal Gaussian; the
//!   result carries a linear value function fitted to Monte Carlo returns
//!
//! Both are selected through [`Algorithm`](algorithm::Algorithm), whose name
//! is part of every cache key, and dispatched with
//! [`AlgorithmTrainer`](algorithm::AlgorithmTrainer).
//!
//! # Determinism
//!
//! Trainers draw all randomness from a PCG generator seeded with
//! [`TrainingRequest::seed`](algorithm::TrainingRequest::seed). With a
//! deterministic environment, the same request always yields the same policy.
//!
//! # Example
//!
//! ```
//! use storesweep_env::{GasStorageConfig, RewardWeights};
//! use storesweep_training::algorithm::{Algorithm, AlgorithmTrainer, Trainer, TrainingRequest};
//!
//! let factory = GasStorageConfig { horizon: 4, render: false, ..GasStorageConfig::default() };
//! let trainer = AlgorithmTrainer::new(Algorithm::CrossEntropy);
//! let request = TrainingRequest {
//!     weights: RewardWeights::equal(),
//!     budget_steps: 100,
//!     seed: 0,
//! };
//! let trained = trainer.train(&factory, &request).unwrap();
//! assert!(trained.steps_used >= 100);
//! ```

pub mod algorithm;
pub mod cross_entropy;
pub mod genetic;
pub mod policy;
pub mod value;
pub mod weights;
