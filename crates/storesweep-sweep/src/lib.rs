//! Reward-weight sweeps with cached training.
//!
//! For one training algorithm, a sweep enumerates every raw weight triple of
//! a [`StepSet`](grid::StepSet), trains (or loads) a policy for each, evaluates
//! it on a freshly built environment and collects the results into a single
//! gzip-compressed archive.
//!
//! # Pipeline
//!
//! 1. [`grid`] - lazily enumerates `S × S × S` with normalized weights
//! 2. [`cache_key`] - derives the artifact name of each point
//! 3. [`memo`] - returns the cached [`PolicyArtifact`](artifact::PolicyArtifact)
//!    or trains and persists one
//! 4. [`evaluate`] - runs one episode and records rewards, frames, value
//!    estimates and environment diagnostics
//! 5. [`aggregate`] - keys results by rounded raw weights
//! 6. [`archive`] - writes and reads `<algorithm>_prepared_plot_data.json.gz`
//!
//! [`SweepRunner`](sweep::SweepRunner) drives the pipeline, sequentially or on
//! a pool of worker threads.
//!
//! # Cache Layout
//!
//! ```text
//! <cache_dir>/
//!   Genetic_v1_1_1_1.json                   one artifact per algorithm and point
//!   Genetic_v1_1_1_10.json
//!   ...
//!   Genetic_prepared_plot_data.json.gz      one archive per algorithm
//!   CrossEntropy_prepared_plot_data.json.gz
//! ```
//!
//! Artifacts and archives are written atomically, so an interrupted sweep
//! never leaves a partial file; rerunning it resumes from the cached points.

pub mod aggregate;
pub mod archive;
mod atomic;
pub mod artifact;
pub mod cache_key;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod grid;
pub mod memo;
pub mod sweep;
#[cfg(test)]
mod testing;
