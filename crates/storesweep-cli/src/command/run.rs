use std::path::PathBuf;

use anyhow::Context as _;
use storesweep_sweep::{archive::read_archive, sweep::SweepRunner};
use storesweep_training::algorithm::{Algorithm, AlgorithmTrainer};
use tracing::info;

use super::inspect::ArchiveSummary;
use crate::config::AppConfig;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RunArg {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Algorithm to sweep, repeatable (default: Genetic, then CrossEntropy)
    #[arg(long = "algorithm")]
    pub(super) algorithms: Vec<Algorithm>,
    /// Directory holding trained policies and archives
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Retrain every point even if a cached policy exists
    #[arg(long)]
    pub(super) force_retrain: bool,
    /// Number of grid points processed concurrently
    #[arg(long)]
    pub(super) jobs: Option<usize>,
    /// Environment steps per training run
    #[arg(long)]
    budget: Option<usize>,
}

impl RunArg {
    fn apply(&self, config: &mut AppConfig) {
        let sweep = &mut config.sweep;
        if let Some(cache_dir) = &self.cache_dir {
            sweep.cache_dir.clone_from(cache_dir);
        }
        if self.force_retrain {
            sweep.force_retrain = true;
        }
        if let Some(jobs) = self.jobs {
            sweep.jobs = jobs;
        }
        if let Some(budget) = self.budget {
            sweep.training_budget = budget;
        }
    }

    fn algorithms(&self) -> Vec<Algorithm> {
        if self.algorithms.is_empty() {
            Algorithm::ALL.to_vec()
        } else {
            self.algorithms.clone()
        }
    }
}

pub(crate) fn run(arg: &RunArg) -> anyhow::Result<()> {
    let mut config = AppConfig::load(arg.config.as_deref())?;
    arg.apply(&mut config);

    let mut last_archive = None;
    for algorithm in arg.algorithms() {
        let trainer = AlgorithmTrainer::new(algorithm);
        let path = SweepRunner::new(&config.sweep, &config.environment, &trainer)
            .run_and_archive()
            .with_context(|| format!("Failed to sweep reward weights with {algorithm}"))?;
        info!(%algorithm, path = %path.display(), "archived sweep results");
        last_archive = Some(path);
    }

    let Some(path) = last_archive else {
        return Ok(());
    };
    let results = read_archive(&path)
        .with_context(|| format!("Failed to read back result archive: {}", path.display()))?;
    let summary = ArchiveSummary::new(&results);
    match summary.best() {
        Some(best) => info!(
            algorithm = %summary.algorithm,
            points = summary.points.len(),
            best_weights = %best.weights,
            best_total_reward = best.episode.total_reward,
            "loaded archive"
        ),
        None => info!(algorithm = %summary.algorithm, "loaded empty archive"),
    }
    Ok(())
}
