//! Orchestration of one sweep: grid, train-or-load, evaluate, aggregate.
//!
//! Every grid point gets a fresh environment from the factory, built with the
//! point's normalized weights, so no weighting leaks from one point to the
//! next. With `jobs > 1`, grid points are pulled by a pool of scoped worker
//! threads and their results are sent over a channel to the calling thread,
//! which is the only owner of the aggregator.

use std::{
    path::PathBuf,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
};

use storesweep_env::EnvironmentFactory;
use storesweep_training::algorithm::Trainer;
use tracing::{info, info_span};

use crate::{
    aggregate::{AggregatedResults, ResultAggregator},
    archive::{archive_path, write_archive},
    cache_key::CacheKey,
    config::SweepConfig,
    error::SweepError,
    evaluate::{EvaluationResult, evaluate},
    grid::{GridPoint, WeightGrid, WeightKey},
    memo::MemoizedTrainer,
};

type PointOutcome = Result<(WeightKey, EvaluationResult), SweepError>;

/// Runs the sweep of one trainer over the weight grid.
#[derive(Debug)]
pub struct SweepRunner<'a, F, T> {
    config: &'a SweepConfig,
    factory: &'a F,
    trainer: &'a T,
}

impl<'a, F, T> SweepRunner<'a, F, T>
where
    F: EnvironmentFactory,
    T: Trainer,
{
    #[must_use]
    pub fn new(config: &'a SweepConfig, factory: &'a F, trainer: &'a T) -> Self {
        Self {
            config,
            factory,
            trainer,
        }
    }

    /// Processes every grid point and returns the aggregated results.
    ///
    /// The first failing point aborts the sweep. Artifacts already written by
    /// other points stay in the cache, so a rerun resumes from them.
    pub fn run(&self) -> Result<AggregatedResults, SweepError> {
        let step_set = self.config.step_set()?;
        let algorithm = self.trainer.algorithm();
        let _span = info_span!("sweep", %algorithm).entered();
        let memo = MemoizedTrainer::from_config(self.config);
        let grid = step_set.grid();
        info!(
            points = grid.len(),
            jobs = self.config.jobs,
            budget = self.config.training_budget,
            "starting sweep"
        );

        let mut aggregator = ResultAggregator::new(algorithm);
        if self.config.jobs == 1 {
            for point in grid {
                let (key, result) = self.process_point(&memo, point)?;
                aggregator.record(key, result);
            }
        } else {
            self.run_parallel(&memo, grid, &mut aggregator)?;
        }

        info!(points = aggregator.len(), "sweep finished");
        Ok(aggregator.export())
    }

    /// Runs the sweep and writes its archive under the cache directory.
    ///
    /// Returns the archive path.
    pub fn run_and_archive(&self) -> Result<PathBuf, SweepError> {
        let results = self.run()?;
        let path = archive_path(&self.config.cache_dir, results.algorithm);
        write_archive(&path, &results)?;
        Ok(path)
    }

    fn process_point(&self, memo: &MemoizedTrainer, point: GridPoint) -> PointOutcome {
        let key = CacheKey::derive(self.trainer.algorithm(), point.raw());
        let artifact = memo.train_or_load(
            self.factory,
            self.trainer,
            &key,
            &point,
            self.config.training_budget,
        )?;
        let mut env = self.factory.build(point.weights());
        let result = evaluate(&mut env, &artifact);
        info!(
            %key,
            steps = result.steps(),
            total_reward = result.total_reward(),
            "evaluated policy"
        );
        Ok((point.key(), result))
    }

    fn run_parallel(
        &self,
        memo: &MemoizedTrainer,
        grid: WeightGrid<'_>,
        aggregator: &mut ResultAggregator,
    ) -> Result<(), SweepError> {
        let grid = Mutex::new(grid);
        let failed = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<PointOutcome>();

        thread::scope(|s| {
            for _ in 0..self.config.jobs {
                let tx = tx.clone();
                let grid = &grid;
                let failed = &failed;
                s.spawn(move || {
                    while !failed.load(Ordering::Relaxed) {
                        let next = grid.lock().unwrap_or_else(PoisonError::into_inner).next();
                        let Some(point) = next else {
                            break;
                        };
                        let outcome = self.process_point(memo, point);
                        if outcome.is_err() {
                            failed.store(true, Ordering::Relaxed);
                        }
                        if tx.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut first_error = None;
            for outcome in rx {
                match outcome {
                    Ok((key, result)) => aggregator.record(key, result),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }
            first_error.map_or(Ok(()), Err)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use storesweep_env::GasStorageConfig;
    use storesweep_training::algorithm::{Algorithm, AlgorithmTrainer, TrainingError};

    use super::*;
    use crate::{
        archive::read_archive,
        error::ConfigurationError,
        testing::{CountingTrainer, small_factory},
    };

    fn config(cache_dir: &Path, steps: Vec<f64>, jobs: usize) -> SweepConfig {
        SweepConfig {
            steps,
            training_budget: 10,
            cache_dir: cache_dir.to_owned(),
            force_retrain: false,
            jobs,
            seed: 0,
        }
    }

    fn artifact_count(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter(|entry| {
                let name = entry.as_ref().unwrap().file_name();
                let name = name.to_string_lossy();
                name.ends_with(".json") && !name.ends_with(".json.gz")
            })
            .count()
    }

    #[test]
    fn test_two_step_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![1.0, 10.0], 1);
        let trainer = CountingTrainer::new(Algorithm::Genetic);
        let factory = small_factory();

        let results = SweepRunner::new(&config, &factory, &trainer).run().unwrap();
        assert_eq!(trainer.calls(), 8);
        assert_eq!(results.len(), 8);
        assert_eq!(artifact_count(dir.path()), 8);
        for (_, result) in results.iter() {
            assert_eq!(result.steps(), 6);
            assert_eq!(result.frames.len(), 6);
            assert_eq!(result.value_estimates.len(), 6);
        }
        assert!(results.get(&WeightKey([10, 1, 1])).is_some());
    }

    #[test]
    fn test_rerun_loads_everything_and_matches() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![1.0, 10.0], 1);
        let trainer = CountingTrainer::new(Algorithm::CrossEntropy);
        let factory = small_factory();
        let runner = SweepRunner::new(&config, &factory, &trainer);

        let first = runner.run().unwrap();
        assert_eq!(trainer.calls(), 8);
        let second = runner.run().unwrap();
        assert_eq!(trainer.calls(), 8);
        assert_eq!(first, second);
    }

    #[test]
    fn test_force_retrain_retrains_every_point() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), vec![1.0, 10.0], 1);
        let trainer = CountingTrainer::new(Algorithm::Genetic);
        let factory = small_factory();
        SweepRunner::new(&config, &factory, &trainer).run().unwrap();

        config.force_retrain = true;
        SweepRunner::new(&config, &factory, &trainer).run().unwrap();
        assert_eq!(trainer.calls(), 16);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let factory = small_factory();

        let seq_dir = tempfile::tempdir().unwrap();
        let seq_config = config(seq_dir.path(), vec![1.0, 10.0, 100.0], 1);
        let seq_trainer = CountingTrainer::new(Algorithm::Genetic);
        let sequential = SweepRunner::new(&seq_config, &factory, &seq_trainer)
            .run()
            .unwrap();

        let par_dir = tempfile::tempdir().unwrap();
        let par_config = config(par_dir.path(), vec![1.0, 10.0, 100.0], 4);
        let par_trainer = CountingTrainer::new(Algorithm::Genetic);
        let parallel = SweepRunner::new(&par_config, &factory, &par_trainer)
            .run()
            .unwrap();

        assert_eq!(seq_trainer.calls(), 27);
        assert_eq!(par_trainer.calls(), 27);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_corrupted_artifact_aborts_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![1.0, 10.0], 1);
        let key = CacheKey::derive(Algorithm::Genetic, [1.0, 10.0, 1.0]);
        fs::write(key.artifact_path(dir.path()), b"{").unwrap();

        let trainer = CountingTrainer::new(Algorithm::Genetic);
        let err = SweepRunner::new(&config, &small_factory(), &trainer)
            .run()
            .unwrap_err();
        assert!(matches!(err, SweepError::ArtifactCorruption { .. }));
        // points before the corrupted one in grid order were trained
        assert_eq!(trainer.calls(), 2);
    }

    #[test]
    fn test_corrupted_artifact_aborts_parallel_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![1.0, 10.0], 3);
        let key = CacheKey::derive(Algorithm::Genetic, [10.0, 10.0, 10.0]);
        fs::write(key.artifact_path(dir.path()), b"garbage").unwrap();

        let trainer = CountingTrainer::new(Algorithm::Genetic);
        let err = SweepRunner::new(&config, &small_factory(), &trainer)
            .run()
            .unwrap_err();
        assert!(matches!(err, SweepError::ArtifactCorruption { .. }));
    }

    #[test]
    fn test_invalid_config_fails_before_training() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![1.0, 0.0], 1);
        let trainer = CountingTrainer::new(Algorithm::Genetic);
        let err = SweepRunner::new(&config, &small_factory(), &trainer)
            .run()
            .unwrap_err();
        assert!(matches!(
            err,
            SweepError::Configuration(ConfigurationError::InvalidStep { .. })
        ));
        assert_eq!(trainer.calls(), 0);
    }

    #[test]
    fn test_steps_sharing_a_weight_key_fail_before_training() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![1.0, 1.4], 1);
        let trainer = CountingTrainer::new(Algorithm::Genetic);
        let err = SweepRunner::new(&config, &small_factory(), &trainer)
            .run_and_archive()
            .unwrap_err();
        assert!(matches!(
            err,
            SweepError::Configuration(ConfigurationError::KeyCollision { .. })
        ));
        assert_eq!(trainer.calls(), 0);
        assert!(!archive_path(dir.path(), Algorithm::Genetic).exists());
    }

    #[test]
    fn test_degenerate_environment_fails_without_archive() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![1.0], 1);
        let factory = GasStorageConfig {
            capacity_kg: 0.0,
            horizon: 4,
            render: false,
            ..GasStorageConfig::default()
        };
        for algorithm in Algorithm::ALL {
            let trainer = AlgorithmTrainer::new(algorithm);
            let err = SweepRunner::new(&config, &factory, &trainer)
                .run_and_archive()
                .unwrap_err();
            assert!(matches!(
                err,
                SweepError::TrainingFailure {
                    source: TrainingError::NonFiniteReturn,
                    ..
                }
            ));
            assert!(!archive_path(dir.path(), algorithm).exists());
        }
        assert_eq!(artifact_count(dir.path()), 0);
    }

    #[test]
    fn test_empty_step_set_writes_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![], 1);
        let trainer = CountingTrainer::new(Algorithm::CrossEntropy);
        let path = SweepRunner::new(&config, &small_factory(), &trainer)
            .run_and_archive()
            .unwrap();
        assert_eq!(trainer.calls(), 0);
        let results = read_archive(&path).unwrap();
        assert!(results.is_empty());
        assert_eq!(results.algorithm, Algorithm::CrossEntropy);
    }

    #[test]
    fn test_run_and_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), vec![1.0, 10.0], 2);
        let trainer = CountingTrainer::new(Algorithm::Genetic);
        let factory = small_factory();
        let runner = SweepRunner::new(&config, &factory, &trainer);
        let path = runner.run_and_archive().unwrap();
        assert_eq!(path, archive_path(dir.path(), Algorithm::Genetic));

        let archived = read_archive(&path).unwrap();
        assert_eq!(archived, runner.run().unwrap());
    }

    #[test]
    fn test_real_trainer_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), vec![1.0], 1);
        config.training_budget = 30;
        let factory = GasStorageConfig {
            horizon: 5,
            render: false,
            ..GasStorageConfig::default()
        };
        for algorithm in Algorithm::ALL {
            let trainer = AlgorithmTrainer::new(algorithm);
            let results = SweepRunner::new(&config, &factory, &trainer).run().unwrap();
            assert_eq!(results.len(), 1);
            let result = results.get(&WeightKey([1, 1, 1])).unwrap();
            assert_eq!(result.steps(), 5);
        }
        assert_eq!(artifact_count(dir.path()), 2);
    }
}
