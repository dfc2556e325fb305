//! Genetic algorithm over linear policy parameters.
//!
//! Each individual is a parameter vector for a [`LinearPolicy`]; its fitness
//! is the undiscounted return of one episode. A generation is evolved with
//! elitism, tournament selection, BLX-α crossover and Gaussian mutation.
//!
//! # Algorithm Overview
//!
//! 1. **Evaluate Fitness** - every individual runs one episode on its own
//!    environment instance (in parallel, one scoped thread per individual)
//! 2. **Elite Selection** - the best individuals survive unchanged
//! 3. **Tournament Selection** - parents are the fittest of small random groups
//! 4. **Crossover (BLX-α)** - children blend their parents' parameters
//! 5. **Mutation** - Gaussian noise on a random subset of parameters
//!
//! The loop stops once the consumed environment steps reach the training
//! budget; the best individual of the last evaluated generation is returned.

use std::thread;

use rand::{Rng, SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg64Mcg;
use storesweep_env::{EnvironmentFactory, RewardWeights};
use storesweep_stats::descriptive::DescriptiveStats;
use tracing::debug;

use crate::{
    algorithm::{
        Algorithm, ProblemShape, TrainedPolicy, Trainer, TrainingError, TrainingRequest, rollout,
    },
    weights,
};

const POPULATION_COUNT: usize = 16;
const ELITE_COUNT: usize = 2;
const TOURNAMENT_SIZE: usize = 3;
const MAX_WEIGHT: f64 = 5.0;
const MUTATION_RATE: f64 = 0.3;
const MUTATION_SIGMA: f64 = 0.3;
const BLX_ALPHA: f64 = 0.2;

/// A candidate parameter vector and its fitness.
#[derive(Debug, Clone)]
pub struct Individual {
    params: Vec<f64>,
    fitness: f64,
}

impl Individual {
    #[must_use]
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Episode return of the last evaluation (`f64::MIN` before evaluation).
    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }
}

#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    /// Creates `count` individuals with parameters uniform in `[-max_weight, max_weight]`.
    pub fn random<R>(count: usize, param_count: usize, max_weight: f64, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let individuals = (0..count)
            .map(|_| Individual {
                params: weights::random(rng, max_weight, param_count),
                fitness: f64::MIN,
            })
            .collect();
        Self { individuals }
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Evaluates every individual in parallel and sorts by fitness, best first.
    ///
    /// Returns the number of environment steps consumed, or an error when any
    /// episode return is not finite.
    fn evaluate_fitness<F>(
        &mut self,
        factory: &F,
        weights: RewardWeights,
        shape: ProblemShape,
    ) -> Result<usize, TrainingError>
    where
        F: EnvironmentFactory,
    {
        let steps = thread::scope(|s| {
            let handles = self
                .individuals
                .iter_mut()
                .map(|ind| {
                    let policy = shape.policy(ind.params.clone());
                    s.spawn(move || {
                        let mut env = factory.build(weights);
                        let rollout = rollout(&mut env, &policy);
                        ind.fitness = rollout.total_reward;
                        rollout.steps()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(steps) => steps,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .sum::<usize>()
        });

        if self.individuals.iter().any(|ind| !ind.fitness.is_finite()) {
            return Err(TrainingError::NonFiniteReturn);
        }
        self.individuals
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        Ok(steps)
    }

    fn fitness_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::new(self.individuals.iter().map(|ind| ind.fitness))
    }
}

/// Evolution parameters applied between generations.
#[derive(Debug, Clone)]
pub struct PopulationEvolver {
    /// Number of top individuals preserved unchanged
    pub elite_count: usize,
    /// Parameters are clamped to `[-max_weight, max_weight]`
    pub max_weight: f64,
    /// Tournament size for selection (larger = stronger selection pressure)
    pub tournament_size: usize,
    /// Standard deviation of the Gaussian mutation noise
    pub mutation_sigma: f64,
    /// BLX-α range expansion
    pub blx_alpha: f64,
    /// Per-parameter mutation probability
    pub mutation_rate: f64,
}

impl Default for PopulationEvolver {
    fn default() -> Self {
        Self {
            elite_count: ELITE_COUNT,
            max_weight: MAX_WEIGHT,
            tournament_size: TOURNAMENT_SIZE,
            mutation_sigma: MUTATION_SIGMA,
            blx_alpha: BLX_ALPHA,
            mutation_rate: MUTATION_RATE,
        }
    }
}

impl PopulationEvolver {
    /// Creates the next generation from a population sorted best first.
    #[must_use]
    pub fn evolve<R>(&self, population: &Population, rng: &mut R) -> Population
    where
        R: Rng + ?Sized,
    {
        assert!(
            population
                .individuals
                .is_sorted_by(|a, b| a.fitness.total_cmp(&b.fitness).is_ge())
        );

        let elite_count = self.elite_count.min(population.individuals.len());
        let mut next = population.individuals[..elite_count].to_vec();
        while next.len() < population.individuals.len() {
            let p1 = tournament_select(&population.individuals, self.tournament_size, rng);
            let p2 = tournament_select(&population.individuals, self.tournament_size, rng);
            let mut child =
                weights::blx_alpha(&p1.params, &p2.params, self.blx_alpha, self.max_weight, rng);
            weights::mutate(
                &mut child,
                self.mutation_sigma,
                self.max_weight,
                self.mutation_rate,
                rng,
            );
            next.push(Individual {
                params: child,
                fitness: f64::MIN,
            });
        }
        Population { individuals: next }
    }
}

fn tournament_select<'a, R>(population: &'a [Individual], tournament_size: usize, rng: &mut R) -> &'a Individual
where
    R: Rng + ?Sized,
{
    assert!(tournament_size > 0);
    population
        .choose_multiple(rng, tournament_size)
        .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
        .expect("population is not empty")
}

/// Trains linear policies with a generational genetic algorithm.
#[derive(Debug, Clone)]
pub struct GeneticTrainer {
    pub population_count: usize,
    pub evolver: PopulationEvolver,
}

impl Default for GeneticTrainer {
    fn default() -> Self {
        Self {
            population_count: POPULATION_COUNT,
            evolver: PopulationEvolver::default(),
        }
    }
}

impl Trainer for GeneticTrainer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Genetic
    }

    fn train<F>(&self, factory: &F, request: &TrainingRequest) -> Result<TrainedPolicy, TrainingError>
    where
        F: EnvironmentFactory,
    {
        if request.budget_steps == 0 {
            return Err(TrainingError::EmptyBudget);
        }
        let shape = ProblemShape::probe(&factory.build(request.weights))?;
        let mut rng = Pcg64Mcg::seed_from_u64(request.seed);
        let mut population = Population::random(
            self.population_count.max(1),
            shape.parameter_count(),
            self.evolver.max_weight,
            &mut rng,
        );

        let mut steps_used = 0;
        let mut generation = 0;
        loop {
            steps_used += population.evaluate_fitness(factory, request.weights, shape)?;
            if let Some(stats) = population.fitness_stats() {
                debug!(
                    generation,
                    steps_used,
                    best = stats.max,
                    mean = stats.mean,
                    spread = stats.normalized_std_dev,
                    "evaluated generation"
                );
            }
            if steps_used >= request.budget_steps {
                break;
            }
            population = self.evolver.evolve(&population, &mut rng);
            generation += 1;
        }

        let best = &population.individuals()[0];
        let policy = shape.policy(best.params.clone());
        if !policy.is_finite() {
            return Err(TrainingError::NonFiniteParameters);
        }
        Ok(TrainedPolicy {
            policy,
            steps_used,
            final_return: best.fitness,
        })
    }
}
