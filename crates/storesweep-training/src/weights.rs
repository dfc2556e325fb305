//! Parameter vector operations used by the trainers.
//!
//! Policy parameters are unconstrained reals, so every operator here works on
//! the symmetric range `[-max_weight, max_weight]`.
//!
//! - **Initialization**: [`random`] draws uniform parameters
//! - **Crossover**: [`blx_alpha`] implements the BLX-α blend operator
//! - **Mutation**: [`mutate`] applies Gaussian noise to a subset of parameters

use rand::Rng;
use rand_distr::StandardNormal;

/// Creates a parameter vector by applying a function to each index.
///
/// # Examples
///
/// ```
/// use storesweep_training::weights;
///
/// let params = weights::from_fn(|i| i as f64, 3);
/// assert_eq!(params, vec![0.0, 1.0, 2.0]);
/// ```
pub fn from_fn<F>(f: F, len: usize) -> Vec<f64>
where
    F: FnMut(usize) -> f64,
{
    (0..len).map(f).collect()
}

/// Draws each parameter uniformly from `[-max_weight, max_weight]`.
pub fn random<R>(rng: &mut R, max_weight: f64, len: usize) -> Vec<f64>
where
    R: Rng + ?Sized,
{
    from_fn(|_| rng.random_range(-max_weight..=max_weight), len)
}

/// BLX-α crossover between two parents.
///
/// Each child parameter is sampled uniformly from the parents' interval
/// widened by `alpha` times its length on both sides, then clamped to
/// `[-max_weight, max_weight]`.
///
/// # Panics
///
/// Panics if the parents have different lengths.
pub fn blx_alpha<R>(p1: &[f64], p2: &[f64], alpha: f64, max_weight: f64, rng: &mut R) -> Vec<f64>
where
    R: Rng + ?Sized,
{
    assert_eq!(p1.len(), p2.len());
    p1.iter()
        .zip(p2)
        .map(|(&x1, &x2)| {
            let min = f64::min(x1, x2);
            let max = f64::max(x1, x2);
            let d = max - min;
            rng.random_range((min - alpha * d)..=(max + alpha * d))
                .clamp(-max_weight, max_weight)
        })
        .collect()
}

/// Gaussian mutation in place.
///
/// Each parameter is perturbed with probability `rate` by noise drawn from
/// `N(0, sigma²)` and clamped to `[-max_weight, max_weight]`.
pub fn mutate<R>(params: &mut [f64], sigma: f64, max_weight: f64, rate: f64, rng: &mut R)
where
    R: Rng + ?Sized,
{
    for p in params {
        if rng.random_bool(rate) {
            let noise: f64 = rng.sample(StandardNormal);
            *p = (*p + sigma * noise).clamp(-max_weight, max_weight);
        }
    }
}
