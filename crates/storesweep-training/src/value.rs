//! Linear state-value estimation from Monte Carlo returns.

use storesweep_env::Observation;

/// Discounted return-to-go for every step of a reward trace.
///
/// ```
/// use storesweep_training::value::discounted_returns;
///
/// let returns = discounted_returns(&[1.0, 1.0, 1.0], 0.5);
/// assert_eq!(returns, vec![1.75, 1.5, 1.0]);
/// ```
#[must_use]
pub fn discounted_returns(rewards: &[f64], discount: f64) -> Vec<f64> {
    let mut returns = vec![0.0; rewards.len()];
    let mut acc = 0.0;
    for (ret, reward) in returns.iter_mut().zip(rewards).rev() {
        acc = reward + discount * acc;
        *ret = acc;
    }
    returns
}

/// Fits `targets ≈ w · [observation, 1]` by ridge regression.
///
/// Returns the weights in the layout used by [`LinearPolicy`](crate::policy::LinearPolicy)
/// (coefficients followed by the bias), or `None` when there are no samples
/// or the normal equations are singular.
///
/// # Panics
///
/// Panics if `observations` and `targets` have different lengths.
#[must_use]
pub fn fit_linear_value(observations: &[Observation], targets: &[f64], ridge: f64) -> Option<Vec<f64>> {
    assert_eq!(observations.len(), targets.len());
    let dim = observations.first()?.len() + 1;

    let mut xtx = vec![vec![0.0; dim]; dim];
    let mut xty = vec![0.0; dim];
    for (observation, target) in observations.iter().zip(targets) {
        let features = observation
            .as_slice()
            .iter()
            .copied()
            .chain([1.0])
            .collect::<Vec<_>>();
        if features.len() != dim {
            return None;
        }
        for (i, fi) in features.iter().enumerate() {
            xty[i] += fi * target;
            for (j, fj) in features.iter().enumerate() {
                xtx[i][j] += fi * fj;
            }
        }
    }
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += ridge;
    }

    solve(xtx, xty)
}

/// Solves `a x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    const PIVOT_EPSILON: f64 = 1e-12;

    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum::<f64>();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
