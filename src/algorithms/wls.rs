// src/algorithms/wls.rs

//! Kernel-weighted least squares with the SHAP boundary constraints.

use crate::core::{Result, ShapError};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

#[cfg(not(feature = "linalg"))]
const MAX_RIDGE_STEPS: usize = 16;

/// Solves for one attribution per column of `masks`.
///
/// Rows of `masks` are coalitions (1 = feature taken from the instance),
/// `targets` the link-space mean output of each coalition and `weights` their
/// kernel weights. The empty coalition must reproduce `base` and the full one
/// `full`; both hold exactly, so the attributions always sum to `full - base`.
///
/// When the coalitions do not pin every attribution down, the answer is the
/// minimum-norm one, so features in symmetric roles share alike regardless of
/// their column order.
///
/// Any non-finite target or boundary value makes every attribution NaN.
pub fn solve_constrained(
    masks: ArrayView2<f64>,
    targets: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    base: f64,
    full: f64,
) -> Result<Array1<f64>> {
    let m = masks.ncols();
    if m == 0 {
        return Ok(Array1::zeros(0));
    }
    if !base.is_finite() || !full.is_finite() || targets.iter().any(|y| !y.is_finite()) {
        return Ok(Array1::from_elem(m, f64::NAN));
    }
    let delta = full - base;
    if m == 1 {
        return Ok(Array1::from_elem(1, delta));
    }
    if targets.len() != masks.nrows() {
        return Err(ShapError::IncompatibleDimensions(format!(
            "WLS got {} coalitions and {} targets",
            masks.nrows(),
            targets.len()
        )));
    }

    // phi = delta / m + Q v, with the columns of Q spanning the sum-zero subspace
    let share = delta / m as f64;
    let basis = sum_zero_basis(m);
    let design = masks.dot(&basis);
    let adjusted: Array1<f64> = masks
        .rows()
        .into_iter()
        .zip(targets.iter())
        .map(|(row, &y)| y - base - share * row.sum())
        .collect();

    let coords = solve_weighted_least_squares(design.view(), adjusted.view(), weights)?;
    let mut phi = basis.dot(&coords).mapv(|v| v + share);
    let last = m - 1;
    phi[last] = delta - phi.slice(s![..last]).sum();
    Ok(phi)
}

/// Orthonormal `m x (m - 1)` basis of the vectors summing to zero.
///
/// Column `k - 1` is `(1, .., 1, -k, 0, .., 0) / sqrt(k (k + 1))` with `k` ones.
fn sum_zero_basis(m: usize) -> Array2<f64> {
    let mut basis = Array2::zeros((m, m - 1));
    for k in 1..m {
        let norm = ((k * (k + 1)) as f64).sqrt();
        for j in 0..k {
            basis[[j, k - 1]] = 1.0 / norm;
        }
        basis[[k, k - 1]] = -(k as f64) / norm;
    }
    basis
}

fn solve_weighted_least_squares(
    features: ArrayView2<f64>,
    target: ArrayView1<f64>,
    weights: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    if features.nrows() != target.len() || target.len() != weights.len() {
        return Err(ShapError::IncompatibleDimensions(format!(
            "WLS got {} rows, {} targets and {} weights",
            features.nrows(),
            target.len(),
            weights.len()
        )));
    }
    let n_coeffs = features.ncols();
    if features.nrows() == 0 {
        return Ok(Array1::zeros(n_coeffs));
    }

    #[cfg(feature = "linalg")]
    {
        // Using SVD based least squares; rank-deficient systems get the minimum-norm solution
        use ndarray_linalg::LeastSquaresSvd;
        let mut x_w = features.to_owned();
        let mut y_w = target.to_owned();
        for (i, &w) in weights.iter().enumerate() {
            let sqrt_w = w.max(0.0).sqrt();
            x_w.row_mut(i).mapv_inplace(|v| v * sqrt_w);
            y_w[i] *= sqrt_w;
        }
        let result = x_w.least_squares(&y_w)?;
        if result.rank < n_coeffs as i32 {
            log::debug!(
                "rank-deficient regression ({} of {}); using minimum-norm solution",
                result.rank,
                n_coeffs
            );
        }
        Ok(result.solution)
    }
    #[cfg(not(feature = "linalg"))]
    {
        let (normal, rhs) = normal_equations(features, target, weights);
        regularized_solve(&normal, &rhs)
    }
}

/// `X^T W X` and `X^T W y`.
#[cfg(not(feature = "linalg"))]
fn normal_equations(
    features: ArrayView2<f64>,
    target: ArrayView1<f64>,
    weights: ArrayView1<f64>,
) -> (Array2<f64>, Array1<f64>) {
    let k = features.ncols();
    let mut normal = Array2::zeros((k, k));
    let mut rhs = Array1::zeros(k);
    for ((row, &y), &w) in features.rows().into_iter().zip(target.iter()).zip(weights.iter()) {
        for a in 0..k {
            let wa = w * row[a];
            if wa == 0.0 {
                continue;
            }
            rhs[a] += wa * y;
            for b in 0..=a {
                normal[[a, b]] += wa * row[b];
            }
        }
    }
    for a in 0..k {
        for b in 0..a {
            normal[[b, a]] = normal[[a, b]];
        }
    }
    (normal, rhs)
}

/// Cholesky solve, retried with a growing ridge when the system is singular.
#[cfg(not(feature = "linalg"))]
fn regularized_solve(normal: &Array2<f64>, rhs: &Array1<f64>) -> Result<Array1<f64>> {
    if let Some(solution) = cholesky_solve(normal, rhs) {
        return Ok(solution);
    }
    let scale = normal
        .diag()
        .iter()
        .fold(0.0_f64, |acc, &d| acc.max(d.abs()))
        .max(1.0);
    let mut ridge = scale * 1e-10;
    for _ in 0..MAX_RIDGE_STEPS {
        let mut damped = normal.clone();
        damped.diag_mut().mapv_inplace(|d| d + ridge);
        if let Some(solution) = cholesky_solve(&damped, rhs) {
            log::debug!("singular regression system; solved with ridge {:e}", ridge);
            return Ok(solution);
        }
        ridge *= 10.0;
    }
    Err(ShapError::Internal(
        "regression system could not be regularized".to_string(),
    ))
}

/// Solves `A x = b` for symmetric positive definite `A`.
/// Returns `None` when a pivot is not clearly positive.
#[cfg(not(feature = "linalg"))]
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let tolerance = a.diag().iter().fold(0.0_f64, |acc, &d| acc.max(d.abs())) * 1e-12;

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag.is_nan() || diag <= tolerance {
                    return None;
                }
                l[[i, i]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::coalitions::CoalitionSet;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Coalition values of an additive game with the given per-feature effects.
    fn additive_targets(masks: ArrayView2<f64>, base: f64, effects: &[f64]) -> Array1<f64> {
        masks
            .rows()
            .into_iter()
            .map(|row| base + row.iter().zip(effects).map(|(z, e)| z * e).sum::<f64>())
            .collect()
    }

    #[test]
    fn recovers_additive_effects_from_full_enumeration() {
        let effects = [0.5, -2.0, 3.0, 0.0];
        let set = CoalitionSet::generate(4, 100, &mut StdRng::seed_from_u64(0)).unwrap();
        let targets = additive_targets(set.masks.view(), 1.0, &effects);
        let full = 1.0 + effects.iter().sum::<f64>();
        let phi =
            solve_constrained(set.masks.view(), targets.view(), set.weights.view(), 1.0, full)
                .unwrap();
        for (p, e) in phi.iter().zip(effects.iter()) {
            assert_abs_diff_eq!(*p, *e, epsilon = 1e-9);
        }
    }

    #[test]
    fn exact_shapley_values_for_interaction_game() {
        // v(S) = 1 if both features are present: each gets half
        let masks = array![[1.0, 0.0], [0.0, 1.0]];
        let targets = array![0.0, 0.0];
        let weights = array![1.0, 1.0];
        let phi =
            solve_constrained(masks.view(), targets.view(), weights.view(), 0.0, 1.0).unwrap();
        assert_abs_diff_eq!(phi[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(phi[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn single_feature_takes_the_whole_difference() {
        let masks = Array2::<f64>::zeros((0, 1));
        let empty = Array1::<f64>::zeros(0);
        let phi = solve_constrained(masks.view(), empty.view(), empty.view(), 4.0, 6.0).unwrap();
        assert_eq!(phi, array![2.0]);
    }

    #[test]
    fn sum_zero_basis_is_orthonormal() {
        let basis = sum_zero_basis(5);
        let gram = basis.t().dot(&basis);
        for ((i, j), &v) in gram.indexed_iter() {
            assert_abs_diff_eq!(v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-12);
        }
        for col in basis.columns() {
            assert_abs_diff_eq!(col.sum(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn underdetermined_system_still_satisfies_constraints() {
        // three features, a single coalition: singular normal equations
        let masks = array![[1.0, 0.0, 0.0]];
        let targets = array![1.0];
        let weights = array![0.25];
        let phi =
            solve_constrained(masks.view(), targets.view(), weights.view(), 0.0, 3.0).unwrap();
        assert!(phi.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(phi.sum(), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(phi[1], phi[2], epsilon = 1e-6);
    }

    #[test]
    fn no_coalitions_splits_difference_evenly() {
        let masks = Array2::<f64>::zeros((0, 3));
        let empty = Array1::<f64>::zeros(0);
        let phi = solve_constrained(masks.view(), empty.view(), empty.view(), 1.0, 2.5).unwrap();
        for &p in phi.iter() {
            assert_abs_diff_eq!(p, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn undetermined_features_share_alike_in_any_column_order() {
        // only feature 0 (or 2) is observed alone; the other two split the rest
        let weights = array![1.0];
        let targets = array![2.0];
        let first = array![[1.0, 0.0, 0.0]];
        let phi =
            solve_constrained(first.view(), targets.view(), weights.view(), 0.0, 3.0).unwrap();
        for (p, e) in phi.iter().zip([2.0, 0.5, 0.5].iter()) {
            assert_abs_diff_eq!(*p, *e, epsilon = 1e-6);
        }

        let last = array![[0.0, 0.0, 1.0]];
        let phi =
            solve_constrained(last.view(), targets.view(), weights.view(), 0.0, 3.0).unwrap();
        for (p, e) in phi.iter().zip([0.5, 0.5, 2.0].iter()) {
            assert_abs_diff_eq!(*p, *e, epsilon = 1e-6);
        }
    }

    #[test]
    fn determined_pairs_give_exact_values_for_symmetric_game() {
        // v(S) = |S|: the pair {0, 1} fixes one half, the constraint the other
        let masks = array![[1.0, 1.0, 0.0, 0.0]];
        let phi = solve_constrained(masks.view(), array![2.0].view(), array![1.0].view(), 0.0, 4.0)
            .unwrap();
        for &p in phi.iter() {
            assert_abs_diff_eq!(p, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn non_finite_inputs_give_nan() {
        let masks = array![[1.0, 0.0], [0.0, 1.0]];
        let weights = array![1.0, 1.0];
        let targets = array![f64::NAN, 0.2];
        let phi =
            solve_constrained(masks.view(), targets.view(), weights.view(), 0.0, 1.0).unwrap();
        assert!(phi.iter().all(|v| v.is_nan()));

        let targets = array![0.1, 0.2];
        let phi = solve_constrained(
            masks.view(),
            targets.view(),
            weights.view(),
            f64::NEG_INFINITY,
            1.0,
        )
        .unwrap();
        assert!(phi.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let masks = array![[1.0, 0.0], [0.0, 1.0]];
        let targets = array![0.1, 0.2];
        let err = solve_constrained(masks.view(), targets.view(), array![1.0].view(), 0.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, ShapError::IncompatibleDimensions(_)));

        let err = solve_constrained(masks.view(), array![0.1].view(), targets.view(), 0.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, ShapError::IncompatibleDimensions(_)));
    }
}
