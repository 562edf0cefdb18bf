// src/utils/mod.rs

//! Combinatorics and row/matrix conversions shared by the algorithms.

use crate::core::{Dataset, PredictionInput, Result, ValidationError};

/// Helper for combinations C(n, k) = n! / (k! * (n-k)!)
pub fn n_choose_k(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    if k == 0 || k == n {
        return 1.0;
    }
    // Exploit symmetry C(n, k) = C(n, n-k) to keep k small for precision/performance
    let eff_k = if k > n / 2 { n - k } else { k };

    let mut res = 1.0;
    for i in 0..eff_k {
        res *= (n - i) as f64;
        res /= (i + 1) as f64;
    }
    res
}

/// Calls `visit` once for every k-subset of `0..n`, in lexicographic order.
pub fn for_each_combination<F: FnMut(&[usize])>(n: usize, k: usize, mut visit: F) {
    if k > n {
        return;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        visit(&idx);
        // rightmost position that can still move forward
        let mut i = k;
        loop {
            if i == 0 {
                return;
            }
            i -= 1;
            if idx[i] != i + n - k {
                break;
            }
            if i == 0 {
                return;
            }
        }
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Builds prediction inputs from raw rows, naming features `f0`, `f1`, ...
pub fn rows_from_matrix(matrix: &[Vec<f64>]) -> Vec<PredictionInput> {
    matrix.iter().map(|row| PredictionInput::from_values(row)).collect()
}

/// Stacks rows into a matrix. Every row must have as many features as the first.
pub fn matrix_from_rows(rows: &[PredictionInput]) -> Result<Dataset> {
    let num_features = rows.first().map_or(0, PredictionInput::len);
    let mut values = Vec::with_capacity(rows.len() * num_features);
    for (row, input) in rows.iter().enumerate() {
        if input.len() != num_features {
            return Err(ValidationError::RaggedBackground {
                row,
                expected: num_features,
                found: input.len(),
            }
            .into());
        }
        values.extend(input.features.iter().map(|f| f.value));
    }
    Ok(Dataset::from_shape_vec((rows.len(), num_features), values)?)
}
