// src/algorithms/synthesis.rs

use crate::algorithms::background::Background;
use crate::algorithms::coalitions::CoalitionSet;
use crate::core::{PredictionInput, PredictionOutput, Result, ShapError};
use ndarray::Array2;

/// Builds one synthetic row per (coalition, background row) pair, coalition-major.
///
/// `varying[k]` is the feature index behind column `k` of the coalition masks.
/// Features in the coalition, and features outside `varying`, keep the
/// instance's value; the rest take the background row's value.
pub fn synthesize(
    instance: &PredictionInput,
    varying: &[usize],
    coalitions: &CoalitionSet,
    background: &Background,
) -> Vec<PredictionInput> {
    let data = background.data();
    let base_values = instance.values();
    let mut samples = Vec::with_capacity(coalitions.len() * background.num_rows());

    for coalition in coalitions.masks.rows() {
        for background_sample in data.rows() {
            let mut values = base_values.clone();
            for (k, &feat_idx) in varying.iter().enumerate() {
                if coalition[k] != 1.0 {
                    values[feat_idx] = background_sample[feat_idx];
                }
            }
            samples.push(instance.with_values(values.view()));
        }
    }
    samples
}

/// Averages consecutive blocks of `group_size` model outputs.
///
/// Returns a `(outputs.len() / group_size, num_outputs)` matrix. Fails when
/// the model answered with the wrong number of rows or output values.
pub fn average_outputs(
    outputs: &[PredictionOutput],
    expected_rows: usize,
    group_size: usize,
    num_outputs: usize,
) -> Result<Array2<f64>> {
    if outputs.len() != expected_rows {
        return Err(ShapError::Prediction(format!(
            "model returned {} predictions for {} inputs",
            outputs.len(),
            expected_rows
        )));
    }
    if group_size == 0 {
        return Ok(Array2::zeros((0, num_outputs)));
    }

    let groups = expected_rows / group_size;
    let mut means = Array2::zeros((groups, num_outputs));
    for (group, chunk) in outputs.chunks(group_size).enumerate() {
        for output in chunk {
            if output.len() != num_outputs {
                return Err(ShapError::Prediction(format!(
                    "model returned {} outputs, expected {}",
                    output.len(),
                    num_outputs
                )));
            }
            for (o, out) in output.outputs.iter().enumerate() {
                means[[group, o]] += out.value;
            }
        }
    }
    means.mapv_inplace(|v| v / group_size as f64);
    Ok(means)
}
