// src/core/data.rs
use crate::core::errors::{Result, ValidationError};
use ndarray::{Array1, Array2, Array3, ArrayView1};
use std::fmt;

/// Represents a single data instance (a row of feature values).
pub type Instance = Array1<f64>;

/// Represents a dataset (multiple instances, e.g., background data).
pub type Dataset = Array2<f64>;

/// A named numeric feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: String,
    pub value: f64,
}

impl Feature {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Feature {
            name: name.into(),
            value,
        }
    }
}

/// An ordered row of features fed to a model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredictionInput {
    pub features: Vec<Feature>,
}

impl PredictionInput {
    pub fn new(features: Vec<Feature>) -> Self {
        PredictionInput { features }
    }

    /// Builds a row from raw values, naming the features `f0`, `f1`, ...
    pub fn from_values(values: &[f64]) -> Self {
        let features = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Feature::new(format!("f{}", i), v))
            .collect();
        PredictionInput { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn value(&self, idx: usize) -> f64 {
        self.features[idx].value
    }

    pub fn values(&self) -> Instance {
        self.features.iter().map(|f| f.value).collect()
    }

    /// Same feature names, new values. `values` must have `self.len()` entries.
    pub(crate) fn with_values(&self, values: ArrayView1<f64>) -> Self {
        let features = self
            .features
            .iter()
            .zip(values.iter())
            .map(|(f, &v)| Feature::new(f.name.clone(), v))
            .collect();
        PredictionInput { features }
    }
}

/// A single named model output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: f64,
}

impl Output {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Output {
            name: name.into(),
            value,
        }
    }
}

/// The ordered outputs a model produced for one input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredictionOutput {
    pub outputs: Vec<Output>,
}

impl PredictionOutput {
    pub fn new(outputs: Vec<Output>) -> Self {
        PredictionOutput { outputs }
    }

    /// Builds an output vector from raw values, naming the outputs `o0`, `o1`, ...
    pub fn from_values(values: &[f64]) -> Self {
        let outputs = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Output::new(format!("o{}", i), v))
            .collect();
        PredictionOutput { outputs }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn value(&self, idx: usize) -> f64 {
        self.outputs[idx].value
    }

    pub fn values(&self) -> Array1<f64> {
        self.outputs.iter().map(|o| o.value).collect()
    }
}

/// An input together with the output the model was observed to produce for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub input: PredictionInput,
    pub output: PredictionOutput,
}

impl Prediction {
    pub fn new(input: PredictionInput, output: PredictionOutput) -> Self {
        Prediction { input, output }
    }

    /// Pairs inputs with the outputs a model returned for them, position by position.
    pub fn zip(inputs: Vec<PredictionInput>, outputs: Vec<PredictionOutput>) -> Result<Vec<Self>> {
        if inputs.len() != outputs.len() {
            return Err(ValidationError::LengthMismatch {
                inputs: inputs.len(),
                outputs: outputs.len(),
            }
            .into());
        }
        Ok(inputs
            .into_iter()
            .zip(outputs)
            .map(|(input, output)| Prediction { input, output })
            .collect())
    }
}

/// SHAP values for a batch of explained instances.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// Attributions indexed `[instance, output, feature]`.
    pub shap_values: Array3<f64>,
    /// Link-space mean model output over the background, one per output.
    pub expected_values: Array1<f64>,
}

impl Explanation {
    pub fn num_instances(&self) -> usize {
        self.shap_values.shape()[0]
    }

    pub fn num_outputs(&self) -> usize {
        self.shap_values.shape()[1]
    }

    pub fn num_features(&self) -> usize {
        self.shap_values.shape()[2]
    }

    /// Attributions of every feature for one instance and output.
    pub fn values(&self, instance: usize, output: usize) -> ArrayView1<'_, f64> {
        self.shap_values.slice(ndarray::s![instance, output, ..])
    }

    pub fn into_array(self) -> Array3<f64> {
        self.shap_values
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Explanation:")?;
        for (o, base) in self.expected_values.iter().enumerate() {
            writeln!(f, "  Expected Value (Output {}): {:.4}", o, base)?;
        }
        for i in 0..self.num_instances() {
            writeln!(f, "  Instance {}:", i)?;
            for o in 0..self.num_outputs() {
                writeln!(f, "    Output {}:", o)?;
                for (j, val) in self.values(i, o).iter().enumerate().take(10) {
                    writeln!(f, "      Feature {}: {:.4}", j, val)?;
                }
                if self.num_features() > 10 {
                    writeln!(f, "      ...")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShapError;

    #[test]
    fn zip_pairs_by_position() {
        let inputs = vec![
            PredictionInput::from_values(&[1.0, 2.0]),
            PredictionInput::from_values(&[3.0, 4.0]),
        ];
        let outputs = vec![
            PredictionOutput::from_values(&[3.0]),
            PredictionOutput::from_values(&[7.0]),
        ];
        let predictions = Prediction::zip(inputs, outputs).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[1].input.value(0), 3.0);
        assert_eq!(predictions[1].output.value(0), 7.0);
    }

    #[test]
    fn zip_rejects_length_mismatch() {
        let err = Prediction::zip(vec![PredictionInput::from_values(&[1.0])], vec![]).unwrap_err();
        assert!(matches!(
            err,
            ShapError::Validation(ValidationError::LengthMismatch { inputs: 1, outputs: 0 })
        ));
    }

    #[test]
    fn with_values_keeps_names() {
        let input =
            PredictionInput::new(vec![Feature::new("age", 30.0), Feature::new("income", 1.5)]);
        let replaced = input.with_values(ndarray::array![31.0, 2.5].view());
        assert_eq!(replaced.features[0], Feature::new("age", 31.0));
        assert_eq!(replaced.features[1], Feature::new("income", 2.5));
    }

    #[test]
    fn explanation_display_lists_outputs() {
        let explanation = Explanation {
            shap_values: Array3::zeros((1, 2, 3)),
            expected_values: ndarray::array![0.5, 1.0],
        };
        let text = explanation.to_string();
        assert!(text.contains("Expected Value (Output 1): 1.0000"));
        assert!(text.contains("Feature 2: 0.0000"));
        assert_eq!(explanation.values(0, 1).len(), 3);
    }
}
