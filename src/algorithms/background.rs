// src/algorithms/background.rs

use crate::core::{Dataset, PredictionInput, Result, ValidationError};
use crate::utils::matrix_from_rows;
use ndarray::ArrayView1;

/// Per-feature classification of the background data.
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceMap {
    /// `None` for a varying column, `Some(value)` for a column that only holds `value`.
    columns: Vec<Option<f64>>,
}

impl VarianceMap {
    /// A column varies when at least two distinct values occur in it.
    pub fn analyze(background: &Dataset) -> Self {
        let columns = background
            .columns()
            .into_iter()
            .map(|column| {
                let first = column[0];
                if column.iter().all(|&v| v == first) {
                    Some(first)
                } else {
                    None
                }
            })
            .collect();
        VarianceMap { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn is_varying(&self, feature: usize) -> bool {
        self.columns[feature].is_none()
    }

    pub fn constant_value(&self, feature: usize) -> Option<f64> {
        self.columns[feature]
    }

    pub fn num_varying(&self) -> usize {
        self.columns.iter().filter(|c| c.is_none()).count()
    }

    /// Indices of the features that vary for `instance`: varying background
    /// columns, plus constant columns the instance disagrees with.
    pub fn varying_for(&self, instance: ArrayView1<f64>) -> Vec<usize> {
        self.columns
            .iter()
            .zip(instance.iter())
            .enumerate()
            .filter_map(|(idx, (column, value))| match column {
                Some(constant) if constant == value => None,
                _ => Some(idx),
            })
            .collect()
    }
}

/// The fixed reference data of an explainer.
#[derive(Debug, Clone)]
pub struct Background {
    rows: Vec<PredictionInput>,
    data: Dataset,
    variance: VarianceMap,
}

impl Background {
    pub fn new(rows: Vec<PredictionInput>) -> Result<Self> {
        if rows.is_empty() {
            return Err(ValidationError::EmptyBackground.into());
        }
        let data = matrix_from_rows(&rows)?;
        let variance = VarianceMap::analyze(&data);
        Ok(Background {
            rows,
            data,
            variance,
        })
    }

    pub fn rows(&self) -> &[PredictionInput] {
        &self.rows
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn variance(&self) -> &VarianceMap {
        &self.variance
    }

    pub fn num_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.data.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShapError;
    use crate::utils::rows_from_matrix;
    use ndarray::array;

    #[test]
    fn classifies_columns() {
        let background = Background::new(rows_from_matrix(&[
            vec![1., 2., 3., -4., 5.],
            vec![10., 11., 12., -4., 13.],
            vec![2., 3., 4., -4., 6.],
        ]))
        .unwrap();
        let variance = background.variance();
        assert_eq!(variance.len(), 5);
        assert_eq!(variance.num_varying(), 4);
        assert!(variance.is_varying(0));
        assert!(!variance.is_varying(3));
        assert_eq!(variance.constant_value(3), Some(-4.0));
        assert_eq!(variance.constant_value(0), None);
    }

    #[test]
    fn single_row_background_is_constant() {
        let background = Background::new(rows_from_matrix(&[vec![1., 2.]])).unwrap();
        assert_eq!(background.variance().num_varying(), 0);
        assert_eq!(background.num_rows(), 1);
        assert_eq!(background.num_features(), 2);
    }

    #[test]
    fn instance_disagreeing_with_constant_varies() {
        let background =
            Background::new(rows_from_matrix(&[vec![1., 2., 3.], vec![1., 2., 3.]])).unwrap();
        let variance = background.variance();
        assert!(variance.varying_for(array![1., 2., 3.].view()).is_empty());
        assert_eq!(variance.varying_for(array![3., 2., 3.].view()), vec![0]);
        assert_eq!(variance.varying_for(array![1., 2., 2.].view()), vec![2]);
    }

    #[test]
    fn rejects_empty_and_ragged_backgrounds() {
        let err = Background::new(Vec::new()).unwrap_err();
        assert!(matches!(err, ShapError::Validation(ValidationError::EmptyBackground)));

        let err = Background::new(rows_from_matrix(&[vec![1., 2.], vec![1.]])).unwrap_err();
        assert!(matches!(
            err,
            ShapError::Validation(ValidationError::RaggedBackground { row: 1, .. })
        ));
    }
}
