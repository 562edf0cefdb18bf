// src/traits.rs

//! The prediction capability the explainer consumes.

use crate::core::{PredictionInput, PredictionOutput, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A black-box model: maps a batch of inputs to one output vector per input.
///
/// Implementations must return exactly `inputs.len()` outputs, in input order,
/// and must accept batches of any size. Failures are reported as
/// [`ShapError::Prediction`](crate::ShapError::Prediction); the explainer does
/// not retry them.
#[async_trait]
pub trait PredictionProvider: Send + Sync {
    async fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>>;
}

#[async_trait]
impl<T: PredictionProvider + ?Sized> PredictionProvider for &T {
    async fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        (**self).predict(inputs).await
    }
}

#[async_trait]
impl<T: PredictionProvider + ?Sized> PredictionProvider for Box<T> {
    async fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        (**self).predict(inputs).await
    }
}

#[async_trait]
impl<T: PredictionProvider + ?Sized> PredictionProvider for Arc<T> {
    async fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        (**self).predict(inputs).await
    }
}

/// Adapts a synchronous batch function into a [`PredictionProvider`].
pub struct FnPredictionProvider<F> {
    predict_fn: F,
}

impl<F> FnPredictionProvider<F>
where
    F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
{
    pub fn new(predict_fn: F) -> Self {
        FnPredictionProvider { predict_fn }
    }
}

#[async_trait]
impl<F> PredictionProvider for FnPredictionProvider<F>
where
    F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
{
    async fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        (self.predict_fn)(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    type Scores = Result<Vec<PredictionOutput>>;

    fn doubling_model() -> FnPredictionProvider<impl Fn(&[PredictionInput]) -> Scores + Send + Sync>
    {
        FnPredictionProvider::new(|inputs: &[PredictionInput]| {
            Ok(inputs
                .iter()
                .map(|input| PredictionOutput::from_values(&[input.values().sum() * 2.0]))
                .collect())
        })
    }

    #[test]
    fn fn_provider_preserves_order() {
        let model = doubling_model();
        let inputs = vec![
            PredictionInput::from_values(&[1.0, 2.0]),
            PredictionInput::from_values(&[0.5, 0.0]),
        ];
        let outputs = block_on(model.predict(&inputs)).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].value(0), 6.0);
        assert_eq!(outputs[1].value(0), 1.0);
    }

    #[test]
    fn wrappers_delegate() {
        let shared: Arc<dyn PredictionProvider> = Arc::new(doubling_model());
        let inputs = vec![PredictionInput::from_values(&[3.0])];
        let via_arc = block_on(shared.predict(&inputs)).unwrap();
        let boxed: Box<dyn PredictionProvider> = Box::new(doubling_model());
        let via_box = block_on(boxed.predict(&inputs)).unwrap();
        let borrowed: &dyn PredictionProvider = &*boxed;
        let via_ref = block_on(PredictionProvider::predict(&borrowed, &inputs)).unwrap();
        assert_eq!(via_arc, via_box);
        assert_eq!(via_box, via_ref);
        assert_eq!(via_arc[0].value(0), 6.0);
    }
}
