// src/algorithms/kernel_shap.rs

use crate::algorithms::background::{Background, VarianceMap};
use crate::algorithms::coalitions::CoalitionSet;
use crate::algorithms::synthesis::{average_outputs, synthesize};
use crate::algorithms::wls::solve_constrained;
use crate::core::{
    Explanation, Prediction, PredictionInput, PredictionOutput, Result, ShapConfig, ShapError,
    ValidationError,
};
use crate::traits::PredictionProvider;
use futures::future::try_join_all;
use ndarray::{Array1, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Mutex;

/// Model-agnostic KernelSHAP explainer over a fixed background dataset.
///
/// The background is analyzed once, here; every explain call reuses that
/// analysis. The seeded generator is shared by all calls, but it is only
/// locked to hand each explained instance its own sub-seed, so results are
/// reproducible no matter how the per-instance futures are scheduled.
pub struct KernelExplainer<M: PredictionProvider> {
    model: M,
    background: Background,
    config: ShapConfig,
    rng: Mutex<StdRng>,
}

impl<M: PredictionProvider> KernelExplainer<M> {
    /// Fails when `background` is empty or its rows differ in length.
    pub fn new(
        model: M,
        config: ShapConfig,
        background: Vec<PredictionInput>,
        seed: u64,
    ) -> Result<Self> {
        let background = Background::new(background)?;
        log::debug!(
            "KernelExplainer over {} background rows, {} features ({} varying)",
            background.num_rows(),
            background.num_features(),
            background.variance().num_varying()
        );
        Ok(KernelExplainer {
            model,
            background,
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &ShapConfig {
        &self.config
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn variance_map(&self) -> &VarianceMap {
        self.background.variance()
    }

    pub fn num_features(&self) -> usize {
        self.background.num_features()
    }

    /// Explains each prediction with the model given at construction.
    pub async fn explain(&self, predictions: &[Prediction]) -> Result<Explanation> {
        self.explain_with(&self.model, predictions).await
    }

    /// Explains each prediction's observed output with `model`.
    ///
    /// The result is indexed `[instance, output, feature]` in input order. Any
    /// validation or model failure fails the whole call.
    pub async fn explain_with<P: PredictionProvider + ?Sized>(
        &self,
        model: &P,
        predictions: &[Prediction],
    ) -> Result<Explanation> {
        let num_outputs = self.validate(predictions)?;
        let num_features = self.num_features();
        if predictions.is_empty() {
            return Ok(Explanation {
                shap_values: Array3::zeros((0, 0, num_features)),
                expected_values: Array1::zeros(0),
            });
        }

        let num_background = self.background.num_rows();
        let background_outputs = self.predict_batched(model, self.background.rows()).await?;
        let null_output =
            average_outputs(&background_outputs, num_background, num_background, num_outputs)?
                .row(0)
                .to_owned();

        let seeds = self.draw_seeds(predictions.len())?;
        let per_instance = try_join_all(
            predictions
                .iter()
                .zip(seeds)
                .enumerate()
                .map(|(idx, (prediction, seed))| {
                    self.explain_instance(model, idx, prediction, &null_output, seed)
                }),
        )
        .await?;

        let mut shap_values = Array3::zeros((predictions.len(), num_outputs, num_features));
        for (idx, values) in per_instance.iter().enumerate() {
            shap_values.index_axis_mut(Axis(0), idx).assign(values);
        }
        let link = self.config.link;
        Ok(Explanation {
            shap_values,
            expected_values: null_output.mapv(|v| link.apply(v)),
        })
    }

    /// Checks every instance before any model call. Returns the output count.
    fn validate(&self, predictions: &[Prediction]) -> Result<usize> {
        let num_features = self.num_features();
        let num_outputs = predictions.first().map_or(0, |p| p.output.len());
        for (instance, prediction) in predictions.iter().enumerate() {
            if prediction.input.len() != num_features {
                return Err(ValidationError::FeatureCountMismatch {
                    instance,
                    expected: num_features,
                    found: prediction.input.len(),
                }
                .into());
            }
            if prediction.output.len() != num_outputs {
                return Err(ValidationError::OutputCountMismatch {
                    instance,
                    expected: num_outputs,
                    found: prediction.output.len(),
                }
                .into());
            }
        }
        Ok(num_outputs)
    }

    fn draw_seeds(&self, count: usize) -> Result<Vec<u64>> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ShapError::Internal("random generator lock poisoned".to_string()))?;
        Ok((0..count).map(|_| rng.gen::<u64>()).collect())
    }

    /// Attributions of one instance as an `(outputs, features)` matrix.
    async fn explain_instance<P: PredictionProvider + ?Sized>(
        &self,
        model: &P,
        idx: usize,
        prediction: &Prediction,
        null_output: &Array1<f64>,
        seed: u64,
    ) -> Result<Array2<f64>> {
        let num_outputs = null_output.len();
        let mut attributions = Array2::zeros((num_outputs, self.num_features()));

        let varying = self
            .background
            .variance()
            .varying_for(prediction.input.values().view());
        if varying.is_empty() {
            log::trace!("instance {}: no varying features", idx);
            return Ok(attributions);
        }

        let budget = self.config.n_samples.resolve(varying.len());
        let coalitions = {
            let mut rng = StdRng::seed_from_u64(seed);
            CoalitionSet::generate(varying.len(), budget, &mut rng)?
        };
        let samples = synthesize(&prediction.input, &varying, &coalitions, &self.background);
        log::trace!(
            "instance {}: {} varying features, {} {} coalitions, {} synthetic rows",
            idx,
            varying.len(),
            coalitions.len(),
            if coalitions.enumerated { "enumerated" } else { "sampled" },
            samples.len()
        );

        let outputs = self.predict_batched(model, &samples).await?;
        let coalition_outputs =
            average_outputs(&outputs, samples.len(), self.background.num_rows(), num_outputs)?;

        let link = self.config.link;
        for o in 0..num_outputs {
            let targets = coalition_outputs.column(o).mapv(|v| link.apply(v));
            let phi = solve_constrained(
                coalitions.masks.view(),
                targets.view(),
                coalitions.weights.view(),
                link.apply(null_output[o]),
                link.apply(prediction.output.value(o)),
            )?;
            for (k, &feat_idx) in varying.iter().enumerate() {
                attributions[[o, feat_idx]] = phi[k];
            }
        }
        Ok(attributions)
    }

    /// Sends `inputs` to the model, split into concurrent chunks when a batch size is configured.
    async fn predict_batched<P: PredictionProvider + ?Sized>(
        &self,
        model: &P,
        inputs: &[PredictionInput],
    ) -> Result<Vec<PredictionOutput>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        match self.config.batch_size {
            Some(size) if size < inputs.len() => {
                let chunks = inputs.chunks(size).map(|chunk| predict_chunk(model, chunk));
                let batches = try_join_all(chunks).await?;
                Ok(batches.into_iter().flatten().collect())
            }
            _ => model.predict(inputs).await,
        }
    }
}

async fn predict_chunk<P: PredictionProvider + ?Sized>(
    model: &P,
    chunk: &[PredictionInput],
) -> Result<Vec<PredictionOutput>> {
    let outputs = model.predict(chunk).await?;
    if outputs.len() != chunk.len() {
        return Err(ShapError::Prediction(format!(
            "model returned {} predictions for a batch of {}",
            outputs.len(),
            chunk.len()
        )));
    }
    Ok(outputs)
}

impl<M: PredictionProvider> fmt::Debug for KernelExplainer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelExplainer")
            .field("config", &self.config)
            .field("num_background", &self.background.num_rows())
            .field("num_features", &self.background.num_features())
            .finish_non_exhaustive()
    }
}
