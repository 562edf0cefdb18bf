// src/lib.rs

//! `shap_kernel` computes KernelSHAP (SHapley Additive exPlanations) values for
//! any black-box model that can score a batch of inputs asynchronously.
//!
//! ```no_run
//! use shap_kernel::{
//!     FnPredictionProvider, KernelExplainer, Prediction, PredictionInput, PredictionOutput,
//!     Result, ShapConfig,
//! };
//!
//! # async fn run() -> Result<()> {
//! // f(x) = x0 + 2 * x1
//! let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
//!     Ok(inputs
//!         .iter()
//!         .map(|x| PredictionOutput::from_values(&[x.value(0) + 2.0 * x.value(1)]))
//!         .collect())
//! });
//! let background = vec![
//!     PredictionInput::from_values(&[0.0, 0.0]),
//!     PredictionInput::from_values(&[1.0, 1.0]),
//! ];
//! let explainer = KernelExplainer::new(model, ShapConfig::default(), background, 0)?;
//!
//! let instance = PredictionInput::from_values(&[2.0, 3.0]);
//! let observed = PredictionOutput::from_values(&[8.0]);
//! let explanation = explainer.explain(&[Prediction::new(instance, observed)]).await?;
//! println!("{}", explanation);
//! # Ok(())
//! # }
//! ```

// Declare the main modules of the crate
pub mod algorithms;
pub mod core;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::KernelExplainer;
pub use crate::core::{
    Dataset, Explanation, Feature, Instance, KernelShapSamples, LinkType, Output, Prediction,
    PredictionInput, PredictionOutput, Result, ShapConfig, ShapError, ValidationError,
};
pub use crate::traits::{FnPredictionProvider, PredictionProvider};
