// src/core/config.rs

/// Transform applied to model outputs before the regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    #[default]
    Identity,
    /// `ln(p / (1 - p))`, for probability-like outputs.
    Logit,
}

/// How many coalitions to evaluate per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelShapSamples {
    /// `2 * M' + 2048`, where `M'` is the number of varying features.
    #[default]
    Auto,
    Fixed(usize),
}

impl KernelShapSamples {
    /// Coalition budget for `num_varying` varying features.
    pub fn resolve(&self, num_varying: usize) -> usize {
        match *self {
            KernelShapSamples::Auto => 2 * num_varying + 2048,
            KernelShapSamples::Fixed(n) => n,
        }
    }
}

/// Configuration for the KernelSHAP explainer.
#[derive(Debug, Clone, Default)]
pub struct ShapConfig {
    pub link: LinkType,
    pub n_samples: KernelShapSamples,
    /// Largest number of synthetic rows sent to the model in one call.
    /// `None` sends every row of an instance in a single batch.
    pub batch_size: Option<usize>,
}

impl ShapConfig {
    pub fn new(link: LinkType) -> Self {
        ShapConfig {
            link,
            ..Default::default()
        }
    }

    pub fn with_link(mut self, link: LinkType) -> Self {
        self.link = link;
        self
    }

    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = KernelShapSamples::Fixed(n_samples);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size.max(1));
        self
    }
}
