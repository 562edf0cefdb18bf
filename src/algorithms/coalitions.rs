// src/algorithms/coalitions.rs

use crate::core::{Dataset, Result, ShapError};
use crate::utils::{for_each_combination, n_choose_k};
use ndarray::Array1;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Above this many varying features the coalition space is never enumerated.
pub const MAX_ENUMERATED_FEATURES: usize = 30;

/// Calculates the SHAP kernel weight of one coalition of `coalition_size` features.
///
/// `pi(s) = (M - 1) / (C(M, s) * s * (M - s))`; the empty and full coalitions
/// get no weight because the solver enforces them as constraints.
pub fn kernel_weight(coalition_size: usize, num_features: usize) -> f64 {
    if coalition_size == 0 || coalition_size >= num_features {
        return 0.0;
    }
    let denominator = n_choose_k(num_features, coalition_size)
        * coalition_size as f64
        * (num_features - coalition_size) as f64;
    (num_features - 1) as f64 / denominator
}

/// The coalitions evaluated for one instance, as 0/1 rows over its varying features.
#[derive(Debug, Clone)]
pub struct CoalitionSet {
    pub masks: Dataset,
    pub weights: Array1<f64>,
    /// True when every non-trivial coalition is present exactly once.
    pub enumerated: bool,
}

impl CoalitionSet {
    /// Enumerates all `2^m - 2` non-trivial coalitions when they fit in `budget`,
    /// otherwise draws `budget` of them with kernel-weighted sampling.
    pub fn generate<R: Rng + ?Sized>(
        num_varying: usize,
        budget: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let m = num_varying;
        if m <= 1 {
            return Ok(CoalitionSet {
                masks: Dataset::zeros((0, m)),
                weights: Array1::zeros(0),
                enumerated: true,
            });
        }
        if m <= MAX_ENUMERATED_FEATURES && (1_usize << m) - 2 <= budget {
            return Ok(Self::enumerate(m));
        }
        Self::sample(m, budget, rng)
    }

    pub fn len(&self) -> usize {
        self.masks.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.nrows() == 0
    }

    fn enumerate(m: usize) -> Self {
        let total = (1_usize << m) - 2;
        let mut masks = Dataset::zeros((total, m));
        let mut weights = Array1::zeros(total);
        for (row, bits) in (1..(1_usize << m) - 1).enumerate() {
            let mut size = 0;
            for j in 0..m {
                if (bits >> j) & 1 == 1 {
                    masks[[row, j]] = 1.0;
                    size += 1;
                }
            }
            weights[row] = kernel_weight(size, m);
        }
        log::debug!("enumerated all {} coalitions of {} varying features", total, m);
        CoalitionSet {
            masks,
            weights,
            enumerated: true,
        }
    }

    /// Sizes `s` and `m - s` are handled as pairs. Whole sizes are taken while the
    /// budget covers their share of kernel weight; the rest is drawn at random.
    fn sample<R: Rng + ?Sized>(m: usize, budget: usize, rng: &mut R) -> Result<Self> {
        let num_subset_sizes = m / 2;
        let num_paired = (m - 1) / 2;

        let mut weight_vector: Vec<f64> = (1..=num_subset_sizes)
            .map(|s| {
                let w = (m - 1) as f64 / (s * (m - s)) as f64;
                if s <= num_paired {
                    2.0 * w
                } else {
                    w
                }
            })
            .collect();
        let total: f64 = weight_vector.iter().sum();
        weight_vector.iter_mut().for_each(|w| *w /= total);

        let mut builder = MaskBuilder::new(m);
        let mut remaining_weights = weight_vector.clone();
        let mut samples_left = budget;
        let mut num_full_subsets = 0;

        for s in 1..=num_subset_sizes {
            let paired = s <= num_paired;
            let combinations = n_choose_k(m, s);
            let n_subsets = if paired { 2.0 * combinations } else { combinations };
            if samples_left as f64 * remaining_weights[s - 1] / n_subsets < 1.0 - 1e-8 {
                break;
            }
            num_full_subsets += 1;
            samples_left = samples_left.saturating_sub(n_subsets as usize);
            if remaining_weights[s - 1] < 1.0 {
                let rest = 1.0 - remaining_weights[s - 1];
                remaining_weights.iter_mut().for_each(|w| *w /= rest);
            }

            let mut w = weight_vector[s - 1] / combinations;
            if paired {
                w /= 2.0;
            }
            for_each_combination(m, s, |chosen| {
                let mask = mask_of(m, chosen);
                if paired {
                    builder.add(complement(&mask), w);
                }
                builder.add(mask, w);
            });
        }
        let num_fixed = builder.len();

        if num_full_subsets < num_subset_sizes && samples_left > 0 {
            let mut size_weights = weight_vector[num_full_subsets..].to_vec();
            let halved = num_paired.saturating_sub(num_full_subsets);
            size_weights.iter_mut().take(halved).for_each(|w| *w /= 2.0);
            let size_dist = WeightedIndex::new(&size_weights).map_err(|e| {
                ShapError::Internal(format!("invalid coalition size weights: {}", e))
            })?;

            let features: Vec<usize> = (0..m).collect();
            let max_draws = 4 * samples_left;
            let mut draws = 0;
            while samples_left > 0 && draws < max_draws {
                draws += 1;
                let size = size_dist.sample(rng) + num_full_subsets + 1;
                let chosen: Vec<usize> = features.choose_multiple(rng, size).cloned().collect();
                let mask = mask_of(m, &chosen);
                let paired_mask = (size <= num_paired).then(|| complement(&mask));
                if builder.add(mask, 1.0) {
                    samples_left -= 1;
                }
                if let Some(paired_mask) = paired_mask {
                    if samples_left > 0 && builder.add(paired_mask, 1.0) {
                        samples_left -= 1;
                    }
                }
            }
            if samples_left > 0 {
                log::warn!(
                    "coalition sampling stopped after {} draws with {} of {} samples left",
                    draws,
                    samples_left,
                    budget
                );
            }

            // hit counts become the leftover kernel mass
            let weight_left: f64 = weight_vector[num_full_subsets..].iter().sum();
            builder.rescale_from(num_fixed, weight_left);
        }

        log::debug!(
            "sampled {} coalitions of {} varying features ({} from fully covered sizes)",
            builder.len(),
            m,
            num_fixed
        );
        builder.finish()
    }
}

fn mask_of(m: usize, chosen: &[usize]) -> Vec<bool> {
    let mut mask = vec![false; m];
    for &idx in chosen {
        mask[idx] = true;
    }
    mask
}

fn complement(mask: &[bool]) -> Vec<bool> {
    mask.iter().map(|&included| !included).collect()
}

/// Collects distinct masks, summing the weight of repeated ones.
struct MaskBuilder {
    num_features: usize,
    masks: Vec<Vec<bool>>,
    weights: Vec<f64>,
    seen: HashMap<Vec<bool>, usize>,
}

impl MaskBuilder {
    fn new(num_features: usize) -> Self {
        MaskBuilder {
            num_features,
            masks: Vec::new(),
            weights: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.masks.len()
    }

    /// Returns true if `mask` was not present before.
    fn add(&mut self, mask: Vec<bool>, weight: f64) -> bool {
        if let Some(&idx) = self.seen.get(&mask) {
            self.weights[idx] += weight;
            return false;
        }
        self.seen.insert(mask.clone(), self.masks.len());
        self.masks.push(mask);
        self.weights.push(weight);
        true
    }

    fn rescale_from(&mut self, start: usize, total: f64) {
        let sum: f64 = self.weights[start..].iter().sum();
        if sum > 0.0 {
            self.weights[start..].iter_mut().for_each(|w| *w *= total / sum);
        }
    }

    fn finish(self) -> Result<CoalitionSet> {
        let rows = self.masks.len();
        let values: Vec<f64> = self
            .masks
            .iter()
            .flat_map(|mask| mask.iter().map(|&included| if included { 1.0 } else { 0.0 }))
            .collect();
        Ok(CoalitionSet {
            masks: Dataset::from_shape_vec((rows, self.num_features), values)?,
            weights: Array1::from_vec(self.weights),
            enumerated: false,
        })
    }
}
