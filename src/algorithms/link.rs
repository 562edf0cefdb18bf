// src/algorithms/link.rs

use crate::core::LinkType;

impl LinkType {
    /// Maps a raw model output into the space the regression runs in.
    ///
    /// Logit is only finite on `(0, 1)`: it gives `-inf`/`inf` at the ends and
    /// NaN outside; the solver turns any of these into NaN attributions.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            LinkType::Identity => value,
            LinkType::Logit => (value / (1.0 - value)).ln(),
        }
    }
}
