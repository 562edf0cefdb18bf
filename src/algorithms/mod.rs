pub mod background;
pub mod coalitions;
pub mod kernel_shap;
pub mod link;
pub mod synthesis;
pub mod wls;

pub use background::{Background, VarianceMap};
pub use coalitions::{kernel_weight, CoalitionSet};
pub use kernel_shap::KernelExplainer;
