// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod direction;
pub mod normal;
pub mod pivot;
pub mod region;
pub mod trial;
pub mod truncnorm;

pub use direction::{AffineLine, CostLine, cost_line, fused_lasso_parametric_qp, test_direction};
pub use normal::{erf, erfc, log_erfc, log_ndtr, log1mexp, ndtr};
pub use pivot::{PivotEngine, PivotReport, PivotRequest};
pub use region::SelectionRegion;
pub use trial::{
    ChangepointSelection, TrialConfig, TrialData, TrialOutcome, TrialReport, run_trial,
    run_trial_batch,
};
pub use truncnorm::{TruncatedNormalCdf, log_standard_normal_mass, truncated_normal_cdf};
