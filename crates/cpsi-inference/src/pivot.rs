// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::region::SelectionRegion;
use crate::truncnorm::truncated_normal_cdf;
use cpsi_core::CpsiError;
use cpsi_parametric::ParametricPath;
use tracing::{debug, warn};

/// Inputs for one selective pivot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PivotRequest<'a> {
    /// Changepoint list of the static fit on the observed response.
    pub observed: &'a [usize],
    /// Observed test statistic `t* = ηᵀy`.
    pub statistic: f64,
    /// Null mean of the statistic.
    pub mean: f64,
    /// Variance of the statistic, `σ²‖η‖²` for i.i.d. noise.
    pub variance: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PivotReport {
    pub pivot: f64,
    pub region: SelectionRegion,
    pub log_numerator: f64,
    pub log_denominator: f64,
}

/// Truncated-normal pivot over the selection region of a traced path.
#[derive(Clone, Copy, Debug, Default)]
pub struct PivotEngine;

impl PivotEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn pivot(
        &self,
        path: &ParametricPath,
        request: &PivotRequest<'_>,
    ) -> Result<PivotReport, CpsiError> {
        if !request.variance.is_finite() || request.variance <= 0.0 {
            return Err(CpsiError::invalid_input(format!(
                "pivot variance must be finite and > 0; got {}",
                request.variance
            )));
        }

        let region = SelectionRegion::from_path(path, request.observed)?;
        if !region.contains(request.statistic) {
            warn!(
                target: "cpsi_inference::pivot",
                statistic = request.statistic,
                intervals = region.intervals().len(),
                "observed statistic lies outside its own selection region"
            );
            return Err(CpsiError::empty_selection_region(format!(
                "observed statistic {} is not covered by the selection region {:?}",
                request.statistic,
                region.intervals()
            )));
        }

        let cdf = truncated_normal_cdf(
            request.statistic,
            region.intervals(),
            request.mean,
            request.variance.sqrt(),
        )?;
        debug!(
            target: "cpsi_inference::pivot",
            pivot = cdf.value,
            intervals = region.intervals().len(),
            log_denominator = cdf.log_denominator,
            "pivot computed"
        );

        Ok(PivotReport {
            pivot: cdf.value,
            region,
            log_numerator: cdf.log_numerator,
            log_denominator: cdf.log_denominator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{PivotEngine, PivotRequest};
    use cpsi_core::{CpsiError, TraceDiagnostics};
    use cpsi_parametric::{ParametricPath, PathInterval};

    fn single_interval_path(z_threshold: f64) -> ParametricPath {
        ParametricPath {
            intervals: vec![PathInterval {
                z_lo: -z_threshold,
                z_hi: z_threshold,
                changepoints: vec![0, 10, 30],
            }],
            diagnostics: TraceDiagnostics::default(),
        }
    }

    #[test]
    fn symmetric_window_at_the_mean_gives_one_half() {
        let report = PivotEngine::new()
            .pivot(
                &single_interval_path(20.0),
                &PivotRequest {
                    observed: &[0, 10, 30],
                    statistic: 0.0,
                    mean: 0.0,
                    variance: 0.15,
                },
            )
            .expect("statistic lies in the region");
        assert!((report.pivot - 0.5).abs() < 1.0e-12);
        assert!(report.region.is_connected());
    }

    #[test]
    fn pivot_stays_in_unit_interval_deep_in_the_tails() {
        let path = single_interval_path(20.0);
        for (statistic, mean) in [(19.0, -15.0), (-19.0, 15.0), (0.0, 300.0), (1.0, -300.0)] {
            let report = PivotEngine::new()
                .pivot(
                    &path,
                    &PivotRequest {
                        observed: &[0, 10, 30],
                        statistic,
                        mean,
                        variance: 0.04,
                    },
                )
                .expect("tail pivots stay finite");
            assert!(
                (0.0..=1.0).contains(&report.pivot),
                "pivot {} for statistic={statistic}, mean={mean}",
                report.pivot
            );
            assert!(report.log_denominator.is_finite());
        }
    }

    #[test]
    fn statistic_outside_its_region_is_a_defect() {
        let path = ParametricPath {
            intervals: vec![
                PathInterval {
                    z_lo: -2.0,
                    z_hi: 0.0,
                    changepoints: vec![0, 3],
                },
                PathInterval {
                    z_lo: 0.0,
                    z_hi: 2.0,
                    changepoints: vec![0, 1, 3],
                },
            ],
            diagnostics: TraceDiagnostics::default(),
        };
        let err = PivotEngine::new()
            .pivot(
                &path,
                &PivotRequest {
                    observed: &[0, 3],
                    statistic: 1.0,
                    mean: 0.0,
                    variance: 1.0,
                },
            )
            .expect_err("statistic sits in a non-matching interval");
        assert!(err.is_defect());
    }

    #[test]
    fn rejects_non_positive_variance() {
        let err = PivotEngine::new()
            .pivot(
                &single_interval_path(1.0),
                &PivotRequest {
                    observed: &[0, 10, 30],
                    statistic: 0.0,
                    mean: 0.0,
                    variance: 0.0,
                },
            )
            .expect_err("zero variance must fail");
        assert!(matches!(err, CpsiError::InvalidInput(_)));
    }
}
