// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpsiError;

const DEFAULT_CHANGEPOINT_TOLERANCE: f64 = 1.0e-8;
const DEFAULT_BREAKPOINT_TOLERANCE: f64 = 1.0e-10;
const DEFAULT_MIN_PROGRESS: f64 = 1.0e-10;
const DEFAULT_ACTIVE_TOLERANCE: f64 = 1.0e-9;
const DEFAULT_SLOPE_TOLERANCE: f64 = 1.0e-14;
const DEFAULT_KKT_TOLERANCE: f64 = 1.0e-7;
const DEFAULT_PROBE_STEP: f64 = 1.0e-6;

/// Numerical thresholds used by the changepoint extractor and the path tracer.
///
/// Good values depend on the scale of the problem, so none of them is
/// hard-coded at the call sites.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Tolerances {
    /// Adjacent `beta` entries further apart than this start a new segment.
    pub changepoint_tolerance: f64,
    /// Roots closer than this to the current lower bound are not breakpoints.
    pub breakpoint_tolerance: f64,
    /// Minimum advance in `z` per traced interval.
    pub min_progress: f64,
    /// Inequality slack at or below this marks a constraint as active.
    pub active_tolerance: f64,
    /// Affine KKT quantities with a smaller `|slope|` are treated as constant.
    pub slope_tolerance: f64,
    /// Constant KKT quantities below `-kkt_tolerance` reject the oracle optimum.
    pub kkt_tolerance: f64,
    /// Offset past a breakpoint at which the next QP is solved.
    pub probe_step: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            changepoint_tolerance: DEFAULT_CHANGEPOINT_TOLERANCE,
            breakpoint_tolerance: DEFAULT_BREAKPOINT_TOLERANCE,
            min_progress: DEFAULT_MIN_PROGRESS,
            active_tolerance: DEFAULT_ACTIVE_TOLERANCE,
            slope_tolerance: DEFAULT_SLOPE_TOLERANCE,
            kkt_tolerance: DEFAULT_KKT_TOLERANCE,
            probe_step: DEFAULT_PROBE_STEP,
        }
    }
}

impl Tolerances {
    pub fn validate(&self) -> Result<(), CpsiError> {
        let non_negative = [
            ("changepoint_tolerance", self.changepoint_tolerance),
            ("breakpoint_tolerance", self.breakpoint_tolerance),
            ("active_tolerance", self.active_tolerance),
            ("slope_tolerance", self.slope_tolerance),
            ("kkt_tolerance", self.kkt_tolerance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CpsiError::invalid_input(format!(
                    "Tolerances.{name} must be finite and >= 0; got {value}"
                )));
            }
        }

        let positive = [
            ("min_progress", self.min_progress),
            ("probe_step", self.probe_step),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CpsiError::invalid_input(format!(
                    "Tolerances.{name} must be finite and > 0; got {value}"
                )));
            }
        }

        if self.probe_step <= self.min_progress {
            return Err(CpsiError::invalid_input(format!(
                "Tolerances.probe_step must exceed min_progress; got probe_step={}, min_progress={}",
                self.probe_step, self.min_progress
            )));
        }

        Ok(())
    }
}
