// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpsi_core::{CpsiError, Tolerances};

const DEFAULT_Z_THRESHOLD: f64 = 20.0;
const DEFAULT_MAX_INTERVALS: usize = 10_000;
const DEFAULT_CANCEL_CHECK_EVERY: usize = 1;

/// Configuration for [`crate::ParametricPathTracer`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TraceConfig {
    /// Half-width of the traced window `[-z_threshold, z_threshold]`.
    pub z_threshold: f64,
    /// Upper bound on raw (pre-coalescing) intervals.
    pub max_intervals: usize,
    pub tolerances: Tolerances,
    pub cancel_check_every: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            max_intervals: DEFAULT_MAX_INTERVALS,
            tolerances: Tolerances::default(),
            cancel_check_every: DEFAULT_CANCEL_CHECK_EVERY,
        }
    }
}

impl TraceConfig {
    pub fn validate(&self) -> Result<(), CpsiError> {
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(CpsiError::invalid_input(format!(
                "TraceConfig.z_threshold must be finite and > 0; got {}",
                self.z_threshold
            )));
        }
        if self.max_intervals == 0 {
            return Err(CpsiError::invalid_input(
                "TraceConfig.max_intervals must be >= 1; got 0",
            ));
        }
        self.tolerances.validate()
    }

    pub(crate) fn normalized_cancel_check_every(&self) -> usize {
        self.cancel_check_every.max(1)
    }
}
