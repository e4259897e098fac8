// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpsi_core::{CpsiError, TraceDiagnostics};
use cpsi_qp::QpProblem;

/// QP whose linear term moves along `q(z) = problem.q + z·direction`.
///
/// The first `beta_dim` coordinates of the solution are the coefficients the
/// changepoint list is read from.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ParametricQp {
    problem: QpProblem,
    direction: Vec<f64>,
    beta_dim: usize,
}

impl ParametricQp {
    pub fn new(
        problem: QpProblem,
        direction: Vec<f64>,
        beta_dim: usize,
    ) -> Result<Self, CpsiError> {
        let n = problem.dim();
        if direction.len() != n {
            return Err(CpsiError::invalid_input(format!(
                "direction length {} does not match QP dimension {n}",
                direction.len()
            )));
        }
        if let Some(idx) = direction.iter().position(|value| !value.is_finite()) {
            return Err(CpsiError::invalid_input(format!(
                "direction[{idx}] is not finite"
            )));
        }
        if beta_dim == 0 || beta_dim > n {
            return Err(CpsiError::invalid_input(format!(
                "beta_dim must be in 1..={n}; got {beta_dim}"
            )));
        }
        Ok(Self {
            problem,
            direction,
            beta_dim,
        })
    }

    /// The instance at `z = 0`.
    pub fn problem(&self) -> &QpProblem {
        &self.problem
    }

    pub fn direction(&self) -> &[f64] {
        &self.direction
    }

    pub fn beta_dim(&self) -> usize {
        self.beta_dim
    }

    pub fn linear_term_at(&self, z: f64) -> Vec<f64> {
        self.problem
            .q()
            .iter()
            .zip(&self.direction)
            .map(|(base, slope)| base + z * slope)
            .collect()
    }

    pub fn problem_at(&self, z: f64) -> Result<QpProblem, CpsiError> {
        self.problem.with_linear_term(self.linear_term_at(z))
    }
}

/// Maximal `z` interval over which the changepoint list is constant.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PathInterval {
    pub z_lo: f64,
    pub z_hi: f64,
    pub changepoints: Vec<usize>,
}

impl PathInterval {
    pub fn width(&self) -> f64 {
        self.z_hi - self.z_lo
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.z_lo + self.z_hi)
    }
}

/// Ordered, contiguous partition of `[-z_threshold, z_threshold]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ParametricPath {
    pub intervals: Vec<PathInterval>,
    pub diagnostics: TraceDiagnostics,
}

impl ParametricPath {
    /// `z_0 < z_1 < … < z_K`: every interval's lower end plus the last upper end.
    pub fn breakpoints(&self) -> Vec<f64> {
        let mut out: Vec<f64> = self.intervals.iter().map(|interval| interval.z_lo).collect();
        if let Some(last) = self.intervals.last() {
            out.push(last.z_hi);
        }
        out
    }

    /// Changepoint lists parallel to the intervals.
    pub fn changepoint_lists(&self) -> Vec<&[usize]> {
        self.intervals
            .iter()
            .map(|interval| interval.changepoints.as_slice())
            .collect()
    }

    /// Interval whose half-open range `[z_lo, z_hi)` holds `z`; the last interval
    /// also owns its upper end.
    pub fn interval_containing(&self, z: f64) -> Option<&PathInterval> {
        let last = self.intervals.len().checked_sub(1)?;
        self.intervals
            .iter()
            .enumerate()
            .find(|(idx, interval)| {
                interval.z_lo <= z && (z < interval.z_hi || (*idx == last && z == interval.z_hi))
            })
            .map(|(_, interval)| interval)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}
