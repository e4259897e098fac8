// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::problem::QpProblem;
use cpsi_core::CpsiError;

/// Primal optimum returned by a [`QpOracle`].
#[derive(Clone, Debug, PartialEq)]
pub struct QpSolution {
    pub x: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

/// One-shot solver for static QP instances.
///
/// Failures are reported as [`CpsiError::Infeasible`] or
/// [`CpsiError::SolverError`]; callers treat both as fatal and never retry.
pub trait QpOracle {
    fn name(&self) -> &'static str;

    /// Solves `problem`; `warm_start` is a hint that implementations may ignore.
    fn solve(
        &self,
        problem: &QpProblem,
        warm_start: Option<&[f64]>,
    ) -> Result<QpSolution, CpsiError>;
}

impl<T: QpOracle + ?Sized> QpOracle for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(
        &self,
        problem: &QpProblem,
        warm_start: Option<&[f64]>,
    ) -> Result<QpSolution, CpsiError> {
        (**self).solve(problem, warm_start)
    }
}
