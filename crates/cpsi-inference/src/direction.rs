// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cpsi_core::{CpsiError, validate_changepoints};
use cpsi_parametric::ParametricQp;
use cpsi_qp::{DenseMatrix, FusedLassoProblem, dot};

/// Contrast between the segments on either side of `changepoints[selected]`.
///
/// `η` is `1/n₁` on `[changepoints[selected-1], changepoints[selected])`,
/// `−1/n₂` on `[changepoints[selected], changepoints[selected+1])` and zero
/// elsewhere, so `ηᵀy` is the difference of the two segment means.
pub fn test_direction(
    changepoints: &[usize],
    selected: usize,
    n: usize,
) -> Result<Vec<f64>, CpsiError> {
    validate_changepoints(changepoints, n)?;
    if selected == 0 || selected + 1 >= changepoints.len() {
        return Err(CpsiError::invalid_input(format!(
            "selected index {selected} must address an interior changepoint in 1..{}",
            changepoints.len().saturating_sub(1)
        )));
    }

    let start = changepoints[selected - 1];
    let split = changepoints[selected];
    let end = changepoints[selected + 1];
    let left = 1.0 / (split - start) as f64;
    let right = -1.0 / (end - split) as f64;

    let mut eta = vec![0.0; n];
    eta[start..split].fill(left);
    eta[split..end].fill(right);
    Ok(eta)
}

/// Response line `y(z) = a + b·z` through the observed response, parametrized
/// so that `ηᵀy(z) = z`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AffineLine {
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl AffineLine {
    /// `b = η/‖η‖²`, `a = y − b·(ηᵀy)`.
    pub fn from_direction(response: &[f64], eta: &[f64]) -> Result<Self, CpsiError> {
        if response.len() != eta.len() {
            return Err(CpsiError::invalid_input(format!(
                "direction length {} does not match response length {}",
                eta.len(),
                response.len()
            )));
        }
        let norm_sq = dot(eta, eta);
        if !norm_sq.is_finite() || norm_sq <= 0.0 {
            return Err(CpsiError::invalid_input(format!(
                "test direction must be finite and non-zero; got ‖η‖²={norm_sq}"
            )));
        }
        let statistic = dot(eta, response);
        let b: Vec<f64> = eta.iter().map(|value| value / norm_sq).collect();
        let a = response
            .iter()
            .zip(&b)
            .map(|(y, slope)| y - slope * statistic)
            .collect();
        Ok(Self { a, b })
    }

    pub fn at(&self, z: f64) -> Vec<f64> {
        self.a
            .iter()
            .zip(&self.b)
            .map(|(a, b)| a + z * b)
            .collect()
    }
}

/// QP cost line `q(z) = c + z·d` induced by a response line.
#[derive(Clone, Debug, PartialEq)]
pub struct CostLine {
    pub c: Vec<f64>,
    pub d: Vec<f64>,
}

/// `c = λ·[0, 1, 1] − [Xᵀa, 0]`, `d = [−Xᵀb, 0]`.
pub fn cost_line(
    design: &DenseMatrix,
    line: &AffineLine,
    lambda: f64,
) -> Result<CostLine, CpsiError> {
    let problem = FusedLassoProblem::new(design.clone(), line.a.clone(), lambda)?;
    let (c, d) = problem.cost_line(&line.a, &line.b)?;
    Ok(CostLine { c, d })
}

/// Parametric fused-lasso QP along `line`: the static instance at `z = 0`
/// uses the response `a`, so its linear term is exactly `c`.
pub fn fused_lasso_parametric_qp(
    design: &DenseMatrix,
    line: &AffineLine,
    lambda: f64,
) -> Result<ParametricQp, CpsiError> {
    let problem = FusedLassoProblem::new(design.clone(), line.a.clone(), lambda)?;
    let (_, d) = problem.cost_line(&line.a, &line.b)?;
    ParametricQp::new(problem.to_qp()?, d, problem.layout().beta_dim)
}
