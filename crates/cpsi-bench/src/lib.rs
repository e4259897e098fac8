// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic fixtures shared by the benchmarks.

use cpsi_core::{CpsiError, find_changepoints};
use cpsi_inference::{AffineLine, fused_lasso_parametric_qp, test_direction};
use cpsi_parametric::ParametricQp;
use cpsi_qp::{ActiveSetSolver, DenseMatrix, FusedLassoProblem, QpOracle};

pub fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Zero mean, a level-3 middle third and uniform noise on `[-1, 1)`.
pub fn three_regime_series(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    let regime = n / 3;
    (0..n)
        .map(|idx| {
            let level = if (regime..2 * regime).contains(&idx) {
                3.0
            } else {
                0.0
            };
            let noise = (lcg_next(&mut state) >> 11) as f64 / (1u64 << 53) as f64;
            level + 2.0 * noise - 1.0
        })
        .collect()
}

/// Parametric QP along the contrast of the first changepoint the static fit
/// reports, or of the fixed split at `n / 3` when the fit is flat.
pub fn contrast_qp(n: usize, seed: u64, lambda: f64) -> Result<ParametricQp, CpsiError> {
    let response = three_regime_series(n, seed);
    let design = DenseMatrix::identity(n);
    let problem = FusedLassoProblem::new(design.clone(), response.clone(), lambda)?;
    let solution = ActiveSetSolver::default().solve(&problem.to_qp()?, None)?;
    let changepoints = find_changepoints(problem.beta(&solution.x), 1.0e-8)?;
    let eta = if changepoints.len() > 2 {
        test_direction(&changepoints, 1, n)?
    } else {
        test_direction(&[0, n / 3, n], 1, n)?
    };
    let line = AffineLine::from_direction(&response, &eta)?;
    fused_lasso_parametric_qp(&design, &line, lambda)
}
