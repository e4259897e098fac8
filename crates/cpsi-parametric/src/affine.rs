// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Affine continuation of an optimal active set.
//!
//! While the working set `A ∪ G_W` stays optimal, the KKT system is linear in
//! `z`, so the primal solution and the multipliers are affine:
//! `x(z) = x₀ + z·x₁`, `w(z) = w₀ + z·w₁`.

use crate::path::ParametricQp;
use cpsi_core::{CpsiError, Tolerances};
use cpsi_qp::{KktSystem, RowBasis, dot};

/// Affine primal/dual solution valid on the interval where its working set is optimal.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineKktSolution {
    primal_intercept: Vec<f64>,
    primal_slope: Vec<f64>,
    /// Inequality rows held at equality, parallel to the multiplier vectors.
    working: Vec<usize>,
    multiplier_intercept: Vec<f64>,
    multiplier_slope: Vec<f64>,
    /// Active rows left out of the KKT system because they depend on earlier rows.
    dependent_active: usize,
}

/// Lower and upper roots of the affine KKT quantities around the probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BreakpointBounds {
    pub lower: f64,
    pub upper: f64,
}

impl AffineKktSolution {
    /// Builds the affine solution for the active set of `x`, an optimum of the
    /// instance at some probe `z`.
    pub fn from_optimum(
        qp: &ParametricQp,
        x: &[f64],
        tolerances: &Tolerances,
    ) -> Result<Self, CpsiError> {
        let problem = qp.problem();
        let mut basis = RowBasis::new();
        let mut rows: Vec<&[f64]> = Vec::new();
        let mut rhs_intercept: Vec<f64> = Vec::new();

        for i in 0..problem.equality_count() {
            let row = problem.a().row(i);
            if basis.try_insert(row) {
                rows.push(row);
                rhs_intercept.push(problem.b()[i]);
            }
        }
        let equality_rows = rows.len();

        let mut working = Vec::new();
        let mut dependent_active = 0;
        for i in 0..problem.inequality_count() {
            if problem.inequality_slack(i, x) > tolerances.active_tolerance {
                continue;
            }
            let row = problem.g().row(i);
            if basis.try_insert(row) {
                rows.push(row);
                rhs_intercept.push(problem.h()[i]);
                working.push(i);
            } else {
                dependent_active += 1;
            }
        }

        let kkt = KktSystem::factor(problem.p(), &rows)?;
        let negative_c: Vec<f64> = problem.q().iter().map(|value| -value).collect();
        let negative_d: Vec<f64> = qp.direction().iter().map(|value| -value).collect();
        let intercept = kkt.solve(&negative_c, &rhs_intercept);
        let slope = kkt.solve(&negative_d, &vec![0.0; rows.len()]);

        Ok(Self {
            primal_intercept: intercept.primal,
            primal_slope: slope.primal,
            working,
            multiplier_intercept: intercept.multipliers[equality_rows..].to_vec(),
            multiplier_slope: slope.multipliers[equality_rows..].to_vec(),
            dependent_active,
        })
    }

    pub fn primal_at(&self, z: f64) -> Vec<f64> {
        self.primal_intercept
            .iter()
            .zip(&self.primal_slope)
            .map(|(base, slope)| base + z * slope)
            .collect()
    }

    pub fn beta_at(&self, z: f64, beta_dim: usize) -> Vec<f64> {
        self.primal_intercept[..beta_dim]
            .iter()
            .zip(&self.primal_slope[..beta_dim])
            .map(|(base, slope)| base + z * slope)
            .collect()
    }

    pub fn working_set(&self) -> &[usize] {
        &self.working
    }

    pub fn dependent_active(&self) -> usize {
        self.dependent_active
    }

    /// Interval `[lower, upper]` on which every inactive slack and every working
    /// multiplier stays non-negative.
    ///
    /// Decreasing quantities bound from above, increasing ones from below. A
    /// constant quantity that is already negative means the oracle optimum was
    /// not optimal for its own active set.
    pub fn bounds(
        &self,
        qp: &ParametricQp,
        tolerances: &Tolerances,
    ) -> Result<BreakpointBounds, CpsiError> {
        let problem = qp.problem();
        let mut bounds = BreakpointBounds {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        };

        let mut in_working = vec![false; problem.inequality_count()];
        for &i in &self.working {
            in_working[i] = true;
        }

        let slacks = (0..problem.inequality_count())
            .filter(|&i| !in_working[i])
            .map(|i| {
                let row = problem.g().row(i);
                (
                    problem.h()[i] - dot(row, &self.primal_intercept),
                    -dot(row, &self.primal_slope),
                    "slack",
                    i,
                )
            });
        let multipliers = self
            .working
            .iter()
            .zip(self.multiplier_intercept.iter().zip(&self.multiplier_slope))
            .map(|(&i, (&w0, &w1))| (w0, w1, "multiplier", i));

        for (intercept, slope, kind, constraint) in slacks.chain(multipliers) {
            if slope.abs() <= tolerances.slope_tolerance {
                if intercept < -tolerances.kkt_tolerance {
                    return Err(CpsiError::solver(format!(
                        "constant {kind} of constraint {constraint} is negative ({intercept:e}); oracle optimum is not optimal"
                    )));
                }
                continue;
            }
            let root = -intercept / slope;
            if slope < 0.0 {
                bounds.upper = bounds.upper.min(root);
            } else {
                bounds.lower = bounds.lower.max(root);
            }
        }

        Ok(bounds)
    }
}
